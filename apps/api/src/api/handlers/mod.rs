// HTTP handlers, one module per resource

pub mod agents;
pub mod blocks;
pub mod board;
pub mod health;
pub mod zones;
