// Agent domain module
// Contains the agent aggregate and its lifecycle value objects

#![allow(clippy::module_inception)]

pub mod agent;
pub mod value_objects;

// Re-export main types for convenience
pub use agent::{Agent, StateChange};
pub use value_objects::{
    AgentId, AgentRole, AgentState, Position, ProviderConfig, ProviderType, ReviewDecision,
};
