// Block domain module
// Blocks are units of work created outside the core and read by the work pipeline

#![allow(clippy::module_inception)]

pub mod block;

pub use block::{Block, BlockStatus};
