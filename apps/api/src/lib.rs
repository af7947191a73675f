//! Gameboard API Library
//!
//! This library provides the agent lifecycle orchestrator behind the
//! gameboard: domain types, the work and review pipelines, storage and
//! provider adapters, and the HTTP routing layer.

pub mod agents;
pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
