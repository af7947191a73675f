use thiserror::Error;

use super::provider::ProviderError;

/// Errors that can occur in the agent system
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to launch pipeline: {0}")]
    LaunchFailed(String),

    #[error("Storage error: {0}")]
    Store(String),
}

impl AgentError {
    /// Whether this error must end a pipeline instead of being absorbed by a fallback
    ///
    /// A missing provider configuration cannot be fixed by retrying or by a
    /// simpler prompt, and a storage failure means results would be lost.
    pub fn is_fatal(&self) -> bool {
        match self {
            AgentError::ConfigError(_) | AgentError::Store(_) => true,
            AgentError::Provider(e) => e.is_not_configured(),
            _ => false,
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
