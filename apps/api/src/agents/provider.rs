use async_trait::async_trait;
use thiserror::Error;

use crate::domain::agent::ProviderType;

/// Failure of a single provider call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// No credentials (or no client) for the requested provider
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Rate limits, 5xx responses, timeouts and network failures
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// Anything a retry will not fix
    #[error("Provider error: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }

    pub fn is_not_configured(&self) -> bool {
        matches!(self, ProviderError::NotConfigured(_))
    }
}

/// Text-generation backend
///
/// Implementations make exactly one attempt per call; retrying is the
/// caller's business (see [`crate::agents::retry::RetryPolicy`]).
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Generate text for `prompt` with the given provider, using `model`
    /// or the provider's default model when `None`
    async fn generate(
        &self,
        provider: ProviderType,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<String, ProviderError>;
}
