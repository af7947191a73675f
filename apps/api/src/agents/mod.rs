// Agent system modules
//
// This module contains the agent lifecycle orchestrator and the pipelines
// it runs: the multi-stage work pipeline and the review pipeline.

pub mod errors;
pub mod events;
pub mod locks;
pub mod orchestrator;
pub mod planning;
pub mod pool;
pub mod prompts;
pub mod provider;
pub mod retry;
pub mod reviewer;
pub mod types;
pub mod worker;

// Re-export main types
pub use errors::{AgentError, AgentResult};
pub use events::AgentEvent;
pub use orchestrator::{BoardSnapshot, Orchestrator, OrchestratorSettings, Relocation};
pub use provider::{ProviderError, ProviderGateway};
pub use retry::RetryPolicy;
pub use reviewer::ReviewPipeline;
pub use types::{ArtifactSet, PipelineReport, ReviewReport, TaskBrief, WorkOrder};
pub use worker::WorkPipeline;
