// Agent lifecycle events
//
// Broadcast by the orchestrator after every persisted transition so that
// observers (and tests) can await pipeline completions.

use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentId, AgentRole, Position, ReviewDecision};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    Spawned {
        agent_id: AgentId,
        role: AgentRole,
    },
    Removed {
        agent_id: AgentId,
    },
    Moved {
        agent_id: AgentId,
        position: Position,
    },
    TaskAssigned {
        agent_id: AgentId,
        block_id: String,
    },
    WorkFinished {
        agent_id: AgentId,
        block_id: String,
        files: Vec<String>,
    },
    WorkFailed {
        agent_id: AgentId,
        reason: String,
    },
    ReviewStarted {
        agent_id: AgentId,
        producer_id: AgentId,
    },
    ReviewFinished {
        agent_id: AgentId,
        producer_id: AgentId,
        decision: ReviewDecision,
    },
    ReviewFailed {
        agent_id: AgentId,
        reason: String,
    },
    Relocated {
        agent_id: AgentId,
        zone_id: Option<String>,
        position: Position,
    },
}

impl AgentEvent {
    /// The agent the event is about
    pub fn agent_id(&self) -> &AgentId {
        match self {
            AgentEvent::Spawned { agent_id, .. }
            | AgentEvent::Removed { agent_id }
            | AgentEvent::Moved { agent_id, .. }
            | AgentEvent::TaskAssigned { agent_id, .. }
            | AgentEvent::WorkFinished { agent_id, .. }
            | AgentEvent::WorkFailed { agent_id, .. }
            | AgentEvent::ReviewStarted { agent_id, .. }
            | AgentEvent::ReviewFinished { agent_id, .. }
            | AgentEvent::ReviewFailed { agent_id, .. }
            | AgentEvent::Relocated { agent_id, .. } => agent_id,
        }
    }

    /// True for the events that end a background pipeline
    pub fn is_pipeline_end(&self) -> bool {
        matches!(
            self,
            AgentEvent::WorkFinished { .. }
                | AgentEvent::WorkFailed { .. }
                | AgentEvent::ReviewFinished { .. }
                | AgentEvent::ReviewFailed { .. }
        )
    }
}
