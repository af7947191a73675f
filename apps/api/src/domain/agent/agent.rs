use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::{
    AgentId, AgentRole, AgentState, Position, ProviderConfig, ReviewDecision,
};

/// Record of a single state change, used by callers to log unexpected transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: AgentState,
    pub to: AgentState,
}

impl StateChange {
    fn new(from: AgentState, to: AgentState) -> Self {
        Self { from, to }
    }

    /// True when the change follows the documented lifecycle
    pub fn is_expected(&self) -> bool {
        self.from.can_transition_to(self.to)
    }
}

/// Agent aggregate
///
/// A unit of work capacity placed on the layout. The record is persisted whole,
/// so every method here mutates in memory and the caller writes it back.
///
/// # Invariants
/// - `state` is always one of the seven lifecycle states
/// - `assigned_block_id` is only set while working on (or failing) a block
/// - `assigned_peer_id` is only set on a reviewer between review start and completion
///
/// # Example
/// ```
/// use gameboard_api::domain::agent::{Agent, AgentRole, AgentState, Position, ProviderConfig};
///
/// let agent = Agent::spawn(
///     AgentRole::Producer,
///     None,
///     ProviderConfig::default(),
///     Position::new(50.0, 50.0),
/// );
///
/// assert_eq!(agent.state, AgentState::Idle);
/// assert!(agent.name.starts_with("Developer_"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(rename = "agent_id")]
    pub id: AgentId,
    pub name: String,
    #[serde(rename = "agent_type")]
    pub role: AgentRole,
    pub state: AgentState,
    #[serde(flatten)]
    pub position: Position,
    #[serde(default)]
    pub assigned_block_id: Option<String>,
    #[serde(default)]
    pub assigned_peer_id: Option<AgentId>,
    #[serde(default)]
    pub completed_marker_id: Option<String>,
    #[serde(default)]
    pub status_title: Option<String>,
    #[serde(default)]
    pub error_reason: Option<String>,
    #[serde(default)]
    pub last_review: Option<ReviewDecision>,
    #[serde(rename = "llm_config")]
    pub provider: ProviderConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Creates a new idle agent at `position`
    ///
    /// When no name is given one is derived from the role and the id suffix,
    /// e.g. `Developer_3f9a`.
    pub fn spawn(
        role: AgentRole,
        name: Option<String>,
        provider: ProviderConfig,
        position: Position,
    ) -> Self {
        let id = AgentId::generate();
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{}_{}", role.label(), id.tail(4)));
        let now = Utc::now();

        Self {
            id,
            name,
            role,
            state: AgentState::Idle,
            position,
            assigned_block_id: None,
            assigned_peer_id: None,
            completed_marker_id: None,
            status_title: None,
            error_reason: None,
            last_review: None,
            provider,
            created_at: now,
            updated_at: now,
        }
    }

    fn set_state(&mut self, next: AgentState) -> StateChange {
        let change = StateChange::new(self.state, next);
        self.state = next;
        self.updated_at = Utc::now();
        change
    }

    /// Takes a block and walks to its marker
    pub fn begin_work(&mut self, block_id: &str, title: &str, position: Position) -> StateChange {
        self.assigned_block_id = Some(block_id.to_string());
        self.status_title = Some(title.to_string());
        self.completed_marker_id = None;
        self.error_reason = None;
        self.position = position;
        self.set_state(AgentState::Working)
    }

    /// Marks the work pipeline as done
    pub fn finish_work(&mut self, marker_id: Option<String>) -> StateChange {
        self.completed_marker_id = marker_id;
        self.set_state(AgentState::FinishedWork)
    }

    /// Puts the agent into the error state with a display title and a reason
    pub fn fail(&mut self, title: impl Into<String>, reason: impl Into<String>) -> StateChange {
        self.status_title = Some(title.into());
        self.error_reason = Some(reason.into());
        self.completed_marker_id = None;
        self.set_state(AgentState::Error)
    }

    /// Returns a producer to idle after its work was collected
    ///
    /// The position only changes when a zone was found.
    pub fn return_to_idle(&mut self, position: Option<Position>) -> StateChange {
        self.assigned_block_id = None;
        self.status_title = None;
        self.completed_marker_id = None;
        if let Some(position) = position {
            self.position = position;
        }
        self.set_state(AgentState::Idle)
    }

    /// Starts reviewing `producer`
    ///
    /// This is the only hard-checked transition: a reviewer that is not idle
    /// (or is not a reviewer at all) is refused so it cannot be double-booked.
    pub fn begin_review(&mut self, producer: &AgentId) -> Result<StateChange, String> {
        if self.role != AgentRole::Reviewer {
            return Err(format!("Agent {} is not a reviewer", self.id));
        }
        if self.state != AgentState::Idle {
            return Err(format!(
                "Reviewer {} is not idle (state: {})",
                self.id, self.state
            ));
        }
        if &self.id == producer {
            return Err(format!("Agent {} cannot review itself", self.id));
        }

        self.assigned_peer_id = Some(producer.clone());
        self.status_title = Some(format!("QA for {}", producer));
        self.last_review = None;
        Ok(self.set_state(AgentState::WorkingQa))
    }

    /// Marks a producer as being reviewed
    pub fn enter_review(&mut self) -> StateChange {
        self.set_state(AgentState::UnderQa)
    }

    /// Records the review outcome on the reviewer
    pub fn finish_review(&mut self, decision: ReviewDecision) -> StateChange {
        self.last_review = Some(decision);
        self.set_state(AgentState::FinishedQaWork)
    }

    /// Returns a reviewer to idle, unlinking it from its producer
    ///
    /// Returns the previously linked producer, if any.
    pub fn leave_review(&mut self, position: Option<Position>) -> (StateChange, Option<AgentId>) {
        let peer = self.assigned_peer_id.take();
        self.status_title = None;
        if let Some(position) = position {
            self.position = position;
        }
        (self.set_state(AgentState::Idle), peer)
    }

    /// Releases a producer once its review is over
    ///
    /// Only a producer still `under_qa` is reset; anything else is left alone
    /// and `None` is returned.
    pub fn release_from_review(&mut self, status_title: Option<String>) -> Option<StateChange> {
        if self.state != AgentState::UnderQa {
            return None;
        }
        self.status_title = status_title;
        Some(self.set_state(AgentState::Idle))
    }

    /// Manual move: always lands idle, clears any error and drops every link
    ///
    /// Returns the producer a reviewer was linked to, if any, so the caller
    /// can release it.
    pub fn move_to(&mut self, position: Position) -> (StateChange, Option<AgentId>) {
        let peer = self.assigned_peer_id.take();
        self.position = position;
        self.error_reason = None;
        self.assigned_block_id = None;
        self.status_title = None;
        self.completed_marker_id = None;
        (self.set_state(AgentState::Idle), peer)
    }
}
