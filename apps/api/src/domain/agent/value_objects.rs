use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque agent identifier of the form `agent_xxxxxx`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Generates a fresh identifier
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        let suffix: String = hex.chars().take(6).collect();
        AgentId(format!("agent_{}", suffix))
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last `n` characters, used for default display names
    pub fn tail(&self, n: usize) -> &str {
        let start = self.0.len().saturating_sub(n);
        self.0.get(start..).unwrap_or(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        AgentId(value.to_string())
    }
}

impl From<String> for AgentId {
    fn from(value: String) -> Self {
        AgentId(value)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an agent
///
/// # State Machine
/// ```text
/// idle -> working -> finished_work -> idle            (producer)
/// idle -> under_qa -> idle                            (producer being reviewed)
/// idle -> working_qa -> finished_qa_work -> idle      (reviewer)
/// any  -> error -> idle                               (manual move only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Waiting for work
    Idle,
    /// Running the work pipeline
    Working,
    /// Work pipeline completed, waiting to be relocated
    FinishedWork,
    /// Artifacts are being reviewed by a reviewer
    UnderQa,
    /// Running the review pipeline against a producer
    WorkingQa,
    /// Review pipeline completed, waiting to be relocated
    FinishedQaWork,
    /// A transition or pipeline failed; cleared only by a manual move
    Error,
}

impl AgentState {
    /// Checks if a transition from the current state to `next` is the expected one
    ///
    /// Most lifecycle operations tolerate unexpected transitions and only log them,
    /// so this is advisory for everything except reviewer assignment.
    ///
    /// # Example
    /// ```
    /// use gameboard_api::domain::agent::AgentState;
    ///
    /// assert!(AgentState::Idle.can_transition_to(AgentState::Working));
    /// assert!(!AgentState::Error.can_transition_to(AgentState::Working));
    /// ```
    pub fn can_transition_to(&self, next: AgentState) -> bool {
        use AgentState::*;
        matches!(
            (self, next),
            (Idle, Working)
                | (Working, FinishedWork)
                | (FinishedWork, Idle)
                | (Idle, UnderQa)
                | (UnderQa, Idle)
                | (Idle, WorkingQa)
                | (WorkingQa, FinishedQaWork)
                | (FinishedQaWork, Idle)
                | (Error, Idle)
                | (Idle, Idle)
        ) || (next == Error && *self != Error)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentState::Idle => write!(f, "idle"),
            AgentState::Working => write!(f, "working"),
            AgentState::FinishedWork => write!(f, "finished_work"),
            AgentState::UnderQa => write!(f, "under_qa"),
            AgentState::WorkingQa => write!(f, "working_qa"),
            AgentState::FinishedQaWork => write!(f, "finished_qa_work"),
            AgentState::Error => write!(f, "error"),
        }
    }
}

/// Role of an agent in the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Produces artifacts from blocks
    #[serde(alias = "developer")]
    Producer,
    /// Reviews a producer's artifacts
    #[serde(alias = "qa")]
    Reviewer,
}

impl AgentRole {
    /// Human-facing label used for default agent names
    pub fn label(&self) -> &'static str {
        match self {
            AgentRole::Producer => "Developer",
            AgentRole::Reviewer => "Qa",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::Producer => write!(f, "producer"),
            AgentRole::Reviewer => write!(f, "reviewer"),
        }
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "producer" | "developer" => Ok(AgentRole::Producer),
            "reviewer" | "qa" => Ok(AgentRole::Reviewer),
            other => Err(format!("Unknown agent role: {}", other)),
        }
    }
}

/// A point on the 2D layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.0}, {:.0})", self.x, self.y)
    }
}

/// Text-generation provider family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Anthropic,
    OpenAi,
    #[serde(alias = "google")]
    Gemini,
}

impl ProviderType {
    /// Model used when an agent does not name one
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "claude-3-7-sonnet-20250219",
            ProviderType::OpenAi => "gpt-4.1",
            ProviderType::Gemini => "gemini-2.5-pro-preview-03-25",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Anthropic => write!(f, "anthropic"),
            ProviderType::OpenAi => write!(f, "openai"),
            ProviderType::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(ProviderType::Anthropic),
            "openai" => Ok(ProviderType::OpenAi),
            "gemini" | "google" => Ok(ProviderType::Gemini),
            other => Err(format!("Unsupported provider type: {}", other)),
        }
    }
}

/// Which provider (and optionally which model) an agent generates with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    #[serde(rename = "model", default)]
    pub model_name: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType, model_name: Option<String>) -> Self {
        Self {
            provider_type,
            model_name,
        }
    }

    /// The model that will actually be requested
    pub fn effective_model(&self) -> &str {
        self.model_name
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider_type.default_model())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(ProviderType::Anthropic, None)
    }
}

/// Outcome of a review pass over a producer's artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    RevisionRequested { feedback: String },
}

impl ReviewDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, ReviewDecision::Approved)
    }
}
