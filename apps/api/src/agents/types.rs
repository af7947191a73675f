use serde::{Deserialize, Serialize};

use super::planning::PlanSource;
use crate::domain::agent::{AgentId, ProviderConfig, ReviewDecision};

/// What a producer is asked to build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBrief {
    pub title: String,
    pub description: String,
}

impl TaskBrief {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Everything the work pipeline needs for one run
#[derive(Debug, Clone)]
pub struct WorkOrder {
    pub agent_id: AgentId,
    pub block_id: String,
    pub marker_id: Option<String>,
    pub task: TaskBrief,
    pub provider: ProviderConfig,
}

/// Insertion-ordered mapping from filename to content
///
/// Order matters: later files are generated with earlier ones as context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSet {
    entries: Vec<(String, String)>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an artifact; a replaced artifact keeps its position
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        let name = name.into();
        let content = content.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = content,
            None => self.entries.push((name, content)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }
}

/// Summary of a finished work pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub plan_source: PlanSource,
    pub planned: Vec<String>,
    pub produced: Vec<String>,
    pub skipped: Vec<String>,
    pub fixed: Vec<String>,
    pub readme_generated: bool,
}

/// Summary of a finished review pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewReport {
    pub producer_id: AgentId,
    pub reviewed: Vec<String>,
    pub decision: ReviewDecision,
}
