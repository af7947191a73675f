use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::Rng;

use super::errors::{AgentError, AgentResult};
use super::types::ReviewReport;
use crate::domain::agent::{AgentId, ReviewDecision};
use crate::domain::repositories::ArtifactStore;

pub const DEFAULT_PASS_PROBABILITY: f64 = 0.66;

const PASS_FILE: &str = "pass.txt";
const SUGGESTION_FILE: &str = "suggestion.txt";
const NO_ARTIFACTS_FEEDBACK: &str = "No artifacts were produced to review.";

/// Simulated review run by a reviewer against a producer's artifacts
///
/// The outcome is a weighted coin flip; the artifacts are only inspected to
/// name the main file in the suggestion.
pub struct ReviewPipeline {
    artifacts: Arc<dyn ArtifactStore>,
    rng: Arc<Mutex<StdRng>>,
    pass_probability: f64,
}

impl ReviewPipeline {
    /// Creates a new review pipeline
    ///
    /// # Arguments
    /// * `artifacts` - Store holding both the producer's and the reviewer's files
    /// * `rng` - Shared, seedable randomness source
    /// * `pass_probability` - Chance of a pass, clamped to `[0, 1]`
    pub fn new(
        artifacts: Arc<dyn ArtifactStore>,
        rng: Arc<Mutex<StdRng>>,
        pass_probability: f64,
    ) -> Self {
        Self {
            artifacts,
            rng,
            pass_probability: pass_probability.clamp(0.0, 1.0),
        }
    }

    /// Decides on a list of artifact names
    pub fn decide<R: Rng + ?Sized>(&self, artifacts: &[String], rng: &mut R) -> ReviewDecision {
        let Some(main) = main_artifact(artifacts) else {
            return ReviewDecision::RevisionRequested {
                feedback: NO_ARTIFACTS_FEEDBACK.to_string(),
            };
        };

        if rng.gen_bool(self.pass_probability) {
            ReviewDecision::Approved
        } else {
            ReviewDecision::RevisionRequested {
                feedback: format!("[Suggestion] Add more content/detail to {}.", main),
            }
        }
    }

    /// Reviews `producer` and writes the verdict into `reviewer`'s artifact space
    pub async fn run(&self, reviewer: &AgentId, producer: &AgentId) -> AgentResult<ReviewReport> {
        let reviewed = self
            .artifacts
            .list(producer)
            .await
            .map_err(AgentError::Store)?;

        let decision = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            self.decide(&reviewed, &mut *rng)
        };

        let (written, stale, content) = match &decision {
            ReviewDecision::Approved => (PASS_FILE, SUGGESTION_FILE, "PASS"),
            ReviewDecision::RevisionRequested { feedback } => {
                (SUGGESTION_FILE, PASS_FILE, feedback.as_str())
            }
        };

        self.artifacts
            .write(reviewer, written, content)
            .await
            .map_err(AgentError::Store)?;
        self.artifacts
            .remove(reviewer, stale)
            .await
            .map_err(AgentError::Store)?;

        tracing::info!(
            agent_id = %reviewer,
            producer_id = %producer,
            approved = decision.is_approved(),
            "Review finished"
        );

        Ok(ReviewReport {
            producer_id: producer.clone(),
            reviewed,
            decision,
        })
    }
}

/// The file a suggestion refers to: an entry point if there is one, else the first file
fn main_artifact(artifacts: &[String]) -> Option<&str> {
    const ENTRY_POINTS: [&str; 4] = ["index", "main", "app", "core"];

    artifacts
        .iter()
        .find(|name| {
            let stem = name.rsplit('/').next().unwrap_or(name.as_str()).to_ascii_lowercase();
            ENTRY_POINTS.iter().any(|entry| stem.starts_with(entry))
        })
        .or_else(|| artifacts.first())
        .map(String::as_str)
}
