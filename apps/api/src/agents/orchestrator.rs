use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::broadcast;

use super::errors::{AgentError, AgentResult};
use super::events::AgentEvent;
use super::locks::EntityLocks;
use super::pool::{JobQueue, DEFAULT_CAPACITY, DEFAULT_WORKERS};
use super::provider::ProviderGateway;
use super::retry::RetryPolicy;
use super::reviewer::{ReviewPipeline, DEFAULT_PASS_PROBABILITY};
use super::types::{TaskBrief, WorkOrder};
use super::worker::WorkPipeline;
use crate::domain::agent::{
    Agent, AgentId, AgentRole, AgentState, Position, ProviderConfig, ProviderType, StateChange,
};
use crate::domain::block::Block;
use crate::domain::repositories::{ArtifactStore, EntityStore, Records};
use crate::domain::zone::{allocate, validate_layout, Allocation, Zone, ZoneType};

const EVENT_CAPACITY: usize = 256;

/// Tunables for the orchestrator and the pipelines it launches
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Provider used when a spawn request does not name one
    pub default_provider: ProviderType,
    /// Move a reviewer onto its producer when a review starts
    pub reviewer_joins_producer: bool,
    /// Where new agents appear
    pub spawn_position: Position,
    pub retry: RetryPolicy,
    pub pass_probability: f64,
    pub workers: usize,
    pub queue_capacity: usize,
    /// Fixed seed for zone selection and review outcomes; random when `None`
    pub rng_seed: Option<u64>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            default_provider: ProviderType::Anthropic,
            reviewer_joins_producer: true,
            spawn_position: Position::new(50.0, 50.0),
            retry: RetryPolicy::default(),
            pass_probability: DEFAULT_PASS_PROBABILITY,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_CAPACITY,
            rng_seed: None,
        }
    }
}

/// Outcome of a completion that moves an agent into a zone
#[derive(Debug, Clone, Serialize)]
pub struct Relocation {
    pub agent: Agent,
    /// The zone the agent was placed in, `None` when every zone was taken
    pub zone_id: Option<String>,
}

/// Everything on the board at once
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub blocks: Vec<Block>,
    pub agents: Vec<Agent>,
    pub zones: Vec<Zone>,
}

struct Inner {
    records: Records,
    artifacts: Arc<dyn ArtifactStore>,
    work: WorkPipeline,
    review: ReviewPipeline,
    jobs: JobQueue,
    locks: EntityLocks,
    allocation: tokio::sync::Mutex<()>,
    rng: Arc<Mutex<StdRng>>,
    events: broadcast::Sender<AgentEvent>,
    settings: OrchestratorSettings,
}

/// Agent lifecycle orchestrator
///
/// Owns the state machine of every agent: assignment, completion, review
/// hand-off and relocation. Pipelines run on a bounded job queue and report
/// back through [`AgentEvent`]s.
///
/// Every transition runs under the agent's lock; transitions touching two
/// agents lock both in id order, and zone allocation is serialized so two
/// agents can never be placed into the same free zone.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Creates a new orchestrator and starts its worker pool
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    /// * `store` - Agent, block and layout records
    /// * `artifacts` - Per-agent produced files and diagnostic logs
    /// * `gateway` - Text-generation backend used by the work pipeline
    /// * `settings` - Tunables, see [`OrchestratorSettings`]
    pub fn new(
        store: Arc<dyn EntityStore>,
        artifacts: Arc<dyn ArtifactStore>,
        gateway: Arc<dyn ProviderGateway>,
        settings: OrchestratorSettings,
    ) -> Self {
        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let rng = Arc::new(Mutex::new(rng));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = Inner {
            records: Records::new(store),
            artifacts: Arc::clone(&artifacts),
            work: WorkPipeline::new(gateway, Arc::clone(&artifacts), settings.retry.clone()),
            review: ReviewPipeline::new(artifacts, Arc::clone(&rng), settings.pass_probability),
            jobs: JobQueue::new(settings.workers, settings.queue_capacity),
            locks: EntityLocks::new(),
            allocation: tokio::sync::Mutex::new(()),
            rng,
            events,
            settings,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Receives every lifecycle event from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.inner.events.subscribe()
    }

    /// Stops accepting pipelines and waits for queued ones to finish
    pub async fn shutdown(&self) {
        self.inner.jobs.shutdown().await;
    }

    pub async fn spawn_agent(
        &self,
        role: AgentRole,
        provider: Option<ProviderConfig>,
        name: Option<String>,
    ) -> AgentResult<Agent> {
        let provider =
            provider.unwrap_or_else(|| ProviderConfig::new(self.inner.settings.default_provider, None));
        let agent = Agent::spawn(role, name, provider, self.inner.settings.spawn_position);
        self.save(&agent).await?;

        tracing::info!(
            agent_id = %agent.id,
            role = %agent.role,
            provider = %agent.provider.provider_type,
            "Agent spawned"
        );
        self.emit(AgentEvent::Spawned {
            agent_id: agent.id.clone(),
            role: agent.role,
        });
        Ok(agent)
    }

    /// Deletes the agent record and everything it produced
    pub async fn remove_agent(&self, id: &AgentId) -> AgentResult<()> {
        let guard = self.inner.locks.lock(id).await;
        let deleted = self
            .inner
            .records
            .delete_agent(id)
            .await
            .map_err(AgentError::Store)?;
        if !deleted {
            return Err(AgentError::AgentNotFound(id.to_string()));
        }

        self.inner
            .artifacts
            .remove_all(id)
            .await
            .map_err(AgentError::Store)?;
        drop(guard);
        self.inner.locks.forget(id);

        tracing::info!(agent_id = %id, "Agent removed");
        self.emit(AgentEvent::Removed {
            agent_id: id.clone(),
        });
        Ok(())
    }

    /// Manual move; always leaves the agent idle, clears any error and drops its links
    ///
    /// A reviewer moved away mid-review releases its producer back to idle.
    pub async fn relocate_agent(&self, id: &AgentId, position: Position) -> AgentResult<Agent> {
        let (agent, peer) = {
            let _guard = self.inner.locks.lock(id).await;
            let mut agent = self.load(id).await?;

            let (change, peer) = agent.move_to(position);
            self.save(&agent).await?;

            tracing::info!(agent_id = %id, from = %change.from, position = %position, "Agent moved");
            (agent, peer)
        };

        if let Some(producer_id) = peer {
            tracing::warn!(agent_id = %id, producer_id = %producer_id, "Reviewer moved away, abandoning its review");
            self.release_producer(&producer_id, None).await;
        }

        self.emit(AgentEvent::Moved {
            agent_id: id.clone(),
            position,
        });
        Ok(agent)
    }

    /// Sends a producer to `position` and starts the work pipeline on `block_id`
    ///
    /// An agent that is not idle is taken anyway; the mismatch is only logged.
    ///
    /// # Errors
    /// * `AgentNotFound` / `BlockNotFound` - nothing is changed
    /// * `LaunchFailed` - the agent is left in `error`
    pub async fn assign_task(
        &self,
        id: &AgentId,
        block_id: &str,
        marker_id: Option<String>,
        position: Position,
    ) -> AgentResult<Agent> {
        let _guard = self.inner.locks.lock(id).await;
        let mut agent = self.load(id).await?;
        let block = self
            .inner
            .records
            .find_block(block_id)
            .await
            .map_err(AgentError::Store)?
            .ok_or_else(|| AgentError::BlockNotFound(block_id.to_string()))?;

        if agent.state != AgentState::Idle {
            tracing::warn!(agent_id = %id, state = %agent.state, "Assigning work to an agent that is not idle");
        }

        agent.begin_work(&block.id, block.display_title(), position);
        self.save(&agent).await?;

        let order = WorkOrder {
            agent_id: agent.id.clone(),
            block_id: block.id.clone(),
            marker_id,
            task: TaskBrief::new(block.title.clone(), block.description.clone()),
            provider: agent.provider.clone(),
        };
        let this = self.clone();
        let launched = self.inner.jobs.submit("work", async move {
            this.finish_work(order).await;
        });

        if let Err(e) = launched {
            tracing::error!(agent_id = %id, block_id, error = %e, "Could not start work pipeline");
            agent.fail(format!("Error starting work on {}", block_id), e.to_string());
            self.save_quietly(&agent).await;
            self.emit(AgentEvent::WorkFailed {
                agent_id: id.clone(),
                reason: e.to_string(),
            });
            return Err(e);
        }

        tracing::info!(agent_id = %id, block_id, "Work pipeline queued");
        self.emit(AgentEvent::TaskAssigned {
            agent_id: id.clone(),
            block_id: block.id,
        });
        Ok(agent)
    }

    /// Runs the work pipeline and records its outcome on the producer
    async fn finish_work(&self, order: WorkOrder) {
        let result = self.inner.work.run(&order).await;

        let _guard = self.inner.locks.lock(&order.agent_id).await;
        let mut agent = match self.load(&order.agent_id).await {
            Ok(agent) => agent,
            Err(e) => {
                tracing::warn!(agent_id = %order.agent_id, error = %e, "Agent gone before work finished");
                return;
            }
        };

        let event = match result {
            Ok((_, report)) => {
                let change = agent.finish_work(order.marker_id.clone());
                log_unexpected(&agent.id, change);
                AgentEvent::WorkFinished {
                    agent_id: agent.id.clone(),
                    block_id: order.block_id.clone(),
                    files: report.produced,
                }
            }
            Err(e) => {
                tracing::error!(agent_id = %agent.id, error = %e, "Work pipeline failed");
                agent.fail(format!("Error processing: {}", order.task.title), e.to_string());
                AgentEvent::WorkFailed {
                    agent_id: agent.id.clone(),
                    reason: e.to_string(),
                }
            }
        };

        self.save_quietly(&agent).await;
        self.emit(event);
    }

    /// Moves a finished producer into a free arrival zone and makes it idle
    ///
    /// When no zone is free the agent stays where it is but still becomes idle.
    pub async fn complete_and_relocate(&self, id: &AgentId) -> AgentResult<Relocation> {
        let _guard = self.inner.locks.lock(id).await;
        let mut agent = self.load(id).await?;

        if agent.state != AgentState::FinishedWork {
            tracing::warn!(agent_id = %id, state = %agent.state, "Completing an agent that has not finished work");
        }

        let placed = {
            let _slot = self.inner.allocation.lock().await;
            match self.pick_zone(id, ZoneType::Arrival).await {
                Ok(allocation) => {
                    agent.return_to_idle(allocation.as_ref().map(|a| a.center));
                    self.save(&agent).await.map(|_| allocation)
                }
                Err(e) => Err(e),
            }
        };

        match placed {
            Ok(allocation) => Ok(self.relocated(agent, allocation)),
            Err(e) => {
                tracing::error!(agent_id = %id, error = %e, "Final move failed");
                agent.fail("Error during final move", e.to_string());
                self.save_quietly(&agent).await;
                Err(e)
            }
        }
    }

    /// Links an idle reviewer to a producer and starts the review pipeline
    ///
    /// # Errors
    /// * `Conflict` - the reviewer is busy, is not a reviewer, or is the producer
    /// * `AgentNotFound` - either agent is missing
    /// * `LaunchFailed` - reviewer left in `error`, producer back to `idle`
    pub async fn start_review(
        &self,
        reviewer_id: &AgentId,
        producer_id: &AgentId,
    ) -> AgentResult<(Agent, Agent)> {
        let _guards = self.inner.locks.lock_pair(reviewer_id, producer_id).await;
        let mut reviewer = self.load(reviewer_id).await?;
        let mut producer = self.load(producer_id).await?;

        reviewer
            .begin_review(&producer.id)
            .map_err(AgentError::Conflict)?;

        if producer.state != AgentState::Idle {
            tracing::warn!(agent_id = %producer.id, state = %producer.state, "Producer was not idle when review started");
        }
        producer.enter_review();
        if self.inner.settings.reviewer_joins_producer {
            reviewer.position = producer.position;
        }

        self.save(&reviewer).await?;
        self.save(&producer).await?;

        let this = self.clone();
        let (r, p) = (reviewer.id.clone(), producer.id.clone());
        let launched = self.inner.jobs.submit("review", async move {
            this.finish_review(r, p).await;
        });

        if let Err(e) = launched {
            tracing::error!(agent_id = %reviewer.id, error = %e, "Could not start review pipeline");
            reviewer.fail(format!("Error starting QA for {}", producer.id), e.to_string());
            producer.return_to_idle(None);
            self.save_quietly(&reviewer).await;
            self.save_quietly(&producer).await;
            self.emit(AgentEvent::ReviewFailed {
                agent_id: reviewer.id.clone(),
                reason: e.to_string(),
            });
            return Err(e);
        }

        tracing::info!(agent_id = %reviewer.id, producer_id = %producer.id, "Review pipeline queued");
        self.emit(AgentEvent::ReviewStarted {
            agent_id: reviewer.id.clone(),
            producer_id: producer.id.clone(),
        });
        Ok((reviewer, producer))
    }

    /// Runs the review pipeline and records the decision on the reviewer
    async fn finish_review(&self, reviewer_id: AgentId, producer_id: AgentId) {
        let result = self.inner.review.run(&reviewer_id, &producer_id).await;

        let _guard = self.inner.locks.lock(&reviewer_id).await;
        let mut reviewer = match self.load(&reviewer_id).await {
            Ok(agent) => agent,
            Err(e) => {
                tracing::warn!(agent_id = %reviewer_id, error = %e, "Reviewer gone before review finished");
                return;
            }
        };

        let event = match result {
            Ok(report) => {
                let change = reviewer.finish_review(report.decision.clone());
                log_unexpected(&reviewer.id, change);
                AgentEvent::ReviewFinished {
                    agent_id: reviewer_id.clone(),
                    producer_id,
                    decision: report.decision,
                }
            }
            Err(e) => {
                tracing::error!(agent_id = %reviewer_id, error = %e, "Review pipeline failed");
                reviewer.fail(format!("Error during QA of {}", producer_id), e.to_string());
                AgentEvent::ReviewFailed {
                    agent_id: reviewer_id.clone(),
                    reason: e.to_string(),
                }
            }
        };

        self.save_quietly(&reviewer).await;
        self.emit(event);
    }

    /// Moves a reviewer into a free drop-off zone and releases its producer
    ///
    /// The producer is only released when it is still `under_qa`; otherwise
    /// the mismatch is logged and the reviewer completes regardless.
    pub async fn complete_review_and_relocate(&self, reviewer_id: &AgentId) -> AgentResult<Relocation> {
        let (relocation, producer_id) = {
            let _guard = self.inner.locks.lock(reviewer_id).await;
            let mut reviewer = self.load(reviewer_id).await?;

            if reviewer.state != AgentState::FinishedQaWork {
                tracing::warn!(agent_id = %reviewer_id, state = %reviewer.state, "Completing a review that has not finished");
            }

            let placed = {
                let _slot = self.inner.allocation.lock().await;
                match self.pick_zone(reviewer_id, ZoneType::DropOff).await {
                    Ok(allocation) => {
                        let (_, peer) = reviewer.leave_review(allocation.as_ref().map(|a| a.center));
                        self.save(&reviewer).await.map(|_| (allocation, peer))
                    }
                    Err(e) => Err(e),
                }
            };

            match placed {
                Ok((allocation, peer)) => (self.relocated(reviewer, allocation), peer),
                Err(e) => {
                    tracing::error!(agent_id = %reviewer_id, error = %e, "QA final move failed");
                    reviewer.fail("Error during QA final move", e.to_string());
                    self.save_quietly(&reviewer).await;
                    return Err(e);
                }
            }
        };

        match producer_id {
            Some(producer_id) => {
                self.release_producer(&producer_id, Some("QA Completed".to_string()))
                    .await
            }
            None => tracing::warn!(agent_id = %reviewer_id, "Reviewer had no linked producer"),
        }

        Ok(relocation)
    }

    /// Returns a reviewed producer to idle; problems are logged, never raised
    async fn release_producer(&self, producer_id: &AgentId, status_title: Option<String>) {
        let _guard = self.inner.locks.lock(producer_id).await;
        let mut producer = match self.inner.records.find_agent(producer_id).await {
            Ok(Some(producer)) => producer,
            Ok(None) => {
                tracing::warn!(agent_id = %producer_id, "Reviewed producer no longer exists");
                return;
            }
            Err(e) => {
                tracing::error!(agent_id = %producer_id, error = %e, "Could not load reviewed producer");
                return;
            }
        };

        match producer.release_from_review(status_title) {
            Some(_) => {
                self.save_quietly(&producer).await;
                tracing::info!(agent_id = %producer_id, "Producer released from review");
            }
            None => tracing::warn!(
                agent_id = %producer_id,
                state = %producer.state,
                "Reviewed producer was not under review, leaving it alone"
            ),
        }
    }

    pub async fn get_agent(&self, id: &AgentId) -> AgentResult<Agent> {
        self.load(id).await
    }

    pub async fn list_agents(&self) -> AgentResult<Vec<Agent>> {
        self.inner.records.list_agents().await.map_err(AgentError::Store)
    }

    pub async fn list_zones(&self) -> AgentResult<Vec<Zone>> {
        self.inner.records.load_zones().await.map_err(AgentError::Store)
    }

    /// Replaces the zone layout after validating it
    pub async fn save_zones(&self, zones: Vec<Zone>) -> AgentResult<Vec<Zone>> {
        validate_layout(&zones).map_err(AgentError::InvalidInput)?;

        let _slot = self.inner.allocation.lock().await;
        self.inner
            .records
            .save_zones(&zones)
            .await
            .map_err(AgentError::Store)?;
        tracing::info!(count = zones.len(), "Zone layout saved");
        Ok(zones)
    }

    pub async fn get_block(&self, id: &str) -> AgentResult<Block> {
        self.inner
            .records
            .find_block(id)
            .await
            .map_err(AgentError::Store)?
            .ok_or_else(|| AgentError::BlockNotFound(id.to_string()))
    }

    pub async fn list_blocks(&self) -> AgentResult<Vec<Block>> {
        self.inner.records.list_blocks().await.map_err(AgentError::Store)
    }

    /// Replaces every block on the board
    pub async fn save_blocks(&self, blocks: Vec<Block>) -> AgentResult<Vec<Block>> {
        let saved = self
            .inner
            .records
            .replace_blocks(blocks)
            .await
            .map_err(AgentError::Store)?;
        tracing::info!(count = saved.len(), "Blocks saved");
        Ok(saved)
    }

    pub async fn snapshot(&self) -> AgentResult<BoardSnapshot> {
        Ok(BoardSnapshot {
            blocks: self.list_blocks().await?,
            agents: self.list_agents().await?,
            zones: self.list_zones().await?,
        })
    }

    async fn load(&self, id: &AgentId) -> AgentResult<Agent> {
        self.inner
            .records
            .find_agent(id)
            .await
            .map_err(AgentError::Store)?
            .ok_or_else(|| AgentError::AgentNotFound(id.to_string()))
    }

    async fn save(&self, agent: &Agent) -> AgentResult<()> {
        self.inner
            .records
            .save_agent(agent)
            .await
            .map_err(AgentError::Store)
    }

    /// Saves on a path that is already reporting a failure
    async fn save_quietly(&self, agent: &Agent) {
        if let Err(e) = self.save(agent).await {
            tracing::error!(agent_id = %agent.id, error = %e, "Failed to persist agent");
        }
    }

    /// Picks a free zone for `id`; the caller must hold the allocation lock
    async fn pick_zone(&self, id: &AgentId, zone_type: ZoneType) -> AgentResult<Option<Allocation>> {
        let occupants: Vec<Position> = self
            .list_agents()
            .await?
            .into_iter()
            .filter(|agent| &agent.id != id)
            .map(|agent| agent.position)
            .collect();
        let zones = self.list_zones().await?;

        let allocation = {
            let mut rng = self
                .inner
                .rng
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            allocate(zone_type, &zones, &occupants, &mut *rng)
        };

        match &allocation {
            Some(a) => tracing::info!(agent_id = %id, zone_id = %a.zone_id, zone_type = %zone_type, "Zone allocated"),
            None => tracing::warn!(agent_id = %id, zone_type = %zone_type, "No free zone, agent keeps its position"),
        }
        Ok(allocation)
    }

    fn relocated(&self, agent: Agent, allocation: Option<Allocation>) -> Relocation {
        let zone_id = allocation.map(|a| a.zone_id);
        self.emit(AgentEvent::Relocated {
            agent_id: agent.id.clone(),
            zone_id: zone_id.clone(),
            position: agent.position,
        });
        Relocation { agent, zone_id }
    }

    fn emit(&self, event: AgentEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

fn log_unexpected(id: &AgentId, change: StateChange) {
    if !change.is_expected() {
        tracing::warn!(agent_id = %id, from = %change.from, to = %change.to, "Unexpected state change");
    }
}
