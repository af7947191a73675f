use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use super::entity_store::{EntityKind, EntityStore};
use crate::domain::agent::{Agent, AgentId};
use crate::domain::block::Block;
use crate::domain::zone::{default_zones, Zone};

const LAYOUT_ID: &str = "zones";

/// Typed access to agents, blocks and the zone layout on top of an [`EntityStore`]
#[derive(Clone)]
pub struct Records {
    store: Arc<dyn EntityStore>,
}

impl Records {
    /// Creates a new typed view over `store`
    ///
    /// # Arguments
    /// * `store` - Any entity store adapter (in-memory or Postgres)
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    async fn get<T: DeserializeOwned>(&self, kind: EntityKind, id: &str) -> Result<Option<T>, String> {
        match self.store.get(kind, id).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| format!("Corrupt {} record {}: {}", kind, id, e)),
            None => Ok(None),
        }
    }

    async fn put<T: Serialize>(&self, kind: EntityKind, id: &str, record: &T) -> Result<(), String> {
        let value = serde_json::to_value(record)
            .map_err(|e| format!("Failed to encode {} record {}: {}", kind, id, e))?;
        self.store.put(kind, id, value).await
    }

    async fn list<T: DeserializeOwned>(&self, kind: EntityKind) -> Result<Vec<T>, String> {
        let values = self.store.list_all(kind).await?;
        Ok(values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<T>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "Skipping unreadable record");
                    None
                }
            })
            .collect())
    }

    pub async fn find_agent(&self, id: &AgentId) -> Result<Option<Agent>, String> {
        self.get(EntityKind::Agent, id.as_str()).await
    }

    pub async fn save_agent(&self, agent: &Agent) -> Result<(), String> {
        self.put(EntityKind::Agent, agent.id.as_str(), agent).await
    }

    pub async fn delete_agent(&self, id: &AgentId) -> Result<bool, String> {
        self.store.delete(EntityKind::Agent, id.as_str()).await
    }

    /// All agents, oldest first
    pub async fn list_agents(&self) -> Result<Vec<Agent>, String> {
        let mut agents: Vec<Agent> = self.list(EntityKind::Agent).await?;
        agents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(agents)
    }

    pub async fn find_block(&self, id: &str) -> Result<Option<Block>, String> {
        self.get(EntityKind::Block, id).await
    }

    pub async fn save_block(&self, block: &Block) -> Result<(), String> {
        self.put(EntityKind::Block, &block.id, block).await
    }

    pub async fn list_blocks(&self) -> Result<Vec<Block>, String> {
        let mut blocks: Vec<Block> = self.list(EntityKind::Block).await?;
        blocks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(blocks)
    }

    /// Replaces the whole block set
    ///
    /// Blocks without an id get one; stored blocks missing from `blocks` are
    /// deleted. Returns the saved blocks in input order.
    pub async fn replace_blocks(&self, blocks: Vec<Block>) -> Result<Vec<Block>, String> {
        let mut saved = Vec::with_capacity(blocks.len());
        let mut keep = HashSet::new();

        for mut block in blocks {
            block.ensure_id();
            self.save_block(&block).await?;
            keep.insert(block.id.clone());
            saved.push(block);
        }

        for value in self.store.list_all(EntityKind::Block).await? {
            let Some(id) = value.get("block_id").and_then(Value::as_str) else {
                continue;
            };
            if !keep.contains(id) {
                self.store.delete(EntityKind::Block, id).await?;
                tracing::debug!(block_id = %id, "Deleted block no longer on the board");
            }
        }

        Ok(saved)
    }

    /// The saved layout, or the default layout if none was saved
    pub async fn load_zones(&self) -> Result<Vec<Zone>, String> {
        match self.store.get(EntityKind::Layout, LAYOUT_ID).await? {
            Some(value) => match serde_json::from_value::<Vec<Zone>>(value) {
                Ok(zones) => Ok(zones),
                Err(e) => {
                    tracing::warn!(error = %e, "Stored layout is unreadable, using defaults");
                    Ok(default_zones())
                }
            },
            None => Ok(default_zones()),
        }
    }

    pub async fn save_zones(&self, zones: &[Zone]) -> Result<(), String> {
        self.put(EntityKind::Layout, LAYOUT_ID, &zones).await
    }
}
