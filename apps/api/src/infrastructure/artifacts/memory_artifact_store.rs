use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::domain::agent::AgentId;
use crate::domain::repositories::ArtifactStore;

#[derive(Debug, Default)]
struct AgentSpace {
    files: BTreeMap<String, String>,
    logs: Vec<(String, String)>,
}

/// In-process implementation of ArtifactStore, used by tests
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    spaces: RwLock<HashMap<AgentId, AgentSpace>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostic entries written for an agent, as `(name, content)` pairs
    pub async fn logs(&self, agent_id: &AgentId) -> Vec<(String, String)> {
        let spaces = self.spaces.read().await;
        spaces
            .get(agent_id)
            .map(|s| s.logs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn clear(&self, agent_id: &AgentId) -> Result<(), String> {
        if let Some(space) = self.spaces.write().await.get_mut(agent_id) {
            space.files.clear();
        }
        Ok(())
    }

    async fn write(&self, agent_id: &AgentId, filename: &str, content: &str) -> Result<(), String> {
        let mut spaces = self.spaces.write().await;
        spaces
            .entry(agent_id.clone())
            .or_default()
            .files
            .insert(filename.to_string(), content.to_string());
        Ok(())
    }

    async fn read(&self, agent_id: &AgentId, filename: &str) -> Result<Option<String>, String> {
        let spaces = self.spaces.read().await;
        Ok(spaces
            .get(agent_id)
            .and_then(|s| s.files.get(filename).cloned()))
    }

    async fn list(&self, agent_id: &AgentId) -> Result<Vec<String>, String> {
        let spaces = self.spaces.read().await;
        Ok(spaces
            .get(agent_id)
            .map(|s| s.files.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove(&self, agent_id: &AgentId, filename: &str) -> Result<(), String> {
        if let Some(space) = self.spaces.write().await.get_mut(agent_id) {
            space.files.remove(filename);
        }
        Ok(())
    }

    async fn write_log(&self, agent_id: &AgentId, name: &str, content: &str) -> Result<(), String> {
        let mut spaces = self.spaces.write().await;
        spaces
            .entry(agent_id.clone())
            .or_default()
            .logs
            .push((name.to_string(), content.to_string()));
        Ok(())
    }

    async fn remove_all(&self, agent_id: &AgentId) -> Result<(), String> {
        self.spaces.write().await.remove(agent_id);
        Ok(())
    }
}
