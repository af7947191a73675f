use async_trait::async_trait;

use crate::domain::agent::AgentId;

/// Per-agent storage for produced files and diagnostic logs
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Remove every produced file of the agent (logs are kept)
    async fn clear(&self, agent_id: &AgentId) -> Result<(), String>;

    /// Write (or overwrite) one produced file
    async fn write(&self, agent_id: &AgentId, filename: &str, content: &str)
        -> Result<(), String>;

    /// Read one produced file, `None` if it does not exist
    async fn read(&self, agent_id: &AgentId, filename: &str) -> Result<Option<String>, String>;

    /// Names of all produced files, sorted
    async fn list(&self, agent_id: &AgentId) -> Result<Vec<String>, String>;

    /// Remove one produced file; missing files are not an error
    async fn remove(&self, agent_id: &AgentId, filename: &str) -> Result<(), String>;

    /// Append a diagnostic entry named after the stage that produced it
    async fn write_log(&self, agent_id: &AgentId, name: &str, content: &str)
        -> Result<(), String>;

    /// Drop everything stored for the agent
    async fn remove_all(&self, agent_id: &AgentId) -> Result<(), String>;
}
