use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::domain::agent::AgentId;
use crate::domain::repositories::ArtifactStore;

/// Filesystem implementation of ArtifactStore
///
/// Layout under the output root:
/// ```text
/// agents/<agent_id>/files/<filename>
/// agents/<agent_id>/logs/<name>_<timestamp>.txt
/// ```
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `root` (created lazily on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn agent_dir(&self, agent_id: &AgentId) -> PathBuf {
        self.root.join("agents").join(agent_id.as_str())
    }

    fn files_dir(&self, agent_id: &AgentId) -> PathBuf {
        self.agent_dir(agent_id).join("files")
    }

    fn logs_dir(&self, agent_id: &AgentId) -> PathBuf {
        self.agent_dir(agent_id).join("logs")
    }

    fn file_path(&self, agent_id: &AgentId, filename: &str) -> Result<PathBuf, String> {
        let relative = Path::new(filename);
        let safe = !filename.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(format!("Refusing to store artifact outside agent dir: {}", filename));
        }
        Ok(self.files_dir(agent_id).join(relative))
    }
}

async fn remove_dir_if_exists(path: &Path) -> Result<(), String> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(format!("Failed to remove {}: {}", path.display(), e)),
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn clear(&self, agent_id: &AgentId) -> Result<(), String> {
        remove_dir_if_exists(&self.files_dir(agent_id)).await
    }

    async fn write(&self, agent_id: &AgentId, filename: &str, content: &str) -> Result<(), String> {
        let path = self.file_path(agent_id, filename)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        fs::write(&path, content)
            .await
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }

    async fn read(&self, agent_id: &AgentId, filename: &str) -> Result<Option<String>, String> {
        let path = self.file_path(agent_id, filename)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("Failed to read {}: {}", path.display(), e)),
        }
    }

    async fn list(&self, agent_id: &AgentId) -> Result<Vec<String>, String> {
        let dir = self.files_dir(agent_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(format!("Failed to list {}: {}", dir.display(), e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| format!("Failed to list {}: {}", dir.display(), e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn remove(&self, agent_id: &AgentId, filename: &str) -> Result<(), String> {
        let path = self.file_path(agent_id, filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("Failed to remove {}: {}", path.display(), e)),
        }
    }

    async fn write_log(&self, agent_id: &AgentId, name: &str, content: &str) -> Result<(), String> {
        let dir = self.logs_dir(agent_id);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%6f");
        let path = dir.join(format!("{}_{}.txt", name, stamp));
        fs::write(&path, content)
            .await
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }

    async fn remove_all(&self, agent_id: &AgentId) -> Result<(), String> {
        remove_dir_if_exists(&self.agent_dir(agent_id)).await
    }
}
