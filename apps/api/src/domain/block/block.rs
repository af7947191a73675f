use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::agent::AgentId;

/// Whether a block has been picked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    #[default]
    Pending,
    Taken,
}

/// A unit of work on the board
///
/// The core only reads `title` and `description`. Anything else the client
/// sends along (layout coordinates, colours) is kept in `extra` and written
/// back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "block_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: BlockStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_agent_id: Option<AgentId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Self::generate_id(),
            title: title.into(),
            description: description.into(),
            status: BlockStatus::Pending,
            owning_agent_id: None,
            extra: Map::new(),
        }
    }

    /// Generates a fresh id of the form `block_xxxxxx`
    pub fn generate_id() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("block_{}", &hex[..6])
    }

    /// Assigns an id if the client did not send one
    pub fn ensure_id(&mut self) {
        if self.id.trim().is_empty() {
            self.id = Self::generate_id();
        }
    }

    /// Title used in status messages, falling back to the id
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_block_is_pending_with_generated_id() {
        let block = Block::new("Landing page", "Build a landing page");

        assert!(block.id.starts_with("block_"));
        assert_eq!(block.id.len(), "block_".len() + 6);
        assert_eq!(block.status, BlockStatus::Pending);
    }

    #[test]
    fn client_fields_survive_a_round_trip() {
        let raw = json!({
            "title": "Calculator",
            "description": "A python calculator",
            "x": 120,
            "color": "#ffcc00"
        });

        let mut block: Block = serde_json::from_value(raw).unwrap();
        block.ensure_id();
        let back = serde_json::to_value(&block).unwrap();

        assert!(block.id.starts_with("block_"));
        assert_eq!(back["block_id"], block.id.as_str());
        assert_eq!(back["x"], 120);
        assert_eq!(back["color"], "#ffcc00");
        assert_eq!(back["status"], "pending");
    }

    #[test]
    fn ensure_id_keeps_existing_id() {
        let mut block: Block = serde_json::from_value(json!({"id": "block_abc123"})).unwrap();
        block.ensure_id();
        assert_eq!(block.id, "block_abc123");
    }

    #[test]
    fn display_title_falls_back_to_id() {
        let mut block = Block::new("", "");
        block.id = "block_000001".to_string();
        assert_eq!(block.display_title(), "block_000001");
    }
}
