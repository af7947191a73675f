use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Record families kept in the entity store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Agent,
    Block,
    Layout,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Agent => "agent",
            EntityKind::Block => "block",
            EntityKind::Layout => "layout",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyed, whole-record storage
///
/// Records are opaque JSON documents. Implementations give no locking
/// guarantees; callers serialise read-modify-write cycles themselves.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch a record, `None` if absent
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>, String>;

    /// Insert or overwrite a record
    async fn put(&self, kind: EntityKind, id: &str, record: Value) -> Result<(), String>;

    /// Delete a record, returning whether it existed
    async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, String>;

    /// All records of a kind, in no particular order
    async fn list_all(&self, kind: EntityKind) -> Result<Vec<Value>, String>;
}
