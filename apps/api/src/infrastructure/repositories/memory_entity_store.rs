use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::repositories::{EntityKind, EntityStore};

/// In-process implementation of EntityStore
///
/// Used when no database is configured and throughout the test suite.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    records: RwLock<BTreeMap<(EntityKind, String), Value>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>, String> {
        let records = self.records.read().await;
        Ok(records.get(&(kind, id.to_string())).cloned())
    }

    async fn put(&self, kind: EntityKind, id: &str, record: Value) -> Result<(), String> {
        let mut records = self.records.write().await;
        records.insert((kind, id.to_string()), record);
        Ok(())
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, String> {
        let mut records = self.records.write().await;
        Ok(records.remove(&(kind, id.to_string())).is_some())
    }

    async fn list_all(&self, kind: EntityKind) -> Result<Vec<Value>, String> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, v)| v.clone())
            .collect())
    }
}
