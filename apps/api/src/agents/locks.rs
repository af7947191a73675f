use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::agent::AgentId;

/// Per-agent async locks serializing read-modify-write cycles on agent records
#[derive(Default)]
pub struct EntityLocks {
    locks: Mutex<HashMap<AgentId, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, id: &AgentId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    /// Waits for exclusive access to one agent
    pub async fn lock(&self, id: &AgentId) -> OwnedMutexGuard<()> {
        self.handle(id).lock_owned().await
    }

    /// Locks two agents in id order so concurrent pairs cannot deadlock
    ///
    /// Locking the same id twice only takes one guard.
    pub async fn lock_pair(&self, a: &AgentId, b: &AgentId) -> Vec<OwnedMutexGuard<()>> {
        if a == b {
            return vec![self.lock(a).await];
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.lock(first).await;
        let second = self.lock(second).await;
        vec![first, second]
    }

    /// Drops the lock entry of a removed agent
    pub fn forget(&self, id: &AgentId) {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_agent_is_exclusive() {
        let locks = EntityLocks::new();
        let id = AgentId::from("agent_aaaaaa");

        let guard = locks.lock(&id).await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.lock(&id)).await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(20), locks.lock(&id)).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn different_agents_do_not_block() {
        let locks = EntityLocks::new();
        let _a = locks.lock(&AgentId::from("agent_aaaaaa")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(20),
            locks.lock(&AgentId::from("agent_bbbbbb")),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn pair_of_same_id_takes_one_guard() {
        let locks = EntityLocks::new();
        let id = AgentId::from("agent_aaaaaa");
        assert_eq!(locks.lock_pair(&id, &id).await.len(), 1);
    }

    #[tokio::test]
    async fn opposite_pair_orders_do_not_deadlock() {
        let locks = Arc::new(EntityLocks::new());
        let a = AgentId::from("agent_aaaaaa");
        let b = AgentId::from("agent_bbbbbb");

        let mut tasks = Vec::new();
        for i in 0..20 {
            let locks = Arc::clone(&locks);
            let (x, y) = if i % 2 == 0 {
                (a.clone(), b.clone())
            } else {
                (b.clone(), a.clone())
            };
            tasks.push(tokio::spawn(async move {
                let _guards = locks.lock_pair(&x, &y).await;
                tokio::task::yield_now().await;
            }));
        }

        let all = async {
            for task in tasks {
                task.await.unwrap();
            }
        };
        assert!(tokio::time::timeout(Duration::from_secs(5), all).await.is_ok());
    }
}
