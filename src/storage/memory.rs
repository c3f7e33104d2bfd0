//! In-memory storage: the default backing, no persistence across restarts.
//! Same `Arc<RwLock<HashMap<..>>>` idiom as the teacher's
//! `StealthDepositStore`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::task::Task;

use super::traits::{ReplayStore, StorageError, StorageResult, TaskStore};

/// `(from, id)` -> seen-at unix timestamp.
#[derive(Clone, Default)]
pub struct InMemoryReplayStore {
    seen: Arc<RwLock<HashMap<(String, String), u64>>>,
}

impl InMemoryReplayStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ReplayStore for InMemoryReplayStore {
    async fn check_and_mark(&self, from: &str, id: &str) -> StorageResult<bool> {
        let mut seen = self.seen.write().await;
        let key = (from.to_string(), id.to_string());
        if seen.contains_key(&key) {
            return Ok(true);
        }
        seen.insert(key, Self::now());
        Ok(false)
    }

    async fn sweep_expired(&self, ttl_secs: u64) -> StorageResult<u64> {
        let now = Self::now();
        let mut seen = self.seen.write().await;
        let before = seen.len();
        seen.retain(|_, seen_at| now.saturating_sub(*seen_at) < ttl_secs);
        Ok((before - seen.len()) as u64)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, id: &str) -> StorageResult<Option<Task>> {
        Ok(self.tasks.read().await.get(id).cloned())
    }

    async fn set(&self, task: Task) -> StorageResult<()> {
        self.tasks.write().await.insert(task.id.clone(), task);
        Ok(())
    }

    async fn delete(&self, id: &str) -> StorageResult<bool> {
        Ok(self.tasks.write().await.remove(id).is_some())
    }
}
