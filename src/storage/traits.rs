//! Storage trait definitions (spec.md §4.8).
//!
//! Abstract interfaces the peer pipeline depends on; implementations live in
//! `memory` (testing/default) and `sqlite` (durable), mirroring the
//! teacher's `DepositStore`/`StealthStore` split across those same two
//! backings.

use async_trait::async_trait;
use thiserror::Error;

use crate::task::Task;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("connection error: {0}")]
    Connection(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Tracks `(from, id)` pairs already processed, for duplicate-message
/// rejection (spec.md §8 testable property 7). `check_and_mark` must be a
/// single atomic operation: the peer pipeline never calls `has_seen` and
/// `mark_seen` as two separate steps, since that would race under
/// concurrent delivery of the same message (spec.md §11).
#[async_trait]
pub trait ReplayStore: Send + Sync {
    /// Atomically test-and-set. Returns `true` if `(from, id)` was already
    /// present (the caller must treat this as a duplicate), `false` if this
    /// call just recorded it for the first time.
    async fn check_and_mark(&self, from: &str, id: &str) -> StorageResult<bool>;

    /// Drop entries recorded more than `ttl_secs` ago. Implementations that
    /// do not expire entries may no-op.
    async fn sweep_expired(&self, ttl_secs: u64) -> StorageResult<u64>;
}

/// Durable task records (spec.md §3 Task, §4.8).
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, id: &str) -> StorageResult<Option<Task>>;
    async fn set(&self, task: Task) -> StorageResult<()>;
    async fn delete(&self, id: &str) -> StorageResult<bool>;
}
