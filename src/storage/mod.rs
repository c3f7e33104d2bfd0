//! Replay and task storage contracts (spec.md §4.8), with in-memory and
//! SQLite backings.

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::{InMemoryReplayStore, InMemoryTaskStore};
pub use sqlite::{SqliteReplayStore, SqliteTaskStore};
pub use traits::{ReplayStore, StorageError, StorageResult, TaskStore};
