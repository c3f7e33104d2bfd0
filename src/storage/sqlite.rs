//! SQLite-backed durable storage via `r2d2`/`rusqlite` connection pooling,
//! the same idiom as the teacher's `SqliteDepositStore`.

use std::path::Path;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use crate::task::Task;

use super::traits::{ReplayStore, StorageError, StorageResult, TaskStore};

pub struct SqliteReplayStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteReplayStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let store = Self { pool };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let store = Self { pool };
        store.run_migrations()?;
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool.get().map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn run_migrations(&self) -> Result<(), StorageError> {
        self.conn()?
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS replay_seen (
                    from_addr TEXT NOT NULL,
                    message_id TEXT NOT NULL,
                    seen_at INTEGER NOT NULL,
                    PRIMARY KEY (from_addr, message_id)
                );
                CREATE INDEX IF NOT EXISTS idx_replay_seen_at ON replay_seen(seen_at);
                "#,
            )
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ReplayStore for SqliteReplayStore {
    async fn check_and_mark(&self, from: &str, id: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO replay_seen (from_addr, message_id, seen_at) VALUES (?1, ?2, ?3)",
            params![from, id, Self::now()],
        );

        match result {
            Ok(_) => Ok(false),
            Err(rusqlite::Error::SqliteFailure(ref err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Ok(true)
            }
            Err(e) => Err(StorageError::Database(e.to_string())),
        }
    }

    async fn sweep_expired(&self, ttl_secs: u64) -> StorageResult<u64> {
        let conn = self.conn()?;
        let cutoff = Self::now() - ttl_secs as i64;
        let rows = conn
            .execute("DELETE FROM replay_seen WHERE seen_at < ?1", params![cutoff])
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(rows as u64)
    }
}

pub struct SqliteTaskStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteTaskStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let store = Self { pool };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let store = Self { pool };
        store.run_migrations()?;
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool.get().map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn run_migrations(&self) -> Result<(), StorageError> {
        self.conn()?
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY,
                    body TEXT NOT NULL
                );
                "#,
            )
            .map_err(|e| StorageError::Database(e.to_string()))
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn get(&self, id: &str) -> StorageResult<Option<Task>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row("SELECT body FROM tasks WHERE id = ?1", params![id], |row| row.get(0))
            .optional()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        match body {
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| StorageError::Database(e.to_string())),
            None => Ok(None),
        }
    }

    async fn set(&self, task: Task) -> StorageResult<()> {
        let conn = self.conn()?;
        let body = serde_json::to_string(&task).map_err(|e| StorageError::Database(e.to_string()))?;
        conn.execute(
            "INSERT INTO tasks (id, body) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET body = excluded.body",
            params![task.id, body],
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let rows = conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(rows > 0)
    }
}
