//! SQLite-backed LockStore implementation.
//! Lets cooperating processes share lock slots through one database file
//! instead of a lock folder.
//!
//! Enable with the `sqlite` feature flag:
//! ```toml
//! lockable-core = { path = "../lockable-core", features = ["sqlite"] }
//! ```

use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::local_hostname;
use crate::error::LockError;
use crate::infrastructure::{LockOwner, LockSlot, LockStore};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A lock store backed by SQLite.
///
/// The resource id is the primary key of the `locks` table, so an insert
/// succeeds for exactly one owner at a time.
pub struct SqliteLockStore {
    conn: Arc<Mutex<Connection>>,
    hostname: String,
}

impl SqliteLockStore {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(path: &str) -> Result<Self, LockError> {
        let conn = Connection::open(path).map_err(backend)?;

        // WAL lets readers inspect holders while another process writes
        conn.pragma_update(None, "journal_mode", "WAL").map_err(backend)?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(backend)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(backend)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS locks (
                resource_id TEXT PRIMARY KEY,
                token       TEXT NOT NULL,
                pid         INTEGER NOT NULL,
                hostname    TEXT NOT NULL,
                acquired_at INTEGER NOT NULL
            );",
        )
        .map_err(backend)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            hostname: local_hostname(),
        })
    }

    /// Hostname recorded with the rows this store inserts.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// All currently held slots with their owners.
    pub fn holders(&self) -> Result<Vec<(String, LockOwner)>, LockError> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        let mut stmt = conn
            .prepare("SELECT resource_id, token, pid, hostname, acquired_at FROM locks ORDER BY resource_id")
            .map_err(backend)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    LockOwner {
                        token: row.get(1)?,
                        pid: row.get(2)?,
                        hostname: row.get(3)?,
                        acquired_at: row.get(4)?,
                    },
                ))
            })
            .map_err(backend)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend)
    }
}

impl LockStore for SqliteLockStore {
    fn try_acquire(&self, resource_id: &str) -> Result<Option<LockSlot>, LockError> {
        let owner = LockOwner::current(&self.hostname);
        let inserted = {
            let conn = self.conn.lock().map_err(|_| poisoned())?;
            conn.execute(
                "INSERT OR IGNORE INTO locks (resource_id, token, pid, hostname, acquired_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![resource_id, owner.token, owner.pid, owner.hostname, owner.acquired_at],
            )
            .map_err(backend)?
        };

        if inserted == 0 {
            return Ok(None);
        }

        let conn = Arc::clone(&self.conn);
        let id = resource_id.to_string();
        let token = owner.token.clone();
        Ok(Some(LockSlot::new(resource_id, owner.token, move || {
            let deleted = conn.lock().map_err(|_| poisoned()).and_then(|conn| {
                conn.execute(
                    "DELETE FROM locks WHERE resource_id = ?1 AND token = ?2",
                    params![id, token],
                )
                .map_err(backend)
            });
            match deleted {
                Ok(1) => tracing::debug!(resource_id = %id, "Lock row deleted"),
                Ok(_) => tracing::warn!(resource_id = %id, "Lock row was already gone on release"),
                Err(e) => tracing::warn!(resource_id = %id, error = %e, "Failed to delete lock row"),
            }
        })))
    }

    fn describe(&self) -> String {
        "sqlite lock table".to_string()
    }
}

fn backend(e: rusqlite::Error) -> LockError {
    LockError::Backend(e.to_string())
}

fn poisoned() -> LockError {
    LockError::Backend("sqlite connection mutex poisoned".into())
}
