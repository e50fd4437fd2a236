use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::LockError;

/// Defines the contract for lock storage backends.
///
/// A backend provides one lock slot per resource id, shared by every process
/// that points at the same storage. `try_acquire` never waits: it either takes
/// the free slot or reports that someone else holds it.
pub trait LockStore: Send + Sync {
    /// Attempt to take the slot for `resource_id`.
    ///
    /// `Ok(None)` means the slot is held by another owner. `Err` means the
    /// storage itself could not be used.
    fn try_acquire(&self, resource_id: &str) -> Result<Option<LockSlot>, LockError>;

    /// Short human-readable description used in logs.
    fn describe(&self) -> String;
}

type Releaser = Box<dyn FnOnce() + Send>;

/// A held lock slot. Frees the slot exactly once, either through
/// [`LockSlot::release`] or on drop.
pub struct LockSlot {
    resource_id: String,
    token: String,
    releaser: Option<Releaser>,
}

impl LockSlot {
    pub fn new(
        resource_id: impl Into<String>,
        token: impl Into<String>,
        releaser: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            token: token.into(),
            releaser: Some(Box::new(releaser)),
        }
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Owner token written by the backend when the slot was taken.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_held(&self) -> bool {
        self.releaser.is_some()
    }

    /// Free the slot. Calls after the first are no-ops.
    pub fn release(&mut self) {
        if let Some(releaser) = self.releaser.take() {
            releaser();
        }
    }
}

impl Drop for LockSlot {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for LockSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockSlot")
            .field("resource_id", &self.resource_id)
            .field("token", &self.token)
            .field("held", &self.is_held())
            .finish()
    }
}

/// Who holds a slot. Persistent backends record this next to the lock so an
/// operator can tell which process left a stale one behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOwner {
    pub token: String,
    pub pid: u32,
    pub hostname: String,
    /// Milliseconds since the Unix epoch
    pub acquired_at: u64,
}

impl LockOwner {
    pub fn current(hostname: &str) -> Self {
        Self {
            token: nanoid::nanoid!(),
            pid: std::process::id(),
            hostname: hostname.to_string(),
            acquired_at: now_ms(),
        }
    }
}

pub(crate) fn now_ms() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}
