use crate::error::LockError;
use crate::infrastructure::{LockSlot, LockStore};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Process-local lock slots. Clones share the same set of held ids, so one
/// store can be handed to several allocators or threads. It gives no
/// exclusion across processes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLockStore {
    // Ids of currently held slots
    held: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, resource_id: &str) -> bool {
        self.held
            .lock()
            .map(|held| held.contains(resource_id))
            .unwrap_or(false)
    }

    pub fn held_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .held
            .lock()
            .map(|held| held.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

impl LockStore for InMemoryLockStore {
    fn try_acquire(&self, resource_id: &str) -> Result<Option<LockSlot>, LockError> {
        let inserted = self
            .held
            .lock()
            .map_err(|_| LockError::Backend("in-memory lock table poisoned".into()))?
            .insert(resource_id.to_string());

        if !inserted {
            return Ok(None);
        }

        let held = Arc::clone(&self.held);
        let id = resource_id.to_string();
        let token = nanoid::nanoid!();
        Ok(Some(LockSlot::new(resource_id, token, move || {
            if let Ok(mut held) = held.lock() {
                held.remove(&id);
            }
        })))
    }

    fn describe(&self) -> String {
        "in-memory lock table".to_string()
    }
}
