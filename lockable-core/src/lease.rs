use serde_json::Value;

use crate::infrastructure::LockSlot;
use crate::types::Resource;

pub const DEFAULT_METADATA_PREFIX: &str = "resource";

/// An exclusive hold on one resource.
///
/// The lock slot is released exactly once: by [`Lease::release`], or when the
/// lease is dropped (normal scope exit, `?` early return, panic unwind).
#[derive(Debug)]
pub struct Lease {
    resource: Resource,
    slot: LockSlot,
}

impl Lease {
    pub(crate) fn new(resource: Resource, slot: LockSlot) -> Self {
        Self { resource, slot }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn id(&self) -> &str {
        self.resource.id()
    }

    /// Owner token of the underlying lock slot.
    pub fn token(&self) -> &str {
        self.slot.token()
    }

    pub fn is_held(&self) -> bool {
        self.slot.is_held()
    }

    /// Free the resource now. Safe to call more than once.
    pub fn release(&mut self) {
        if self.slot.is_held() {
            tracing::info!(resource_id = %self.resource.id(), "Release resource");
            self.slot.release();
        }
    }

    /// One `<prefix>_<attribute>` entry per resource attribute, for recording
    /// as run metadata.
    pub fn metadata(&self, prefix: &str) -> Vec<(String, Value)> {
        self.resource
            .attributes()
            .iter()
            .map(|(key, value)| (format!("{}_{}", prefix, key), value.clone()))
            .collect()
    }

    /// Attributes as environment variables, e.g. `RESOURCE_HOSTNAME=h1`.
    /// Strings are exported without quotes; other values use their JSON text.
    pub fn env_vars(&self, prefix: &str) -> Vec<(String, String)> {
        self.metadata(prefix)
            .into_iter()
            .map(|(key, value)| {
                let key: String = key
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
                    .collect();
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.release();
    }
}
