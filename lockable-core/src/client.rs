//! High-level entry point that wires catalog, matcher and allocator together.
//! The CLI delegates to this.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::allocator::Allocator;
use crate::catalog::Catalog;
use crate::config::AllocatorConfig;
use crate::error::{AllocationError, LockError};
use crate::infrastructure::LockStore;
use crate::infrastructure_fs::FileLockStore;
use crate::lease::Lease;
use crate::matcher::RequirementMatcher;
use crate::types::{Requirements, Resource};

/// Allocates resources from one catalog for one host.
pub struct Lockable {
    catalog: Catalog,
    allocator: Allocator,
}

impl Lockable {
    /// Create a client that keeps its lock files in `config.lock_dir`.
    pub fn new(catalog: Catalog, config: AllocatorConfig) -> Result<Self, LockError> {
        let store = FileLockStore::open(&config.lock_dir)?.with_hostname(config.hostname.clone());
        Ok(Self::with_store(catalog, config, Arc::new(store)))
    }

    /// Create a client over any lock backend.
    pub fn with_store(catalog: Catalog, config: AllocatorConfig, store: Arc<dyn LockStore>) -> Self {
        Self {
            catalog,
            allocator: Allocator::new(config, store),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &AllocatorConfig {
        self.allocator.config()
    }

    /// Requirements merged with this host's `hostname`/`online` defaults.
    pub fn predicate(&self, requirements: &Requirements) -> Requirements {
        requirements.with_host_defaults(&self.config().hostname)
    }

    /// Resources that satisfy `requirements` on this host, in catalog order.
    pub fn candidates(&self, requirements: &Requirements) -> Vec<Resource> {
        let predicate = self.predicate(requirements);
        tracing::debug!(%predicate, "Requirements");
        RequirementMatcher::filter(self.catalog.resources(), &predicate)
    }

    /// Lease one resource that satisfies `requirements`.
    pub fn lock(&self, requirements: &Requirements) -> Result<Lease, AllocationError> {
        self.allocator.acquire_one(self.candidates(requirements))
    }

    /// Like [`Lockable::lock`], stopping early once `cancel` is set.
    pub fn lock_cancellable(
        &self,
        requirements: &Requirements,
        cancel: &AtomicBool,
    ) -> Result<Lease, AllocationError> {
        self.allocator
            .acquire_one_cancellable(self.candidates(requirements), cancel)
    }

    /// Run `f` while holding a resource that satisfies `requirements`.
    pub fn lock_with<T>(
        &self,
        requirements: &Requirements,
        f: impl FnOnce(&Resource) -> T,
    ) -> Result<T, AllocationError> {
        self.allocator.with_lease(self.candidates(requirements), f)
    }
}
