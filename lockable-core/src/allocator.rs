//! Picks one free resource out of a candidate set.
//!
//! Candidates are shuffled once per call, then tried in that order with
//! non-blocking lock attempts. A pass that finds nothing free is followed by a
//! pause of `retry_interval` and another pass, until `timeout` has elapsed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;

use crate::config::AllocatorConfig;
use crate::error::AllocationError;
use crate::infrastructure::LockStore;
use crate::lease::Lease;
use crate::types::Resource;

pub struct Allocator {
    config: AllocatorConfig,
    store: Arc<dyn LockStore>,
}

impl Allocator {
    pub fn new(config: AllocatorConfig, store: Arc<dyn LockStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn LockStore> {
        &self.store
    }

    /// Lease one of `candidates`, waiting up to the configured timeout.
    ///
    /// Fails at once with `ResourceNotFound` when `candidates` is empty, and
    /// with `AllocationTimeout` when every candidate stayed busy.
    pub fn acquire_one(&self, candidates: Vec<Resource>) -> Result<Lease, AllocationError> {
        self.acquire_inner(candidates, None)
    }

    /// Like [`Allocator::acquire_one`], but gives up with `Cancelled` once
    /// `cancel` is set. The flag is checked between passes.
    pub fn acquire_one_cancellable(
        &self,
        candidates: Vec<Resource>,
        cancel: &AtomicBool,
    ) -> Result<Lease, AllocationError> {
        self.acquire_inner(candidates, Some(cancel))
    }

    /// Run `f` with a leased resource; the lease is released when `f`
    /// returns or unwinds.
    pub fn with_lease<T>(
        &self,
        candidates: Vec<Resource>,
        f: impl FnOnce(&Resource) -> T,
    ) -> Result<T, AllocationError> {
        let lease = self.acquire_one(candidates)?;
        Ok(f(lease.resource()))
    }

    fn acquire_inner(
        &self,
        mut candidates: Vec<Resource>,
        cancel: Option<&AtomicBool>,
    ) -> Result<Lease, AllocationError> {
        let timeout = self.config.timeout;
        tracing::info!(
            candidates = candidates.len(),
            timeout_s = timeout.as_secs_f64(),
            store = %self.store.describe(),
            "Total matching resources"
        );

        if candidates.is_empty() {
            return Err(AllocationError::ResourceNotFound);
        }

        candidates.shuffle(&mut rand::thread_rng());

        let started = Instant::now();
        // A timeout too large to add to `now` means no deadline at all
        let deadline = started.checked_add(timeout);
        let mut pass: u32 = 0;

        loop {
            pass += 1;
            for index in 0..candidates.len() {
                let id = candidates[index].id();
                match self.store.try_acquire(id) {
                    Ok(Some(slot)) => {
                        let resource = candidates.swap_remove(index);
                        tracing::info!(
                            resource_id = %resource.id(),
                            pass,
                            waited = ?started.elapsed(),
                            "Allocated resource"
                        );
                        return Ok(Lease::new(resource, slot));
                    }
                    Ok(None) => tracing::debug!(resource_id = %id, pass, "Resource busy"),
                    Err(source) => {
                        return Err(AllocationError::LockStorage {
                            id: id.to_string(),
                            source,
                        });
                    }
                }
            }

            let now = Instant::now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                tracing::warn!(timeout_s = timeout.as_secs_f64(), passes = pass, "Allocation timeout");
                return Err(AllocationError::AllocationTimeout { timeout });
            }
            if is_cancelled(cancel) {
                tracing::info!(passes = pass, "Allocation cancelled");
                return Err(AllocationError::Cancelled);
            }

            let pause = match deadline {
                Some(deadline) => self.config.retry_interval.min(deadline - now),
                None => self.config.retry_interval,
            };
            tracing::debug!(?pause, "No free resource, retrying after pause");
            sleep_unless_cancelled(pause, cancel);

            if is_cancelled(cancel) {
                tracing::info!(passes = pass, "Allocation cancelled");
                return Err(AllocationError::Cancelled);
            }
        }
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::SeqCst))
}

const CANCEL_POLL: Duration = Duration::from_millis(50);

fn sleep_unless_cancelled(pause: Duration, cancel: Option<&AtomicBool>) {
    let Some(flag) = cancel else {
        std::thread::sleep(pause);
        return;
    };
    let Some(until) = Instant::now().checked_add(pause) else {
        while !flag.load(Ordering::SeqCst) {
            std::thread::sleep(CANCEL_POLL);
        }
        return;
    };
    while !flag.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= until {
            break;
        }
        std::thread::sleep(CANCEL_POLL.min(until - now));
    }
}
