//! # lockable-core
//!
//! Exclusive allocation of resources from a shared pool.
//! Filters a declarative catalog by requirements, then leases one matching
//! resource through a lock slot that every cooperating process can see.

pub mod allocator;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod infrastructure;
#[path = "infrastructure_fs.rs"]
pub mod infrastructure_fs;
#[path = "infrastructure_in_memory.rs"]
pub mod infrastructure_in_memory;
#[cfg(feature = "sqlite")]
#[path = "infrastructure_sqlite.rs"]
pub mod infrastructure_sqlite;
pub mod lease;
pub mod matcher;
pub mod types;

pub use client::Lockable;

#[cfg(test)]
#[path = "infrastructure_test.rs"]
mod infrastructure_test;
