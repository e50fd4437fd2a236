use std::time::Duration;

use thiserror::Error;

/// Catalog integrity failures. Any of these rejects the whole catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed catalog: {0}")]
    Malformed(String),

    #[error("catalog entry #{index} has no `id`")]
    MissingId { index: usize },

    #[error("duplicate resource id '{0}' in catalog")]
    DuplicateId(String),

    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RequirementsError {
    #[error("invalid requirements: {0}")]
    Invalid(String),
}

/// Failure inside a lock storage backend (not contention).
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("no resource matches the requirements")]
    ResourceNotFound,

    #[error("allocation timeout ({}s)", .timeout.as_secs_f64())]
    AllocationTimeout { timeout: Duration },

    #[error("allocation cancelled")]
    Cancelled,

    #[error("lock storage failed for resource '{id}': {source}")]
    LockStorage {
        id: String,
        #[source]
        source: LockError,
    },
}
