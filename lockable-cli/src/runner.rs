use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lockable_core::error::AllocationError;
use lockable_core::lease::Lease;
use tokio::process::Command;

use crate::pool::Pool;
use crate::PoolArgs;

/// Exit code used when the run is interrupted with Ctrl-C.
const INTERRUPTED: i32 = 130;

/// Lease a resource, run `command` with the resource exported into its
/// environment, and release the resource when the command ends.
pub async fn run(args: PoolArgs, prefix: String, command: Vec<String>) -> Result<i32, String> {
    let Some((program, program_args)) = command.split_first() else {
        return Err("no command given".to_string());
    };

    let pool = Arc::new(Pool::open(&args)?);
    let lease = match acquire(pool).await? {
        Some(lease) => lease,
        None => return Ok(INTERRUPTED),
    };

    for (key, value) in lease.metadata(&prefix) {
        tracing::info!(%key, %value, "Resource property");
    }

    let mut child = Command::new(program)
        .args(program_args)
        .envs(lease.env_vars(&prefix))
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("Failed to start '{}': {}", program, e))?;

    let code = tokio::select! {
        status = child.wait() => {
            let status = status.map_err(|e| format!("Failed to wait for '{}': {}", program, e))?;
            tracing::info!(resource_id = %lease.id(), %status, "Command finished");
            status.code().unwrap_or(1)
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(resource_id = %lease.id(), "Interrupted, stopping command");
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "Failed to stop command");
            }
            INTERRUPTED
        }
    };

    drop(lease);
    Ok(code)
}

/// Runs the polling allocator off the async runtime. Returns `None` when
/// interrupted before a resource was leased.
async fn acquire(pool: Arc<Pool>) -> Result<Option<Lease>, String> {
    let cancel = Arc::new(AtomicBool::new(false));
    let mut task = tokio::task::spawn_blocking({
        let cancel = Arc::clone(&cancel);
        move || pool.client.lock_cancellable(&pool.requirements, &cancel)
    });

    let result = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted while waiting for a resource");
            cancel.store(true, Ordering::SeqCst);
            // A lease won in the meantime is dropped, and so released, here
            let _ = task.await;
            return Ok(None);
        }
    };

    match result.map_err(|e| format!("Allocation task failed: {}", e))? {
        Ok(lease) => Ok(Some(lease)),
        Err(AllocationError::Cancelled) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}
