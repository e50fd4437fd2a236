use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Settings for one allocator. Built by the caller and passed in explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Give up when no candidate frees up within this time
    pub timeout: Duration,
    /// Pause between full passes over the candidates
    pub retry_interval: Duration,
    /// Shared folder holding the lock files
    pub lock_dir: PathBuf,
    /// Injected into every predicate as the `hostname` default
    pub hostname: String,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            lock_dir: std::env::temp_dir(),
            hostname: local_hostname(),
        }
    }
}

impl AllocatorConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_lock_dir(mut self, lock_dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = lock_dir.into();
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }
}

/// Name of this machine: `HOSTNAME`/`HOST`, then the `hostname` command,
/// then `localhost`.
pub fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("HOST"))
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(hostname_command)
        .unwrap_or_else(|| "localhost".to_string())
}

fn hostname_command() -> Option<String> {
    let output = Command::new("hostname")
        .output()
        .ok()
        .filter(|output| output.status.success())?;

    let hostname = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if hostname.is_empty() {
        None
    } else {
        Some(hostname)
    }
}
