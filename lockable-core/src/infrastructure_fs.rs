//! Lock files in a shared folder.
//!
//! The slot for resource `id` is the file `<dir>/<id>.lock`. It is created with
//! create-new semantics, so exactly one of any number of racing processes
//! succeeds. Removing the file frees the slot; a holder only removes a file
//! whose owner record still carries its own token.
//!
//! Known limitation: a holder that crashes leaves its lock file behind and the
//! resource stays excluded until someone deletes the file. The file body
//! names the owner to make that cleanup easy; nothing here expires it.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::local_hostname;
use crate::error::LockError;
use crate::infrastructure::{LockOwner, LockSlot, LockStore};

pub const LOCK_FILE_EXTENSION: &str = "lock";

#[derive(Debug, Clone)]
pub struct FileLockStore {
    dir: PathBuf,
    hostname: String,
}

impl FileLockStore {
    /// Use `dir` as the lock storage location, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LockError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            hostname: local_hostname(),
        })
    }

    /// Hostname recorded in the lock files this store creates.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn lock_path(&self, resource_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", resource_id, LOCK_FILE_EXTENSION))
    }

    /// Reads the owner record of a held slot. `Ok(None)` if the slot is free.
    pub fn owner(&self, resource_id: &str) -> Result<Option<LockOwner>, LockError> {
        read_owner(&self.lock_path(resource_id))
    }
}

fn read_owner(path: &Path) -> Result<Option<LockOwner>, LockError> {
    match fs::read_to_string(path) {
        Ok(body) => serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| LockError::Backend(format!("unreadable lock file {}: {}", path.display(), e))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Removes the lock file at `path` if it still carries `token`. A file that
/// was deleted and re-created by another holder is left alone.
fn remove_if_owned(resource_id: &str, path: &Path, token: &str) {
    match read_owner(path) {
        Ok(Some(owner)) if owner.token == token => match fs::remove_file(path) {
            Ok(()) => tracing::debug!(resource_id, "Lock file removed"),
            Err(e) => tracing::warn!(
                resource_id,
                path = %path.display(),
                error = %e,
                "Failed to remove lock file; resource stays excluded until it is deleted"
            ),
        },
        Ok(Some(owner)) => tracing::warn!(
            resource_id,
            path = %path.display(),
            holder_pid = owner.pid,
            holder_host = %owner.hostname,
            "Lock file now belongs to another holder; leaving it in place"
        ),
        Ok(None) => tracing::warn!(resource_id, path = %path.display(), "Lock file already gone"),
        Err(e) => tracing::warn!(
            resource_id,
            path = %path.display(),
            error = %e,
            "Cannot verify lock file owner; leaving it in place"
        ),
    }
}

impl LockStore for FileLockStore {
    fn try_acquire(&self, resource_id: &str) -> Result<Option<LockSlot>, LockError> {
        let path = self.lock_path(resource_id);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let owner = LockOwner::current(&self.hostname);
        // The file's existence is the lock; the body tells holders apart on release.
        let written = serde_json::to_writer(&mut file, &owner)
            .map_err(std::io::Error::from)
            .and_then(|()| file.flush());
        if let Err(e) = &written {
            tracing::warn!(resource_id, path = %path.display(), error = %e, "Failed to write lock owner record");
        }
        drop(file);

        let id = resource_id.to_string();
        let token = owner.token.clone();
        let verifiable = written.is_ok();
        let slot = LockSlot::new(resource_id, owner.token, move || {
            if verifiable {
                remove_if_owned(&id, &path, &token);
            } else if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(resource_id = %id, path = %path.display(), error = %e, "Failed to remove lock file");
            }
        });
        Ok(Some(slot))
    }

    fn describe(&self) -> String {
        format!("lock folder {}", self.dir.display())
    }
}
