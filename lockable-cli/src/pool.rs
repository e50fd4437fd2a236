use std::path::Path;
use std::sync::Arc;

use lockable_core::catalog::Catalog;
use lockable_core::config::{local_hostname, AllocatorConfig};
use lockable_core::infrastructure::{LockOwner, LockStore};
use lockable_core::infrastructure_fs::FileLockStore;
use lockable_core::types::Requirements;
use lockable_core::Lockable;

use crate::PoolArgs;

/// Lock backend selected on the command line.
pub enum Storage {
    Folder(Arc<FileLockStore>),
    #[cfg(feature = "sqlite")]
    Sqlite(Arc<lockable_core::infrastructure_sqlite::SqliteLockStore>),
}

impl Storage {
    pub fn open(storage: &str, lock_dir: &Path, hostname: &str) -> Result<Self, String> {
        if storage == "folder" {
            tracing::info!("Use lock folder: {}", lock_dir.display());
            let store = FileLockStore::open(lock_dir)
                .map_err(|e| format!("Failed to open lock folder '{}': {}", lock_dir.display(), e))?
                .with_hostname(hostname);
            Ok(Storage::Folder(Arc::new(store)))
        } else if let Some(path) = storage.strip_prefix("sqlite:") {
            #[cfg(feature = "sqlite")]
            {
                tracing::info!("Use lock database: {}", path);
                let store = lockable_core::infrastructure_sqlite::SqliteLockStore::open(path)
                    .map_err(|e| format!("Failed to open SQLite database at '{}': {}", path, e))?
                    .with_hostname(hostname);
                Ok(Storage::Sqlite(Arc::new(store)))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err(format!(
                    "SQLite storage '{}' requested but the `sqlite` feature is not enabled. \
                     Rebuild with: cargo build --features sqlite",
                    path
                ))
            }
        } else {
            Err(format!(
                "Unknown storage backend: '{}'. Use 'folder' or 'sqlite:<path>'",
                storage
            ))
        }
    }

    pub fn lock_store(&self) -> Arc<dyn LockStore> {
        match self {
            Storage::Folder(store) => store.clone() as Arc<dyn LockStore>,
            #[cfg(feature = "sqlite")]
            Storage::Sqlite(store) => store.clone() as Arc<dyn LockStore>,
        }
    }

    pub fn holder(&self, resource_id: &str) -> Result<Option<LockOwner>, String> {
        match self {
            Storage::Folder(store) => store.owner(resource_id).map_err(|e| e.to_string()),
            #[cfg(feature = "sqlite")]
            Storage::Sqlite(store) => Ok(store
                .holders()
                .map_err(|e| e.to_string())?
                .into_iter()
                .find(|(id, _)| id == resource_id)
                .map(|(_, owner)| owner)),
        }
    }
}

/// Everything a subcommand needs, built from the pool arguments.
pub struct Pool {
    pub client: Lockable,
    pub storage: Storage,
    pub requirements: Requirements,
}

impl Pool {
    pub fn open(args: &PoolArgs) -> Result<Self, String> {
        let config = config(args);
        let catalog = Catalog::load(&args.resource_list_file).map_err(|e| {
            format!("{} ({})", e, args.resource_list_file.display())
        })?;
        let requirements = Requirements::parse(&args.requirements).map_err(|e| e.to_string())?;
        let storage = Storage::open(&args.storage, &config.lock_dir, &config.hostname)?;

        tracing::info!(
            hostname = %config.hostname,
            resources = catalog.len(),
            timeout_s = config.timeout.as_secs_f64(),
            "Resource pool loaded"
        );

        Ok(Self {
            client: Lockable::with_store(catalog, config, storage.lock_store()),
            storage,
            requirements,
        })
    }
}

pub fn config(args: &PoolArgs) -> AllocatorConfig {
    let mut config = AllocatorConfig::default()
        .with_timeout(args.timeout)
        .with_hostname(args.hostname.clone().unwrap_or_else(local_hostname));
    if let Some(dir) = &args.lock_folder {
        config = config.with_lock_dir(dir);
    }
    config
}

pub fn candidates(args: &PoolArgs) -> Result<(), String> {
    let pool = Pool::open(args)?;
    tracing::info!(predicate = %pool.client.predicate(&pool.requirements), "Requirements");
    let candidates = pool.client.candidates(&pool.requirements);
    let json = serde_json::to_string_pretty(&candidates).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

pub fn status(args: &PoolArgs) -> Result<(), String> {
    let pool = Pool::open(args)?;
    for line in status_lines(&pool)? {
        println!("{}", line);
    }
    Ok(())
}

/// One `<id>\t<state>` line per catalog resource.
pub fn status_lines(pool: &Pool) -> Result<Vec<String>, String> {
    pool.client
        .catalog()
        .resources()
        .iter()
        .map(|resource| {
            Ok(match pool.storage.holder(resource.id())? {
                Some(owner) => format!(
                    "{}\theld by pid {} on {} since {} (token {})",
                    resource.id(),
                    owner.pid,
                    owner.hostname,
                    owner.acquired_at,
                    owner.token
                ),
                None => format!("{}\tfree", resource.id()),
            })
        })
        .collect()
}
