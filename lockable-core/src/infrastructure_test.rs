#[cfg(test)]
mod tests {
    use crate::infrastructure::LockStore;
    use crate::infrastructure_fs::FileLockStore;
    use crate::infrastructure_in_memory::InMemoryLockStore;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn race(store: Arc<dyn LockStore>, contenders: usize) -> usize {
        let barrier = Arc::new(Barrier::new(contenders));
        let handles: Vec<_> = (0..contenders)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    // Keep the winner's slot alive until every thread has tried
                    let slot = store.try_acquire("shared").unwrap();
                    let won = slot.is_some();
                    barrier.wait();
                    drop(slot);
                    won
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count()
    }

    #[test]
    fn test_file_store_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLockStore::open(dir.path()).unwrap().with_hostname("ci-01");

        let mut slot = store.try_acquire("r1").unwrap().expect("slot should be free");
        assert!(store.lock_path("r1").exists());
        assert!(store.try_acquire("r1").unwrap().is_none());

        let owner = store.owner("r1").unwrap().unwrap();
        assert_eq!(owner.token, slot.token());
        assert_eq!(owner.hostname, "ci-01");
        assert_eq!(owner.pid, std::process::id());

        slot.release();
        assert!(!slot.is_held());
        assert!(!store.lock_path("r1").exists());
        assert!(store.owner("r1").unwrap().is_none());

        // Second release is a no-op
        slot.release();
        assert!(store.try_acquire("r1").unwrap().is_some());
    }

    #[test]
    fn test_file_store_drop_releases() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLockStore::open(dir.path()).unwrap();
        {
            let _slot = store.try_acquire("r1").unwrap().unwrap();
            assert!(store.lock_path("r1").exists());
        }
        assert!(!store.lock_path("r1").exists());
    }

    #[test]
    fn test_file_store_release_survives_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLockStore::open(dir.path()).unwrap();
        let mut slot = store.try_acquire("r1").unwrap().unwrap();

        std::fs::remove_file(store.lock_path("r1")).unwrap();
        slot.release();
        assert!(!slot.is_held());
    }

    #[test]
    fn test_file_store_release_leaves_newer_holder_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLockStore::open(dir.path()).unwrap();

        let mut first = store.try_acquire("r1").unwrap().unwrap();
        std::fs::remove_file(store.lock_path("r1")).unwrap();
        let second = store.try_acquire("r1").unwrap().expect("slot was freed by hand");

        first.release();
        assert!(!first.is_held());
        assert!(store.lock_path("r1").exists());
        assert_eq!(store.owner("r1").unwrap().unwrap().token, second.token());
        assert!(store.try_acquire("r1").unwrap().is_none());

        drop(second);
        assert!(!store.lock_path("r1").exists());
        assert!(store.try_acquire("r1").unwrap().is_some());
    }

    #[test]
    fn test_file_store_release_leaves_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLockStore::open(dir.path()).unwrap();

        let mut slot = store.try_acquire("r1").unwrap().unwrap();
        std::fs::write(store.lock_path("r1"), b"written by hand").unwrap();
        slot.release();
        assert!(store.lock_path("r1").exists());
    }

    #[test]
    fn test_file_store_stale_artifact_keeps_excluding() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLockStore::open(dir.path()).unwrap();
        std::fs::write(store.lock_path("r1"), b"").unwrap();

        assert!(store.try_acquire("r1").unwrap().is_none());
        assert!(store.try_acquire("r2").unwrap().is_some());
    }

    #[test]
    fn test_file_store_creates_lock_folder() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("locks").join("pool");
        let store = FileLockStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(store.try_acquire("r1").unwrap().is_some());
    }

    #[test]
    fn test_file_store_one_winner_under_contention() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn LockStore> = Arc::new(FileLockStore::open(dir.path()).unwrap());
        assert_eq!(race(store, 16), 1);
    }

    #[test]
    fn test_file_store_separate_instances_share_slots() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileLockStore::open(dir.path()).unwrap();
        let b = FileLockStore::open(dir.path()).unwrap();

        let slot = a.try_acquire("r1").unwrap();
        assert!(slot.is_some());
        assert!(b.try_acquire("r1").unwrap().is_none());
        drop(slot);
        assert!(b.try_acquire("r1").unwrap().is_some());
    }

    #[test]
    fn test_in_memory_store_acquire_and_release() {
        let store = InMemoryLockStore::new();
        let shared = store.clone();

        let mut slot = store.try_acquire("r1").unwrap().unwrap();
        assert!(shared.is_held("r1"));
        assert!(shared.try_acquire("r1").unwrap().is_none());
        assert_eq!(shared.held_ids(), vec!["r1".to_string()]);

        slot.release();
        slot.release();
        assert!(!shared.is_held("r1"));
        assert!(shared.held_ids().is_empty());
    }

    #[test]
    fn test_in_memory_store_one_winner_under_contention() {
        let store: Arc<dyn LockStore> = Arc::new(InMemoryLockStore::new());
        assert_eq!(race(store, 16), 1);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_store_acquire_and_release() {
        use crate::infrastructure_sqlite::SqliteLockStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locks.db");
        let a = SqliteLockStore::open(path.to_str().unwrap()).unwrap().with_hostname("ci-01");
        let b = SqliteLockStore::open(path.to_str().unwrap()).unwrap();

        let mut slot = a.try_acquire("r1").unwrap().unwrap();
        assert!(b.try_acquire("r1").unwrap().is_none());

        let holders = b.holders().unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].0, "r1");
        assert_eq!(holders[0].1.token, slot.token());
        assert_eq!(holders[0].1.hostname, "ci-01");

        slot.release();
        slot.release();
        assert!(b.holders().unwrap().is_empty());
        assert!(b.try_acquire("r1").unwrap().is_some());
    }
}
