//! Adapter tests against an in-memory backing store
//!
//! The store below serves a mutable object list so tests can change the
//! container between calls and observe when the tree is (not) rebuilt.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use swiftfs_core::{
    AuthToken, BackingStore, ByteRange, ContainerListing, Credentials, Error, FsAdapter,
    ObjectData, ObjectRecord, Owner, Result, Session,
};

#[derive(Default)]
struct Objects {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    listings: AtomicUsize,
    fail_listing: Mutex<bool>,
    listing_delay: Mutex<Option<Duration>>,
}

#[derive(Clone, Default)]
struct MemoryStore(Arc<Objects>);

impl MemoryStore {
    fn put(&self, name: &str, data: &[u8], modified: &str) {
        self.0
            .objects
            .lock()
            .insert(name.to_string(), (data.to_vec(), modified.to_string()));
    }

    fn listings(&self) -> usize {
        self.0.listings.load(Ordering::SeqCst)
    }

    fn fail_listing(&self, fail: bool) {
        *self.0.fail_listing.lock() = fail;
    }

    /// Hold the next listing back for `delay` after taking its snapshot
    fn delay_next_listing(&self, delay: Duration) {
        *self.0.listing_delay.lock() = Some(delay);
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<AuthToken> {
        Ok(AuthToken::new("memory://", "token"))
    }

    async fn list_container(
        &self,
        _auth: &AuthToken,
        _container: &str,
    ) -> Result<ContainerListing> {
        self.0.listings.fetch_add(1, Ordering::SeqCst);
        if *self.0.fail_listing.lock() {
            return Err(Error::Remote("listing unavailable".into()));
        }

        let listing = {
            let objects = self.0.objects.lock();
            let used: usize = objects.values().map(|(d, _)| d.len()).sum();
            ContainerListing {
                metadata: HashMap::from([
                    ("x-timestamp".to_string(), "1700000000.00000".to_string()),
                    ("x-container-bytes-used".to_string(), used.to_string()),
                ]),
                objects: objects
                    .iter()
                    .map(|(name, (data, modified))| {
                        ObjectRecord::new(name.clone(), data.len() as u64, modified.clone())
                    })
                    .collect(),
            }
        };

        let delay = self.0.listing_delay.lock().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(listing)
    }

    async fn get_object_range(
        &self,
        _auth: &AuthToken,
        _container: &str,
        object: &str,
        range: ByteRange,
    ) -> Result<ObjectData> {
        let objects = self.0.objects.lock();
        let (data, _) = objects
            .get(object)
            .ok_or_else(|| Error::RemoteNotFound(object.to_string()))?;
        let start = (range.offset as usize).min(data.len());
        let end = (range.offset.saturating_add(range.length) as usize).min(data.len());
        Ok(ObjectData {
            metadata: HashMap::new(),
            data: data[start..end].to_vec(),
        })
    }
}

fn mount(store: MemoryStore) -> FsAdapter<MemoryStore> {
    let session = Session::new(store, Credentials::default(), "docs", Owner::new(1000, 1000));
    FsAdapter::new(Arc::new(session))
}

#[tokio::test]
async fn test_listing_is_not_refetched_implicitly() {
    let store = MemoryStore::default();
    store.put("reports/q1.csv", b"a,b\n1,2\n", "2023-04-01T09:30:00.000000");
    let fs = mount(store.clone());

    let before = fs.readdir("/reports").await.unwrap();
    store.put("reports/q2.csv", b"c,d\n", "2023-07-01T09:30:00.000000");
    let after = fs.readdir("/reports").await.unwrap();

    assert_eq!(before, after);
    assert_eq!(store.listings(), 1);

    fs.refresh().await.unwrap();
    let refreshed = fs.readdir("/reports").await.unwrap();
    let names: Vec<_> = refreshed.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, [".", "..", "q1.csv", "q2.csv"]);
    assert_eq!(store.listings(), 2);
}

#[tokio::test]
async fn test_read_passes_through_backend_bytes() {
    let store = MemoryStore::default();
    store.put("notes/todo.txt", b"hello", "2023-01-01T00:00:00");
    let fs = mount(store.clone());

    assert_eq!(fs.read("/notes/todo.txt", 3, 1).await.unwrap(), b"ell");
    // Past the end: the backend decides, the adapter does not bounds-check
    assert!(fs.read("/notes/todo.txt", 3, 10).await.unwrap().is_empty());
    // Reads never consult the tree
    assert_eq!(store.listings(), 0);
}

#[tokio::test]
async fn test_failed_refresh_keeps_serving_old_tree() {
    let store = MemoryStore::default();
    store.put("a.txt", b"1", "2023-01-01T00:00:00");
    let fs = mount(store.clone());
    assert_eq!(fs.getattr("/a.txt").await.unwrap().size, 1);

    store.fail_listing(true);
    let err = fs.refresh().await.unwrap_err();
    assert!(err.is_remote());

    assert_eq!(fs.getattr("/a.txt").await.unwrap().size, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_see_complete_trees() {
    let store = MemoryStore::default();
    for i in 0..200 {
        store.put(&format!("batch/{i:03}.bin"), &[0u8; 4], "2023-01-01T00:00:00");
    }
    let fs = mount(store.clone());
    fs.refresh().await.unwrap();

    let mut readers = Vec::new();
    for _ in 0..8 {
        let fs = fs.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..50 {
                let entries = fs.readdir("/batch").await.unwrap();
                let count = entries.len() - 2;
                // Either the 200-object tree or the 400-object tree, nothing in between
                assert!(count == 200 || count == 400, "saw {count} entries");
            }
        }));
    }

    let writer = {
        let fs = fs.clone();
        let store = store.clone();
        tokio::spawn(async move {
            for i in 200..400 {
                store.put(&format!("batch/{i:03}.bin"), &[0u8; 4], "2023-01-01T00:00:00");
            }
            fs.refresh().await.unwrap();
        })
    };

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_later_refresh_is_not_overwritten_by_slower_earlier_one() {
    let store = MemoryStore::default();
    store.put("old.txt", b"1", "2023-01-01T00:00:00");
    let fs = mount(store.clone());

    store.delay_next_listing(Duration::from_millis(300));
    let first = {
        let fs = fs.clone();
        tokio::spawn(async move { fs.refresh().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    store.put("new.txt", b"2", "2023-01-02T00:00:00");
    fs.refresh().await.unwrap();
    assert!(fs.getattr("/new.txt").await.is_ok());

    first.await.unwrap().unwrap();
    let names: Vec<_> = fs
        .readdir("/")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, [".", "..", "new.txt", "old.txt"]);
    assert_eq!(store.listings(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cold_start_lists_container_once() {
    let store = MemoryStore::default();
    store.put("a/b.txt", b"hello", "2023-01-01T00:00:00");
    store.delay_next_listing(Duration::from_millis(100));
    let fs = mount(store.clone());

    let mut callers = Vec::new();
    for _ in 0..8 {
        let fs = fs.clone();
        callers.push(tokio::spawn(async move { fs.getattr("/a/b.txt").await }));
    }
    for caller in callers {
        assert_eq!(caller.await.unwrap().unwrap().size, 5);
    }

    assert_eq!(store.listings(), 1);
}
