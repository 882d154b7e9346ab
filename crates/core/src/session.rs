//! Per-container session: cached tree and auth token
//!
//! A [`Session`] owns the current tree snapshot and the auth token for one
//! mounted container. Both live behind `RwLock<Option<Arc<_>>>` slots and are
//! replaced whole, so a reader always sees a complete tree and a consistent
//! token pair. The slot locks are never held across an `.await`.
//!
//! Rebuilds run one at a time behind an async mutex. A refresh therefore
//! always installs a listing fetched after every earlier refresh finished,
//! and concurrent callers hitting an empty cache share a single listing.
//!
//! The token is acquired lazily and reused until [`Session::reauthenticate`]
//! is called. A failing data call does not trigger re-authentication.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::config::Credentials;
use crate::error::Result;
use crate::path::{normalize, resolve};
use crate::traits::{AuthToken, BackingStore, ByteRange, ObjectData};
use crate::tree::{Node, Owner, Tree};

/// A tree snapshot paired with the path that was requested
#[derive(Debug, Clone)]
pub struct Snapshot {
    tree: Arc<Tree>,
    path: String,
}

impl Snapshot {
    /// The node at the requested path in this snapshot
    pub fn node(&self) -> Option<&Node> {
        resolve(&self.path, &self.tree)
    }

    pub fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Session state for one mounted container
pub struct Session<S> {
    store: S,
    credentials: Credentials,
    container: String,
    owner: Owner,
    tree: RwLock<Option<Arc<Tree>>>,
    auth: RwLock<Option<Arc<AuthToken>>>,
    rebuild_lock: Mutex<()>,
}

impl<S: BackingStore> Session<S> {
    pub fn new(
        store: S,
        credentials: Credentials,
        container: impl Into<String>,
        owner: Owner,
    ) -> Self {
        Self {
            store,
            credentials,
            container: container.into(),
            owner,
            tree: RwLock::new(None),
            auth: RwLock::new(None),
            rebuild_lock: Mutex::new(()),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Get the tree, rebuilding it when absent or when `force_refresh` is set
    ///
    /// A failed rebuild leaves the previous tree in place.
    pub async fn get_tree(&self, path: &str, force_refresh: bool) -> Result<Snapshot> {
        let cached = if force_refresh {
            None
        } else {
            self.tree.read().clone()
        };

        let tree = match cached {
            Some(tree) => {
                tracing::debug!(container = %self.container, "reusing cached tree");
                tree
            }
            None if force_refresh => self.rebuild().await?,
            None => self.cached_or_rebuild().await?,
        };

        Ok(Snapshot {
            tree,
            path: normalize(path),
        })
    }

    /// Force a rebuild of the tree from the backing store
    pub async fn refresh(&self) -> Result<Arc<Tree>> {
        self.rebuild().await
    }

    /// Drop the cached tree; the next access rebuilds it
    pub fn invalidate(&self) {
        *self.tree.write() = None;
    }

    /// Whether a tree is currently cached
    pub fn has_tree(&self) -> bool {
        self.tree.read().is_some()
    }

    /// Current auth token, authenticating on first use
    pub async fn auth(&self) -> Result<Arc<AuthToken>> {
        if let Some(token) = self.auth.read().clone() {
            return Ok(token);
        }
        self.reauthenticate().await
    }

    /// Acquire a fresh token and replace the cached one
    pub async fn reauthenticate(&self) -> Result<Arc<AuthToken>> {
        let token = Arc::new(self.store.authenticate(&self.credentials).await?);
        tracing::debug!(storage_url = %token.storage_url, "authenticated");
        *self.auth.write() = Some(Arc::clone(&token));
        Ok(token)
    }

    /// Read a byte range of `object`, bypassing the tree
    pub async fn read_range(&self, object: &str, range: ByteRange) -> Result<ObjectData> {
        let auth = self.auth().await?;
        self.store
            .get_object_range(&auth, &self.container, object, range)
            .await
    }

    /// Rebuild unless another caller installed a tree while we waited
    async fn cached_or_rebuild(&self) -> Result<Arc<Tree>> {
        let _guard = self.rebuild_lock.lock().await;
        let cached = self.tree.read().clone();
        if let Some(tree) = cached {
            tracing::debug!(container = %self.container, "tree built by concurrent caller");
            return Ok(tree);
        }
        self.build_and_swap().await
    }

    async fn rebuild(&self) -> Result<Arc<Tree>> {
        let _guard = self.rebuild_lock.lock().await;
        self.build_and_swap().await
    }

    /// Fetch the listing and install the new tree; caller holds `rebuild_lock`
    async fn build_and_swap(&self) -> Result<Arc<Tree>> {
        let started = Instant::now();
        let auth = self.auth().await?;
        let listing = self.store.list_container(&auth, &self.container).await?;
        let tree = Arc::new(Tree::build(
            &listing.metadata,
            &listing.objects,
            self.owner,
        )?);

        *self.tree.write() = Some(Arc::clone(&tree));
        tracing::info!(
            container = %self.container,
            objects = tree.object_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rebuilt tree"
        );
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::Error;
    use crate::traits::{ContainerListing, MockBackingStore, ObjectRecord};

    fn listing(names: &[&str]) -> ContainerListing {
        ContainerListing {
            metadata: HashMap::from([("x-container-bytes-used".to_string(), "3".to_string())]),
            objects: names
                .iter()
                .map(|n| ObjectRecord::new(*n, 1, "2023-01-01T00:00:00"))
                .collect(),
        }
    }

    fn token() -> AuthToken {
        AuthToken::new("https://swift.example/v1/AUTH_test", "tk")
    }

    fn session(store: MockBackingStore) -> Session<MockBackingStore> {
        Session::new(store, Credentials::default(), "photos", Owner::new(1, 2))
    }

    #[tokio::test]
    async fn test_tree_reused_without_refresh() {
        let mut store = MockBackingStore::new();
        store.expect_authenticate().times(1).returning(|_| Ok(token()));
        let mut calls = 0;
        store
            .expect_list_container()
            .times(1)
            .returning(move |_, _| {
                calls += 1;
                Ok(listing(if calls == 1 { &["a"][..] } else { &["a", "b"][..] }))
            });
        let session = session(store);

        let first = session.get_tree("/", false).await.unwrap();
        let second = session.get_tree("/", false).await.unwrap();

        assert!(Arc::ptr_eq(first.tree(), second.tree()));
        assert_eq!(first.tree().object_count(), 1);
    }

    #[tokio::test]
    async fn test_forced_refresh_rebuilds_and_reuses_token() {
        let mut store = MockBackingStore::new();
        store.expect_authenticate().times(1).returning(|_| Ok(token()));
        let mut calls = 0;
        store
            .expect_list_container()
            .times(2)
            .returning(move |_, _| {
                calls += 1;
                Ok(listing(if calls == 1 { &["a"][..] } else { &["a", "b"][..] }))
            });
        let session = session(store);

        let before = session.get_tree("/b", false).await.unwrap();
        assert!(before.node().is_none());

        let after = session.get_tree("/b", true).await.unwrap();
        assert!(after.node().is_some());
        assert_eq!(after.tree().object_count(), 2);

        // The old snapshot still answers from the old tree
        assert!(before.node().is_none());
    }

    #[tokio::test]
    async fn test_failed_listing_keeps_previous_tree() {
        let mut store = MockBackingStore::new();
        store.expect_authenticate().returning(|_| Ok(token()));
        let mut calls = 0;
        store.expect_list_container().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(listing(&["a"]))
            } else {
                Err(Error::Remote("connection reset".into()))
            }
        });
        let session = session(store);

        let original = session.get_tree("/", false).await.unwrap();
        let err = session.get_tree("/", true).await.unwrap_err();
        assert!(err.is_remote());

        let current = session.get_tree("/", false).await.unwrap();
        assert!(Arc::ptr_eq(original.tree(), current.tree()));
    }

    #[tokio::test]
    async fn test_failed_first_listing_caches_nothing() {
        let mut store = MockBackingStore::new();
        store.expect_authenticate().returning(|_| Ok(token()));
        store
            .expect_list_container()
            .returning(|_, _| Err(Error::Remote("503".into())));
        let session = session(store);

        assert!(session.get_tree("/", false).await.is_err());
        assert!(!session.has_tree());
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let mut store = MockBackingStore::new();
        store
            .expect_authenticate()
            .times(1)
            .returning(|_| Err(Error::Auth("401 Unauthorized".into())));
        store.expect_list_container().never();
        let session = session(store);

        let err = session.get_tree("/", false).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_reauthenticate_replaces_token() {
        let mut store = MockBackingStore::new();
        let mut n = 0;
        store.expect_authenticate().times(2).returning(move |_| {
            n += 1;
            Ok(AuthToken::new("https://swift.example/v1/AUTH_test", format!("tk{n}")))
        });
        let session = session(store);

        assert_eq!(session.auth().await.unwrap().token, "tk1");
        assert_eq!(session.auth().await.unwrap().token, "tk1");
        assert_eq!(session.reauthenticate().await.unwrap().token, "tk2");
        assert_eq!(session.auth().await.unwrap().token, "tk2");
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let mut store = MockBackingStore::new();
        store.expect_authenticate().returning(|_| Ok(token()));
        store
            .expect_list_container()
            .times(2)
            .returning(|_, _| Ok(listing(&["a"])));
        let session = session(store);

        session.get_tree("/", false).await.unwrap();
        session.invalidate();
        assert!(!session.has_tree());
        session.get_tree("/", false).await.unwrap();
        assert!(session.has_tree());
    }
}
