//! Embedded in-memory document store.
//!
//! # Responsibility
//! - Hold schema-less documents per named collection, ordered by id.
//! - Push the full collection snapshot to every attached listener inside each
//!   committed write, before the write call resolves.
//!
//! # Invariants
//! - Snapshot order is ascending document id, the store's own write-ordering.
//! - A listener receives no further calls after its handle is cancelled.
//! - A subscription delivers `on_error` at most once and nothing afterwards.

use crate::error::{StoreError, StoreResult};
use crate::{Document, DocumentId, DocumentStore, Snapshot, SnapshotListener, WatchHandle};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// In-memory [`DocumentStore`] backend.
///
/// Cloning is cheap and clones share the same underlying data, so one store
/// can be handed to several components.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Collection>,
    next_watch_id: u64,
    fail_next_write: Option<StoreError>,
    fail_subscriptions: Option<StoreError>,
}

#[derive(Default)]
struct Collection {
    documents: BTreeMap<String, Document>,
    watchers: Vec<Watcher>,
}

struct Watcher {
    id: u64,
    listener: Box<dyn SnapshotListener>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next mutating call fail with the given error.
    ///
    /// Only the next `add`/`merge`/`remove` is affected; the one after it
    /// behaves normally again. Intended for exercising failure paths in
    /// tests and demos.
    pub fn fail_next_write(&self, error: StoreError) {
        self.lock().fail_next_write = Some(error);
    }

    /// Fails every current subscription with the given error and makes new
    /// `watch` calls fail immediately.
    ///
    /// Each affected listener receives `on_error` exactly once.
    pub fn fail_subscriptions(&self, error: StoreError) {
        let mut inner = self.lock();
        inner.fail_subscriptions = Some(error.clone());
        for collection in inner.collections.values_mut() {
            for watcher in collection.watchers.iter_mut() {
                watcher.listener.on_error(error.clone());
            }
            collection.watchers.clear();
        }
    }

    /// Returns the number of documents currently in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map_or(0, |c| c.documents.len())
    }

    /// Reports whether a collection holds no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Returns a document body by id, if present.
    pub fn get(&self, collection: &str, id: &DocumentId) -> Option<Document> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|c| c.documents.get(id.as_str()).cloned())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-write;
        // the data itself is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn take_write_failure(&mut self) -> StoreResult<()> {
        match self.fail_next_write.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn notify(&mut self, collection: &str) {
        let Some(col) = self.collections.get_mut(collection) else {
            return;
        };
        let snapshot = snapshot_of(&col.documents);
        for watcher in col.watchers.iter_mut() {
            watcher.listener.on_snapshot(snapshot.clone());
        }
    }
}

fn snapshot_of(documents: &BTreeMap<String, Document>) -> Snapshot {
    documents
        .iter()
        .map(|(id, doc)| (DocumentId::new(id.clone()), doc.clone()))
        .collect()
}

impl DocumentStore for MemoryStore {
    async fn add(&self, collection: &str, document: Document) -> StoreResult<DocumentId> {
        let mut inner = self.lock();
        inner.take_write_failure()?;

        let id = Uuid::new_v4().simple().to_string();
        inner
            .collections
            .entry(collection.to_owned())
            .or_default()
            .documents
            .insert(id.clone(), document);
        inner.notify(collection);

        Ok(DocumentId::new(id))
    }

    async fn merge(&self, collection: &str, id: &DocumentId, fields: Document) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.take_write_failure()?;

        let existing = inner
            .collections
            .get_mut(collection)
            .and_then(|c| c.documents.get_mut(id.as_str()))
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        for (key, value) in fields {
            existing.insert(key, value);
        }
        inner.notify(collection);

        Ok(())
    }

    async fn remove(&self, collection: &str, id: &DocumentId) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.take_write_failure()?;

        let removed = inner
            .collections
            .get_mut(collection)
            .map_or(false, |c| c.documents.remove(id.as_str()).is_some());
        if removed {
            inner.notify(collection);
        } else {
            // Removing an unknown id is a documented no-op success.
            tracing::debug!(collection, id = %id, "remove of unknown document id ignored");
        }

        Ok(())
    }

    fn watch(&self, collection: &str, mut listener: Box<dyn SnapshotListener>) -> WatchHandle {
        let mut inner = self.lock();

        if let Some(error) = inner.fail_subscriptions.clone() {
            listener.on_error(error);
            return WatchHandle::detached();
        }

        let watch_id = inner.next_watch_id;
        inner.next_watch_id += 1;

        let col = inner.collections.entry(collection.to_owned()).or_default();
        listener.on_snapshot(snapshot_of(&col.documents));
        col.watchers.push(Watcher {
            id: watch_id,
            listener,
        });
        drop(inner);

        let store = Arc::clone(&self.inner);
        let collection = collection.to_owned();
        WatchHandle::new(move || {
            let mut inner = store.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(col) = inner.collections.get_mut(&collection) {
                col.watchers.retain(|w| w.id != watch_id);
            }
        })
    }
}
