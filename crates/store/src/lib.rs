//! # Padrón Store
//!
//! A collection-oriented, schema-less document store with live query
//! subscriptions.
//!
//! The store is addressed by collection name and document id. Every committed
//! write pushes the full current snapshot of the affected collection to all
//! attached listeners, so callers never need to re-request state. The crate
//! ships one embedded backend, [`MemoryStore`], behind the [`DocumentStore`]
//! trait.
//!
//! **No domain concerns**: what the documents mean belongs to `padron-core`.

pub mod error;
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

use serde_json::Value;

/// A single schema-less document body.
///
/// The document id is never part of the body; it is carried alongside it.
pub type Document = serde_json::Map<String, Value>;

/// An opaque, store-assigned document identifier.
///
/// Ids are immutable once assigned and unique within their collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wraps an existing id value, e.g. one read back from a snapshot.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One full collection snapshot: every document with its id, in the store's
/// own order (ascending document id).
pub type Snapshot = Vec<(DocumentId, Document)>;

/// Receives pushes from a live collection subscription.
///
/// `on_snapshot` is called once with the initial snapshot when the watch is
/// attached and once per subsequent committed change. `on_error` is called at
/// most once and terminates the subscription; no `on_snapshot` call follows
/// it. Listeners must not call back into the store.
pub trait SnapshotListener: Send {
    /// Delivers the complete current snapshot of the watched collection.
    fn on_snapshot(&mut self, snapshot: Snapshot);

    /// Reports a terminal subscription failure.
    fn on_error(&mut self, error: StoreError);
}

/// Caller-owned cancellation handle for a live subscription.
///
/// Cancellation is explicit: dropping the handle without calling
/// [`cancel`](WatchHandle::cancel) leaves the subscription attached. This is
/// deliberate; teardown is the caller's responsibility, not the store's.
pub struct WatchHandle {
    cancelled: std::sync::atomic::AtomicBool,
    detach: Box<dyn Fn() + Send + Sync>,
}

impl WatchHandle {
    /// Builds a handle around a detach action.
    ///
    /// The action runs exactly once, on the first `cancel` call.
    pub fn new(detach: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            cancelled: std::sync::atomic::AtomicBool::new(false),
            detach: Box::new(detach),
        }
    }

    /// Returns a handle for a subscription that is already terminated, e.g.
    /// one that failed before attaching. Cancelling it is a no-op.
    pub fn detached() -> Self {
        let handle = Self::new(|| {});
        handle
            .cancelled
            .store(true, std::sync::atomic::Ordering::SeqCst);
        handle
    }

    /// Detaches the subscription.
    ///
    /// Synchronous and idempotent: once this returns, no further listener
    /// calls occur, and calling it again is a no-op.
    pub fn cancel(&self) {
        if !self
            .cancelled
            .swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            (self.detach)();
        }
    }

    /// Reports whether `cancel` has been called (or the subscription was
    /// already terminated).
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A collection-oriented document store with live query subscriptions.
///
/// Mutating calls are independent, fire-and-await operations; the store does
/// not serialize them against the subscription stream. A write may resolve
/// before or after the snapshot push that reflects it, so subscribers must
/// treat the pushed snapshots as the single source of truth.
pub trait DocumentStore: Send + Sync {
    /// Persists a new document and returns its store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the store rejects the write.
    fn add(
        &self,
        collection: &str,
        document: Document,
    ) -> impl std::future::Future<Output = StoreResult<DocumentId>> + Send;

    /// Merges the given fields into an existing document, leaving the others
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id, or another
    /// `StoreError` if the store rejects the write.
    fn merge(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Document,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;

    /// Removes a document. Removing an unknown id is a no-op success.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the store rejects the write.
    fn remove(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;

    /// Attaches a live subscription over the full collection.
    ///
    /// The listener receives the initial snapshot before this call returns,
    /// then one snapshot per committed change, until the returned handle is
    /// cancelled or the subscription fails.
    fn watch(&self, collection: &str, listener: Box<dyn SnapshotListener>) -> WatchHandle;
}
