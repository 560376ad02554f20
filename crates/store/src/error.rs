use crate::DocumentId;

/// Failures reported by a document store.
///
/// Variants are cloneable so a subscription failure can be fanned out to
/// every attached listener.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("permission denied by the store")]
    PermissionDenied,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("no document with id {0}")]
    NotFound(DocumentId),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
