use padron_store::StoreError;

/// A single form field failing its validation rule.
///
/// These never leave the form controller; they surface as per-field visual
/// state plus one generic blocking message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("el campo es obligatorio")]
    Required,
    #[error("debe tener al menos {min} caracteres")]
    TooShort { min: usize },
    #[error("no puede superar los {max} caracteres")]
    TooLong { max: usize },
    #[error("solo se permiten letras y espacios")]
    InvalidCharacters,
    #[error("no es un correo electrónico válido")]
    InvalidEmail,
    #[error("no es una fecha válida (AAAA-MM-DD)")]
    InvalidDate,
}

/// A create/update/delete rejected on the store side.
///
/// Never retried automatically; the form keeps its state so the user can
/// retry the same submission.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("the store rejected the write: {0}")]
    Store(#[from] StoreError),
    #[error("failed to serialize patient document: {0}")]
    Serialization(serde_json::Error),
}

/// Invalid startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("collection name cannot be empty")]
    EmptyCollection,
}
