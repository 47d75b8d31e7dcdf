use std::error::Error;
use std::fmt;

/// Error raised synchronously when a model cannot be bound to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    /// The store does not support sublevel namespacing.
    SublevelRequired,
    /// The model type has an empty primary key name.
    MissingPrimaryKey { model: &'static str },
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachError::SublevelRequired => {
                write!(f, "requires a sublevel-compatible backing store")
            }
            AttachError::MissingPrimaryKey { model } => {
                write!(f, "no primary key set on model {}", model)
            }
        }
    }
}

impl Error for AttachError {}

/// Error type for key-value store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No value stored under the key.
    NotFound(String),
    /// The store does not implement this operation.
    Unsupported(&'static str),
    /// A value could not be encoded or decoded.
    Encoding(String),
    /// Storage lock poisoned during the named operation.
    LockPoisoned(&'static str),
    /// The stream or connection has been closed.
    Closed,
    /// Backend-specific failure.
    Backend(String),
    /// A model operation rejected by a remote host, kept typed so it
    /// surfaces to the caller as the original [`ModelError`].
    Remote(Box<ModelError>),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(key) => write!(f, "key not found in store: {}", key),
            StoreError::Unsupported(op) => write!(f, "store does not support {}", op),
            StoreError::Encoding(msg) => write!(f, "value encoding error: {}", msg),
            StoreError::LockPoisoned(op) => write!(f, "store lock poisoned during {}", op),
            StoreError::Closed => write!(f, "store closed"),
            StoreError::Backend(msg) => write!(f, "store error: {}", msg),
            StoreError::Remote(e) => write!(f, "{}", e),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Remote(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Error type for model operations on an attached store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Point lookup found nothing under the id.
    NotFound { model: &'static str, id: String },
    /// Supplied key disagrees with the model's primary key.
    PrimaryKeyMismatch {
        expected: String,
        actual: Option<String>,
    },
    /// No key supplied and the store cannot generate one.
    PrimaryKeyRequired,
    /// The model failed its own validation.
    InvalidModel { model: &'static str, reason: String },
    /// No secondary accessor is registered for the field.
    AttributeIndexMissing { model: &'static str, field: String },
    /// A raw record could not be turned into a model.
    InvalidRecord { model: &'static str, reason: String },
    /// Serialization/deserialization error.
    Serde(String),
    /// The attachment has been detached from its store.
    Detached,
    /// Pass-through store error.
    Store(StoreError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::NotFound { model, id } => {
                write!(f, "Unable to find {} with id: {}", model, id)
            }
            ModelError::PrimaryKeyMismatch { expected, actual } => write!(
                f,
                "primary key mismatch (key {}, model primary {})",
                expected,
                actual.as_deref().unwrap_or("<none>")
            ),
            ModelError::PrimaryKeyRequired => write!(f, "primary key required"),
            ModelError::InvalidModel { model, reason } => {
                write!(f, "invalid model {}: {}", model, reason)
            }
            ModelError::AttributeIndexMissing { model, field } => {
                write!(f, "attribute index does not exist: {}.{}", model, field)
            }
            ModelError::InvalidRecord { model, reason } => {
                write!(f, "cannot construct {} from record: {}", model, reason)
            }
            ModelError::Serde(msg) => write!(f, "model serialization error: {}", msg),
            ModelError::Detached => write!(f, "model is detached from its store"),
            ModelError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ModelError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Remote(e) => *e,
            other => ModelError::Store(other),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serde(err.to_string())
    }
}
