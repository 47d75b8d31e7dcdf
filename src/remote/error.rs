//! Error types for remote method calls.

use std::error::Error;
use std::fmt;

use crate::error::{ModelError, StoreError};

/// Error type for remote method dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The host does not advertise this method (or not with this kind).
    UnknownMethod(String),
    /// Arguments could not be decoded.
    BadRequest(String),
    /// The model operation failed on the host.
    Model(ModelError),
    /// The transport failed to deliver the call.
    Transport(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::UnknownMethod(name) => write!(f, "unknown method: {}", name),
            RemoteError::BadRequest(msg) => write!(f, "bad request: {}", msg),
            RemoteError::Model(e) => write!(f, "{}", e),
            RemoteError::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RemoteError::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ModelError> for RemoteError {
    fn from(err: ModelError) -> Self {
        RemoteError::Model(err)
    }
}

impl From<StoreError> for RemoteError {
    fn from(err: StoreError) -> Self {
        RemoteError::Model(ModelError::from(err))
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::BadRequest(err.to_string())
    }
}

/// Client side: a failed remote call surfaces as a store error. Host-side
/// model failures stay typed inside [`StoreError::Remote`].
impl From<RemoteError> for StoreError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Model(ModelError::Store(e)) => e,
            RemoteError::Model(ModelError::NotFound { id, .. }) => StoreError::NotFound(id),
            RemoteError::Model(e) => StoreError::Remote(Box::new(e)),
            RemoteError::Transport(_) => StoreError::Closed,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl RemoteError {
    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            RemoteError::UnknownMethod(_) => 404,
            RemoteError::BadRequest(_) => 400,
            RemoteError::Transport(_) => 502,
            RemoteError::Model(e) => match e {
                ModelError::NotFound { .. } | ModelError::Store(StoreError::NotFound(_)) => 404,
                ModelError::PrimaryKeyMismatch { .. }
                | ModelError::PrimaryKeyRequired
                | ModelError::InvalidModel { .. }
                | ModelError::InvalidRecord { .. } => 422,
                ModelError::AttributeIndexMissing { .. } => 400,
                ModelError::Store(StoreError::Unsupported(_)) => 501,
                ModelError::Detached => 503,
                ModelError::Serde(_) | ModelError::Store(_) => 500,
            },
        }
    }

    /// Short machine-readable code carried next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            RemoteError::UnknownMethod(_) => "unknownMethod",
            RemoteError::BadRequest(_) => "badRequest",
            RemoteError::Transport(_) => "transport",
            RemoteError::Model(e) => match e {
                ModelError::NotFound { .. } | ModelError::Store(StoreError::NotFound(_)) => {
                    "notFound"
                }
                ModelError::PrimaryKeyMismatch { .. } => "primaryKeyMismatch",
                ModelError::PrimaryKeyRequired => "primaryKeyRequired",
                ModelError::InvalidModel { .. } | ModelError::InvalidRecord { .. } => {
                    "invalidModel"
                }
                ModelError::AttributeIndexMissing { .. } => "attributeIndexMissing",
                ModelError::Detached => "detached",
                ModelError::Serde(_) | ModelError::Store(_) => "internal",
            },
        }
    }
}
