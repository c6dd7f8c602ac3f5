//! Storage error types.

use std::io;

use thiserror::Error;

/// Error type shared by the router, the registry and every backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Invalid or inconsistent configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The remote login sequence failed. Retried on the next request.
    #[error("login process failed: {0}")]
    Authentication(String),

    /// Unknown segment, library or path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation disabled for this namespace node.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Path is malformed for the requested operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Remote service answered with an unexpected status.
    #[error("{context}: API http status error {status} {reason}")]
    Status {
        context: String,
        status: u16,
        reason: String,
    },

    /// Remote call failed before a usable response was received.
    #[error("{context}: {message}")]
    Transport { context: String, message: String },

    /// Local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn permission_denied(what: impl Into<String>) -> Self {
        Self::PermissionDenied(what.into())
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Wrap a transport-level failure with the phase it happened in.
    pub fn transport(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// True for remote failures: unexpected status or a broken exchange.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::Transport { .. })
    }
}

/// Convert StorageError to std::io::Error so protocol engines built on
/// `io::Result` can map it to their own reply codes.
impl From<StorageError> for io::Error {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Io(e) => e,
            StorageError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            StorageError::PermissionDenied(msg) => {
                io::Error::new(io::ErrorKind::PermissionDenied, msg)
            }
            StorageError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            other => io::Error::other(other.to_string()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_carries_code_and_phase() {
        let err = StorageError::Status {
            context: "request upload link".to_string(),
            status: 403,
            reason: "Forbidden".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "request upload link: API http status error 403 Forbidden"
        );
        assert!(err.is_transport());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_io_not_found_is_not_found() {
        let err = StorageError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_into_io_error_kinds() {
        let e: io::Error = StorageError::permission_denied("/").into();
        assert_eq!(e.kind(), io::ErrorKind::PermissionDenied);

        let e: io::Error = StorageError::not_found("docs").into();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);

        let e: io::Error = StorageError::Authentication("expected pong".into()).into();
        assert_eq!(e.kind(), io::ErrorKind::Other);
    }
}
