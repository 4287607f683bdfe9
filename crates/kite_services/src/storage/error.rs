use std::io;
use thiserror::Error;

/// Errors raised by storage commands. Everything except [`StorageError::Channel`]
/// is reported to the caller through the response channel.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{path}: {source}")]
    NotFound {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot determine free space: {0}")]
    SpaceQueryFailed(#[source] io::Error),

    #[error("a file push is already in progress")]
    SessionAlreadyOpen,

    #[error("no file push in progress")]
    NoSession,

    #[error("file push aborted after a failed write; start a new push")]
    PushAborted,

    #[error("response channel failed: {0}")]
    Channel(#[source] io::Error),
}

impl StorageError {
    /// Wrap an OS error, promoting `NotFound` to its own variant.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        let context = context.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: context,
                source,
            }
        } else {
            Self::Io { context, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_promoted() {
        let err = StorageError::io("a.txt", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, StorageError::NotFound { .. }));
        assert!(err.to_string().starts_with("a.txt: "));
    }

    #[test]
    fn other_errors_keep_os_text() {
        let source = io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied");
        let err = StorageError::io("Cannot finalize push", source);
        assert!(matches!(err, StorageError::Io { .. }));
        assert_eq!(err.to_string(), "Cannot finalize push: Permission denied");
    }
}
