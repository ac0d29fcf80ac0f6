//! Storage error handling
//!
//! Provides typed errors for storage operations with descriptive messages
//! and recovery suggestions. Every variant classifies into one of four
//! [`ErrorKind`]s, which is all a transport shell needs to pick a status code.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`StoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced path or file is absent
    NotFound,
    /// Stored or submitted bytes are not valid structured data
    DecodeFailure,
    /// Filesystem write, create or rename failed
    IoFailure,
    /// The remote release listing could not be fetched
    RemoteFailure,
}

impl ErrorKind {
    /// Status code used at the transport boundary
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::DecodeFailure | ErrorKind::IoFailure | ErrorKind::RemoteFailure => 500,
        }
    }
}

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// File not found (when expected to exist)
    #[error("File not found: '{path}'")]
    NotFound { path: PathBuf },

    /// A path argument was required but empty
    #[error("No path given")]
    EmptyPath,

    /// Document format is invalid (cannot be parsed)
    #[error("Invalid document format in '{path}': {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Document could not be serialized
    #[error("Failed to serialize document for '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Image payload could not be decoded
    #[error("Invalid image payload: {details}")]
    InvalidPayload { details: String },

    /// Request body did not have the expected shape
    #[error("Bad request: {details}")]
    BadRequest { details: String },

    /// Failed to create a directory
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Moving a file into place failed
    #[error("Could not rename '{from}' to '{to}': {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Release listing could not be fetched
    #[error("Failed to fetch releases from {url}: {details}")]
    Remote { url: String, details: String },
}

impl StoreError {
    /// Create an error from an I/O error raised while reading `path`
    ///
    /// A missing file becomes [`StoreError::NotFound`].
    pub fn from_read(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound { path },
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path,
                source: error,
            },
            _ => StoreError::ReadError {
                path,
                source: error,
            },
        }
    }

    /// Create an error from an I/O error raised while writing `path`
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.).
    /// A missing path here is a failed write, not a lookup miss.
    pub fn from_write(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => StoreError::DiskFull {
                path,
                source: error,
            },
            _ => StoreError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Classify this error for the transport boundary
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } | StoreError::EmptyPath => ErrorKind::NotFound,
            StoreError::InvalidFormat { .. }
            | StoreError::Serialize { .. }
            | StoreError::InvalidPayload { .. }
            | StoreError::BadRequest { .. } => ErrorKind::DecodeFailure,
            StoreError::CreateDirectory { .. }
            | StoreError::PermissionDenied { .. }
            | StoreError::DiskFull { .. }
            | StoreError::ReadError { .. }
            | StoreError::WriteError { .. }
            | StoreError::RenameFailed { .. } => ErrorKind::IoFailure,
            StoreError::Remote { .. } => ErrorKind::RemoteFailure,
        }
    }

    /// Check if this error is a lookup miss
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::DiskFull { .. } => Some("Free up disk space and try again."),
            StoreError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StoreError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StoreError::Remote { .. } => {
                Some("Check your network connection and the configured changelog_url.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_not_found_classification() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = StoreError::from_read(io_err, PathBuf::from("/missing/file"));

        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.kind().status_code(), 404);
    }

    #[test]
    fn test_write_not_found_is_io_failure() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such directory");
        let err = StoreError::from_write(io_err, PathBuf::from("/gone/dir/file.json"));

        assert!(matches!(err, StoreError::WriteError { .. }));
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert_eq!(err.kind().status_code(), 500);
    }

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StoreError::from_write(io_err, PathBuf::from("/test/path"));

        assert!(matches!(err, StoreError::PermissionDenied { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StoreError::from_write(io_err, PathBuf::from("/full/disk"));

        assert!(matches!(err, StoreError::DiskFull { .. }));
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn test_kind_mapping() {
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StoreError::InvalidFormat {
            path: PathBuf::from("/data/session.json"),
            source: decode,
        };
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);

        let err = StoreError::Remote {
            url: "https://example.com/releases".to_string(),
            details: "timed out".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::RemoteFailure);
        assert_eq!(err.kind().status_code(), 500);

        assert!(StoreError::EmptyPath.is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::PermissionDenied {
            path: PathBuf::from("/test/file"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };

        let msg = err.to_string();
        assert!(msg.contains("Permission denied"));
        assert!(msg.contains("/test/file"));
    }
}
