//! Store error handling
//!
//! Provides typed errors for document store operations with descriptive
//! messages and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading from or writing to a document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store refused the write (permission, validation, quota)
    #[error("Write to '{collection}' rejected: {reason}")]
    Rejected { collection: String, reason: String },

    /// Document to update does not exist
    #[error("No document '{id}' in '{collection}'")]
    MissingDocument { collection: String, id: String },

    /// Could not reach the store
    #[error("Store connection error: {0}")]
    Connection(String),

    /// The store answered with something we could not read
    #[error("Invalid document in '{collection}': {source}")]
    Decode {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    /// The connection task is gone
    #[error("Store connection closed")]
    Closed,

    /// Operation is not offered by this backend
    #[error("{0}")]
    Unsupported(&'static str),

    /// Permission denied accessing the local data file
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

    /// Failed to write the local data file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Local data file cannot be parsed
    #[error("Invalid data file '{path}': {details}")]
    InvalidFormat { path: PathBuf, details: String },

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
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

    /// Shorthand for a rejected write
    pub fn rejected(collection: &str, reason: impl Into<String>) -> Self {
        StoreError::Rejected {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether re-issuing the same command later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Connection(_) | StoreError::Closed | StoreError::DiskFull { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::Connection(_) | StoreError::Closed => {
                Some("Check the network connection and the remote_url setting, then try again.")
            }
            StoreError::DiskFull { .. } => Some("Free up disk space and try again."),
            StoreError::PermissionDenied { .. } => {
                Some("Check file and directory permissions of the data directory.")
            }
            StoreError::Rejected { .. } => {
                Some("The store refused the change. Sign in as administrator and try again.")
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

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
