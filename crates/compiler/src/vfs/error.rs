//! VFS error types

use std::path::PathBuf;
use thiserror::Error;

use crate::queue::TaskError;

/// Errors that can occur while indexing files
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("IO error on '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk '{root}'")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to extract archive '{archive}': {reason}")]
    Extraction { archive: PathBuf, reason: String },

    #[error("Invalid hash '{value}': {reason}")]
    InvalidHash { value: String, reason: String },

    #[error("Index root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Building the {index} index failed")]
    IndexBuild {
        index: &'static str,
        #[source]
        source: TaskError,
    },

    #[error("Indexing was cancelled")]
    Cancelled,
}

impl VfsError {
    /// Whether indexing can skip the offending file and carry on
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VfsError::Io { .. } | VfsError::Walk { .. } | VfsError::Extraction { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            VfsError::Io { .. } => "io",
            VfsError::Walk { .. } => "walk",
            VfsError::Extraction { .. } => "extraction",
            VfsError::InvalidHash { .. } => "hash",
            VfsError::RootNotFound(_) => "root",
            VfsError::IndexBuild { .. } => "index",
            VfsError::Cancelled => "cancelled",
        }
    }
}
