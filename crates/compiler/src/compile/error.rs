//! Compilation error types

use std::path::PathBuf;
use thiserror::Error;

use crate::queue::QueueError;
use crate::vfs::VfsError;

/// Errors that can occur during compilation
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error on '{path}'")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("VFS error: {0}")]
    Vfs(#[from] VfsError),

    #[error("Work queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("{count} files have no match")]
    UnmatchedFiles { count: usize, files: Vec<String> },

    #[error("{count} destination paths are produced by more than one source file")]
    DuplicateDestinations { count: usize },

    #[error("The {role} has already been recorded")]
    PropertyAlreadyRecorded { role: &'static str },

    #[error("Compilation step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Compilation was cancelled")]
    Cancelled,
}

impl CompileError {
    /// Whether the run stopped on bad input the author can fix and re-run
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CompileError::Configuration(_)
                | CompileError::UnmatchedFiles { .. }
                | CompileError::DuplicateDestinations { .. }
                | CompileError::Regex(_)
                | CompileError::Yaml(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CompileError::Io(_) | CompileError::FileIo { .. } => "io",
            CompileError::Vfs(e) => e.category(),
            CompileError::Queue(_) => "queue",
            CompileError::Json(_) | CompileError::Yaml(_) => "serialization",
            CompileError::Regex(_) | CompileError::Configuration(_) => "configuration",
            CompileError::UnmatchedFiles { .. } => "no_match",
            CompileError::DuplicateDestinations { .. } => "duplicates",
            CompileError::PropertyAlreadyRecorded { .. } => "property",
            CompileError::StepFailed { .. } => "step",
            CompileError::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_flagged() {
        assert!(CompileError::DuplicateDestinations { count: 1 }.is_user_error());
        assert!(CompileError::Configuration("no game folder".into()).is_user_error());
        assert!(!CompileError::Cancelled.is_user_error());
    }

    #[test]
    fn test_vfs_errors_keep_their_category() {
        let err: CompileError = VfsError::RootNotFound(PathBuf::from("/missing")).into();
        assert_eq!(err.category(), "root");
        assert_eq!(CompileError::UnmatchedFiles { count: 2, files: vec![] }.to_string(), "2 files have no match");
    }
}
