//! NoMatch directive
//!
//! Produced when no compilation step claims a file.

use serde::{Deserialize, Serialize};

use crate::vfs::Hash;

/// Files that couldn't be matched during compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoMatchDirective {
    /// Destination path relative to the install directory
    #[serde(rename = "To")]
    pub to: String,
    /// Content hash of the target file
    #[serde(rename = "Hash")]
    pub hash: Hash,
    /// Size in bytes of the target file
    #[serde(rename = "Size")]
    pub size: u64,
    /// Reason why the file couldn't be matched
    #[serde(rename = "Reason")]
    pub reason: String,
}

impl NoMatchDirective {
    pub fn new(to: String, hash: Hash, size: u64, reason: impl Into<String>) -> Self {
        Self {
            to,
            hash,
            size,
            reason: reason.into(),
        }
    }
}
