//! IgnoredDirectly directive
//!
//! Files a step deliberately excluded. They are dropped before the modlist
//! is written.

use serde::{Deserialize, Serialize};

use crate::vfs::Hash;

/// Files explicitly ignored during compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoredDirectlyDirective {
    /// Destination path relative to the install directory
    #[serde(rename = "To")]
    pub to: String,
    /// Content hash of the target file
    #[serde(rename = "Hash")]
    pub hash: Hash,
    /// Size in bytes of the target file
    #[serde(rename = "Size")]
    pub size: u64,
    /// Reason why the file was ignored
    #[serde(rename = "Reason")]
    pub reason: String,
}

impl IgnoredDirectlyDirective {
    pub fn new(to: String, hash: Hash, size: u64, reason: impl Into<String>) -> Self {
        Self {
            to,
            hash,
            size,
            reason: reason.into(),
        }
    }
}
