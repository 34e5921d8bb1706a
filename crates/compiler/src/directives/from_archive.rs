//! FromArchive directive
//!
//! A file the installer copies out of a downloaded archive.

use serde::{Deserialize, Serialize};

use crate::vfs::{Hash, HashRelativePath};

/// Extract a file directly from a downloaded archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromArchive {
    /// Destination path relative to the install directory
    #[serde(rename = "To")]
    pub to: String,
    /// Content hash of the target file
    #[serde(rename = "Hash")]
    pub hash: Hash,
    /// Size in bytes of the target file
    #[serde(rename = "Size")]
    pub size: u64,
    /// Reference to the file within an archive: [archive_hash, path, components...]
    #[serde(rename = "ArchiveHashPath")]
    pub archive_hash_path: HashRelativePath,
}

impl FromArchive {
    pub fn new(to: String, hash: Hash, size: u64, archive_hash_path: HashRelativePath) -> Self {
        Self {
            to,
            hash,
            size,
            archive_hash_path,
        }
    }

    /// Hash of the downloaded archive this file comes from
    pub fn archive_hash(&self) -> Hash {
        self.archive_hash_path.hash
    }
}
