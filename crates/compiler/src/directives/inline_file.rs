//! InlineFile directive
//!
//! A file whose bytes are embedded in the modlist itself.

use serde::{Deserialize, Serialize};

use crate::vfs::Hash;

/// Write embedded data directly to the destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineFileDirective {
    /// Destination path relative to the install directory
    #[serde(rename = "To")]
    pub to: String,
    /// Content hash of the target file
    #[serde(rename = "Hash")]
    pub hash: Hash,
    /// Size in bytes of the target file
    #[serde(rename = "Size")]
    pub size: u64,
    /// Reference to embedded data in the modlist
    #[serde(rename = "SourceDataID")]
    pub source_data_id: String,
}

impl InlineFileDirective {
    pub fn new(to: String, hash: Hash, size: u64, source_data_id: String) -> Self {
        Self {
            to,
            hash,
            size,
            source_data_id,
        }
    }
}
