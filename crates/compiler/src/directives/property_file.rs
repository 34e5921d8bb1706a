//! PropertyFile directive
//!
//! Modlist metadata files (banner, readme) embedded alongside the directives.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vfs::Hash;

/// Property file roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Banner,
    Readme,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::Banner => f.write_str("banner"),
            PropertyType::Readme => f.write_str("readme"),
        }
    }
}

/// Modlist metadata files (banner, readme)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFileDirective {
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
    /// Type of property file
    #[serde(rename = "Type")]
    pub property_type: PropertyType,
}

impl PropertyFileDirective {
    pub fn new(
        to: String,
        hash: Hash,
        size: u64,
        source_data_id: String,
        property_type: PropertyType,
    ) -> Self {
        Self {
            to,
            hash,
            size,
            source_data_id,
            property_type,
        }
    }
}
