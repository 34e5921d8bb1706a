//! Inputs of the compilation stack

use std::path::Path;
use std::sync::Arc;

use crate::directives::{IgnoredDirectlyDirective, NoMatchDirective};
use crate::vfs::{Hash, VirtualFile};

/// A file on disk together with the path it must be installed to
#[derive(Debug, Clone)]
pub struct RawSourceFile {
    pub file: Arc<VirtualFile>,
    /// Destination relative to the install folder, `/`-separated
    pub path: String,
}

impl RawSourceFile {
    pub fn new(file: Arc<VirtualFile>, path: impl Into<String>) -> Self {
        Self {
            file,
            path: path.into(),
        }
    }

    /// Location of the file on disk
    pub fn absolute_path(&self) -> &Path {
        self.file.absolute_name()
    }

    pub fn hash(&self) -> Hash {
        self.file.hash
    }

    pub fn size(&self) -> u64 {
        self.file.size
    }

    pub fn ignored(&self, reason: impl Into<String>) -> IgnoredDirectlyDirective {
        IgnoredDirectlyDirective::new(self.path.clone(), self.hash(), self.size(), reason)
    }

    pub fn no_match(&self, reason: impl Into<String>) -> NoMatchDirective {
        NoMatchDirective::new(self.path.clone(), self.hash(), self.size(), reason)
    }
}

/// A downloaded archive that has a `.meta` file next to it
#[derive(Debug, Clone)]
pub struct IndexedArchive {
    pub file: Arc<VirtualFile>,
    /// File name inside the downloads folder
    pub name: String,
    /// Raw contents of the `.meta` file
    pub meta: String,
}

impl IndexedArchive {
    pub fn hash(&self) -> Hash {
        self.file.hash
    }

    /// File name without its extension
    pub fn stem(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.name)
    }
}
