//! Archive extraction capability
//!
//! Indexing only needs to know whether a file is an archive and how to
//! unpack it into a directory; the decompression itself is delegated.

use std::fs::File;
use std::path::Path;

use tracing::debug;

use crate::vfs::error::VfsError;

/// Something that can unpack archives into a directory
pub trait ArchiveExtractor: Send + Sync {
    /// Whether `path` looks like an archive this extractor understands
    fn can_extract(&self, path: &Path) -> bool;

    /// Unpack every entry of `archive` under `dest`, keeping relative paths
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), VfsError>;
}

/// Treats every file as opaque
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExtractor;

impl ArchiveExtractor for NoExtractor {
    fn can_extract(&self, _path: &Path) -> bool {
        false
    }

    fn extract(&self, archive: &Path, _dest: &Path) -> Result<(), VfsError> {
        Err(VfsError::Extraction {
            archive: archive.to_path_buf(),
            reason: "No extractor configured".to_string(),
        })
    }
}

/// Extracts `.zip` archives
///
/// Detection looks at the file's magic bytes rather than its extension, so
/// zips renamed to `.7z`, `.fomod` etc. are still opened.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];
const ZIP_EMPTY_MAGIC: [u8; 4] = [b'P', b'K', 0x05, 0x06];

impl ArchiveExtractor for ZipExtractor {
    fn can_extract(&self, path: &Path) -> bool {
        use std::io::Read;

        let mut magic = [0u8; 4];
        match File::open(path).and_then(|mut f| f.read_exact(&mut magic)) {
            Ok(()) => magic == ZIP_MAGIC || magic == ZIP_EMPTY_MAGIC,
            Err(_) => false,
        }
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), VfsError> {
        let file = File::open(archive).map_err(|source| VfsError::Io {
            path: archive.to_path_buf(),
            source,
        })?;

        let mut zip = zip::ZipArchive::new(file).map_err(|e| VfsError::Extraction {
            archive: archive.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!("Extracting {} entries from {}", zip.len(), archive.display());

        zip.extract(dest).map_err(|e| VfsError::Extraction {
            archive: archive.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
