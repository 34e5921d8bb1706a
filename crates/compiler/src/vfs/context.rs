//! Indexing context: walks folders, hashes files, and expands archives
//! into the current [`IndexRoot`]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::queue::{StatusReporter, TaskError, WorkQueue};
use crate::vfs::error::VfsError;
use crate::vfs::extractor::{ArchiveExtractor, ZipExtractor};
use crate::vfs::hash::hash_file;
use crate::vfs::index_root::IndexRoot;
use crate::vfs::virtual_file::{VirtualFile, unix_millis};

/// Owns the active index snapshot and the machinery to grow it
pub struct Context {
    index: IndexRoot,
    queue: Arc<WorkQueue>,
    extractor: Arc<dyn ArchiveExtractor>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("files", &self.index.file_count())
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Create a context with an empty index that extracts zip archives
    pub fn new(queue: Arc<WorkQueue>) -> Self {
        Self {
            index: IndexRoot::empty(),
            queue,
            extractor: Arc::new(ZipExtractor),
        }
    }

    /// Replace the archive extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// The current snapshot
    pub fn index(&self) -> &IndexRoot {
        &self.index
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Index every file under `root`
    pub fn add_root(&mut self, root: &Path) -> Result<IndexRoot, VfsError> {
        self.add_roots(&[root.to_path_buf()])
    }

    /// Index every file under each folder in `roots` and integrate them
    ///
    /// Files whose size and modification time match the entry already in
    /// the index are not hashed again. Files that cannot be read are logged
    /// and skipped. Returns the new snapshot, which also becomes the
    /// context's active index.
    pub fn add_roots(&mut self, roots: &[PathBuf]) -> Result<IndexRoot, VfsError> {
        let mut pending = Vec::new();
        let mut reused = 0usize;

        for root in roots {
            if !root.exists() {
                return Err(VfsError::RootNotFound(root.clone()));
            }

            for entry in WalkDir::new(root).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(source) => {
                        let err = VfsError::Walk {
                            root: root.clone(),
                            source,
                        };
                        warn!("Skipping unreadable entry: {}", err);
                        continue;
                    }
                };

                if !entry.file_type().is_file() {
                    continue;
                }

                if self.is_unchanged(entry.path()) {
                    reused += 1;
                } else {
                    pending.push(entry.into_path());
                }
            }
        }

        info!(
            "Indexing {} files under {} roots ({} unchanged)",
            pending.len(),
            roots.len(),
            reused
        );

        let total = pending.len();
        let extractor = Arc::clone(&self.extractor);
        let reporter = self.queue.reporter();
        let results = self
            .queue
            .parallel_map(pending.clone(), move |path| index_disk_file(&path, extractor.as_ref(), &reporter));

        let mut indexed = Vec::with_capacity(total);
        for (path, result) in pending.iter().zip(results) {
            match result {
                Ok(Ok(file)) => indexed.push(Arc::new(file)),
                Ok(Err(e)) if e.is_recoverable() => {
                    warn!("Failed to index {} ({}): {}", path.display(), e.category(), e)
                }
                Ok(Err(e)) => return Err(e),
                Err(TaskError::Cancelled) => return Err(VfsError::Cancelled),
                Err(e) => warn!("Indexing {} failed: {}", path.display(), e),
            }
        }

        debug!("Indexed {} of {} files", indexed.len(), total);

        self.index = self.index.integrate(indexed, &self.queue)?;
        Ok(self.index.clone())
    }

    fn is_unchanged(&self, path: &Path) -> bool {
        let Some(existing) = self.index.file_at_root(path) else {
            return false;
        };
        match fs::metadata(path) {
            Ok(meta) => {
                let modified = meta.modified().map(unix_millis).unwrap_or_default();
                meta.len() == existing.size && modified == existing.last_modified
            }
            Err(_) => false,
        }
    }
}

/// Hash a file on disk and expand it if it is an archive
fn index_disk_file(
    path: &Path,
    extractor: &dyn ArchiveExtractor,
    reporter: &StatusReporter,
) -> Result<VirtualFile, VfsError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    reporter.report(format!("Hashing {}", file_name), 0);

    let meta = fs::metadata(path).map_err(|source| VfsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = meta.modified().map(unix_millis).unwrap_or_default();
    let hash = hash_file(path)?;

    let root = VirtualFile::new_root(path, hash, meta.len(), modified);
    if !extractor.can_extract(path) {
        return Ok(root);
    }

    reporter.report(format!("Extracting {}", file_name), 50);
    Ok(expand_archive(root, path, extractor))
}

/// Extract `on_disk` into a temporary folder and attach its entries to
/// `node`, recursing into nested archives
///
/// Extraction failures leave `node` as a plain file.
fn expand_archive(node: VirtualFile, on_disk: &Path, extractor: &dyn ArchiveExtractor) -> VirtualFile {
    let temp = match tempfile::tempdir() {
        Ok(temp) => temp,
        Err(e) => {
            warn!("Cannot create temp folder for {}: {}", node.full_path, e);
            return node;
        }
    };

    if let Err(e) = extractor.extract(on_disk, temp.path()) {
        warn!("Treating {} as a plain file: {}", node.full_path, e);
        return node;
    }

    let mut children = Vec::new();
    for entry in WalkDir::new(temp.path()).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) if entry.file_type().is_file() => entry,
            Ok(_) => continue,
            Err(e) => {
                warn!("Skipping entry of {}: {}", node.full_path, e);
                continue;
            }
        };

        let relative = match entry.path().strip_prefix(temp.path()) {
            Ok(relative) => relative.to_string_lossy().into_owned(),
            Err(_) => continue,
        };

        let hash = match hash_file(entry.path()) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Skipping entry {} of {}: {}", relative, node.full_path, e);
                continue;
            }
        };
        let size = entry.metadata().map(|m| m.len()).unwrap_or_default();

        let child = node.child(&relative, hash, size);
        let child = if extractor.can_extract(entry.path()) {
            expand_archive(child, entry.path(), extractor)
        } else {
            child
        };
        children.push(child);
    }

    node.with_children(children)
}
