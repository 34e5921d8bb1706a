//! Virtual file nodes
//!
//! A [`VirtualFile`] is either a real file on disk (a root) or an entry
//! extracted from the archive that owns it. Nodes are immutable once built
//! and shared as `Arc<VirtualFile>` between index snapshots. A child refers
//! to its archive by [`FullPath`] key instead of a pointer; the owning
//! [`IndexRoot`](crate::vfs::IndexRoot) resolves that key.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::vfs::hash::Hash;
use crate::vfs::path::{FullPath, normalize_part};

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualFile {
    /// Absolute path for roots, entry path inside the parent archive otherwise
    pub name: String,

    /// Unique key across the whole forest
    pub full_path: FullPath,

    /// xxHash64 of the content
    pub hash: Hash,

    /// Size in bytes
    pub size: u64,

    /// Milliseconds since the Unix epoch; children inherit their archive's
    pub last_modified: i64,

    /// Key of the archive this entry was extracted from, `None` for roots
    pub parent: Option<FullPath>,

    /// Extracted entries, empty unless this file is an archive
    pub children: Vec<Arc<VirtualFile>>,
}

impl VirtualFile {
    /// Create a root node for a file that exists on disk
    pub fn new_root(path: impl Into<PathBuf>, hash: Hash, size: u64, last_modified: i64) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            full_path: FullPath::root(path),
            hash,
            size,
            last_modified,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Create a node for an entry of this archive
    ///
    /// The returned node is not attached; pass it to
    /// [`with_children`](VirtualFile::with_children).
    pub fn child(&self, name: &str, hash: Hash, size: u64) -> Self {
        let name = normalize_part(name);
        Self {
            full_path: self.full_path.join(&name),
            name,
            hash,
            size,
            last_modified: self.last_modified,
            parent: Some(self.full_path.clone()),
            children: Vec::new(),
        }
    }

    /// Attach extracted entries, sorted by name for a stable traversal order
    pub fn with_children(mut self, children: Vec<VirtualFile>) -> Self {
        let mut children: Vec<Arc<VirtualFile>> = children.into_iter().map(Arc::new).collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        self.children = children;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_archive(&self) -> bool {
        !self.children.is_empty()
    }

    /// Depth inside nested archives, 0 for files on disk
    pub fn nesting_factor(&self) -> usize {
        self.full_path.depth()
    }

    /// The real file on disk that contains this node
    pub fn absolute_name(&self) -> &Path {
        self.full_path.base()
    }

    /// Last path component of the entry name
    pub fn file_name(&self) -> &str {
        let trimmed = self.name.trim_end_matches(['/', '\\']);
        trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
    }

    /// Lazily walk this node and its whole subtree, parents before children
    pub fn this_and_all_children(self: &Arc<Self>) -> ThisAndAllChildren<'_> {
        ThisAndAllChildren { stack: vec![self] }
    }

    /// Number of nodes in this subtree, including this one
    pub fn tree_size(self: &Arc<Self>) -> usize {
        self.this_and_all_children().count()
    }
}

/// Pre-order iterator over a node and its descendants
pub struct ThisAndAllChildren<'a> {
    stack: Vec<&'a Arc<VirtualFile>>,
}

impl<'a> Iterator for ThisAndAllChildren<'a> {
    type Item = &'a Arc<VirtualFile>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Convert a file timestamp into milliseconds since the Unix epoch
pub fn unix_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Arc<VirtualFile> {
        let archive = VirtualFile::new_root("/downloads/mod.zip", Hash(1), 100, 10);
        let inner = archive.child("data/inner.zip", Hash(2), 40);
        let nested = inner.child("textures/a.dds", Hash(3), 8);
        let inner = inner.with_children(vec![nested]);
        let readme = archive.child("readme.txt", Hash(4), 4);
        Arc::new(archive.with_children(vec![readme, inner]))
    }

    #[test]
    fn test_pre_order_flattening() {
        let tree = sample_tree();
        let names: Vec<&str> = tree.this_and_all_children().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["/downloads/mod.zip", "data/inner.zip", "textures/a.dds", "readme.txt"]
        );
        assert_eq!(tree.tree_size(), 4);
    }

    #[test]
    fn test_nesting_and_parent_links() {
        let tree = sample_tree();
        let inner = &tree.children[0];
        let nested = &inner.children[0];

        assert!(tree.is_root());
        assert!(tree.is_archive());
        assert_eq!(nested.nesting_factor(), 2);
        assert_eq!(nested.parent.as_ref(), Some(&inner.full_path));
        assert_eq!(inner.parent.as_ref(), Some(&tree.full_path));
        assert_eq!(nested.absolute_name(), Path::new("/downloads/mod.zip"));
        assert_eq!(nested.file_name(), "a.dds");
        assert_eq!(nested.last_modified, 10);
    }

    #[test]
    fn test_unix_millis_round_trip() {
        let time = UNIX_EPOCH + std::time::Duration::from_millis(1_500);
        assert_eq!(unix_millis(time), 1_500);
    }
}
