//! Immutable index snapshot over the virtual file forest

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::queue::WorkQueue;
use crate::vfs::error::VfsError;
use crate::vfs::hash::Hash;
use crate::vfs::path::{FullPath, HashRelativePath};
use crate::vfs::virtual_file::VirtualFile;

type Files = Vec<Arc<VirtualFile>>;

static EMPTY: Lazy<IndexRoot> = Lazy::new(|| IndexRoot {
    all_files: Arc::new(Vec::new()),
    by_full_path: Arc::new(HashMap::new()),
    by_hash: Arc::new(HashMap::new()),
    by_root_path: Arc::new(HashMap::new()),
    by_name: Arc::new(HashMap::new()),
});

/// Snapshot of every indexed root plus four derived lookups
///
/// All five collections describe the same set of files. A snapshot never
/// changes: [`integrate`](IndexRoot::integrate) builds a new one and leaves
/// this one valid, sharing the unchanged `VirtualFile` nodes. Cloning is
/// cheap and snapshots can be read from any thread without locking.
#[derive(Debug, Clone)]
pub struct IndexRoot {
    all_files: Arc<Files>,
    by_full_path: Arc<HashMap<FullPath, Arc<VirtualFile>>>,
    by_hash: Arc<HashMap<Hash, Files>>,
    by_root_path: Arc<HashMap<PathBuf, Arc<VirtualFile>>>,
    by_name: Arc<HashMap<String, Files>>,
}

impl Default for IndexRoot {
    fn default() -> Self {
        Self::empty()
    }
}

impl IndexRoot {
    /// The shared empty snapshot
    pub fn empty() -> Self {
        EMPTY.clone()
    }

    /// Root-level files in integration order
    pub fn all_files(&self) -> &[Arc<VirtualFile>] {
        &self.all_files
    }

    pub fn by_full_path(&self) -> &HashMap<FullPath, Arc<VirtualFile>> {
        &self.by_full_path
    }

    /// Every node grouped by content hash
    pub fn by_hash(&self) -> &HashMap<Hash, Files> {
        &self.by_hash
    }

    pub fn by_root_path(&self) -> &HashMap<PathBuf, Arc<VirtualFile>> {
        &self.by_root_path
    }

    pub fn by_name(&self) -> &HashMap<String, Files> {
        &self.by_name
    }

    pub fn is_empty(&self) -> bool {
        self.all_files.is_empty()
    }

    /// Number of nodes in the forest, nested entries included
    pub fn file_count(&self) -> usize {
        self.by_full_path.len()
    }

    /// Whether both snapshots share the same underlying storage
    pub fn ptr_eq(&self, other: &IndexRoot) -> bool {
        Arc::ptr_eq(&self.all_files, &other.all_files)
    }

    pub fn files_with_hash(&self, hash: Hash) -> &[Arc<VirtualFile>] {
        self.by_hash.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn file_at_root(&self, path: &Path) -> Option<&Arc<VirtualFile>> {
        self.by_root_path.get(path)
    }

    /// The archive a nested entry was extracted from
    pub fn parent_of(&self, file: &VirtualFile) -> Option<&Arc<VirtualFile>> {
        file.parent.as_ref().and_then(|p| self.by_full_path.get(p))
    }

    /// The real file on disk that ultimately contains `file`
    pub fn top_parent_of(&self, file: &VirtualFile) -> Option<&Arc<VirtualFile>> {
        self.by_full_path.get(&file.full_path.top())
    }

    /// Merge freshly indexed roots into a new snapshot
    ///
    /// When two roots share a full path the one with the later
    /// `last_modified` wins; on a tie the one seen last wins, so re-indexing
    /// a file replaces it. The four indices are built as independent tasks on
    /// `queue`.
    pub fn integrate<I>(&self, files: I, queue: &WorkQueue) -> Result<IndexRoot, VfsError>
    where
        I: IntoIterator<Item = Arc<VirtualFile>>,
    {
        let all_files = Arc::new(merge_roots(&self.all_files, files));

        let by_full_path = {
            let files = Arc::clone(&all_files);
            queue.spawn(move || build_by_full_path(&files))
        };
        let by_hash = {
            let files = Arc::clone(&all_files);
            queue.spawn(move || build_by_hash(&files))
        };
        let by_root_path = {
            let files = Arc::clone(&all_files);
            queue.spawn(move || build_by_root_path(&files))
        };
        let by_name = {
            let files = Arc::clone(&all_files);
            queue.spawn(move || build_by_name(&files))
        };

        let index = IndexRoot {
            by_full_path: Arc::new(by_full_path.join().map_err(|source| VfsError::IndexBuild {
                index: "full path",
                source,
            })?),
            by_hash: Arc::new(by_hash.join().map_err(|source| VfsError::IndexBuild {
                index: "hash",
                source,
            })?),
            by_root_path: Arc::new(by_root_path.join().map_err(|source| VfsError::IndexBuild {
                index: "root path",
                source,
            })?),
            by_name: Arc::new(by_name.join().map_err(|source| VfsError::IndexBuild {
                index: "name",
                source,
            })?),
            all_files,
        };

        debug!(
            "Integrated index: {} roots, {} files, {} distinct hashes",
            index.all_files.len(),
            index.by_full_path.len(),
            index.by_hash.len()
        );

        Ok(index)
    }

    /// Resolve a reference into a downloaded archive
    ///
    /// Starts from any root-level file with the path's hash and follows each
    /// part through the children of the current node. When several roots
    /// share the hash, or several children share a name, the first found is
    /// used. Returns `None` when the hash has no root-level owner or any part
    /// is missing.
    pub fn file_for_archive_hash_path(&self, path: &HashRelativePath) -> Option<Arc<VirtualFile>> {
        let mut current = self
            .by_hash
            .get(&path.hash)?
            .iter()
            .find(|f| f.is_root())?;

        for part in &path.parts {
            current = self
                .by_name
                .get(part)?
                .iter()
                .find(|f| f.parent.as_ref() == Some(&current.full_path))?;
        }

        Some(Arc::clone(current))
    }
}

fn merge_roots<I>(existing: &[Arc<VirtualFile>], incoming: I) -> Files
where
    I: IntoIterator<Item = Arc<VirtualFile>>,
{
    let mut merged: Files = Vec::with_capacity(existing.len());
    let mut positions: HashMap<FullPath, usize> = HashMap::with_capacity(existing.len());

    for file in existing.iter().cloned().chain(incoming) {
        match positions.get(&file.full_path) {
            Some(&index) => {
                if file.last_modified >= merged[index].last_modified {
                    merged[index] = file;
                }
            }
            None => {
                positions.insert(file.full_path.clone(), merged.len());
                merged.push(file);
            }
        }
    }

    merged
}

fn build_by_full_path(files: &[Arc<VirtualFile>]) -> HashMap<FullPath, Arc<VirtualFile>> {
    files
        .iter()
        .flat_map(|f| f.this_and_all_children())
        .map(|f| (f.full_path.clone(), Arc::clone(f)))
        .collect()
}

fn build_by_hash(files: &[Arc<VirtualFile>]) -> HashMap<Hash, Files> {
    let mut by_hash: HashMap<Hash, Files> = HashMap::new();
    for file in files.iter().flat_map(|f| f.this_and_all_children()) {
        by_hash.entry(file.hash).or_default().push(Arc::clone(file));
    }
    by_hash
}

fn build_by_root_path(files: &[Arc<VirtualFile>]) -> HashMap<PathBuf, Arc<VirtualFile>> {
    files
        .iter()
        .map(|f| (f.absolute_name().to_path_buf(), Arc::clone(f)))
        .collect()
}

fn build_by_name(files: &[Arc<VirtualFile>]) -> HashMap<String, Files> {
    let mut by_name: HashMap<String, Files> = HashMap::new();
    for file in files.iter().flat_map(|f| f.this_and_all_children()) {
        by_name.entry(file.name.clone()).or_default().push(Arc::clone(file));
    }
    by_name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> WorkQueue {
        WorkQueue::new(2).unwrap()
    }

    fn root(path: &str, hash: u64, modified: i64) -> Arc<VirtualFile> {
        Arc::new(VirtualFile::new_root(path, Hash(hash), 10, modified))
    }

    /// /dl/outer.zip -> inner.zip -> a.esp, plus /dl/outer.zip -> readme.txt
    fn nested_archive(path: &str, hash: u64) -> Arc<VirtualFile> {
        let outer = VirtualFile::new_root(path, Hash(hash), 100, 1);
        let inner = outer.child("inner.zip", Hash(hash + 1), 50);
        let esp = inner.child("a.esp", Hash(hash + 2), 5);
        let inner = inner.with_children(vec![esp]);
        let readme = outer.child("readme.txt", Hash(hash + 3), 3);
        Arc::new(outer.with_children(vec![inner, readme]))
    }

    fn total_entries(map: &HashMap<impl std::hash::Hash + Eq, Files>) -> usize {
        map.values().map(Vec::len).sum()
    }

    #[test]
    fn test_empty_is_a_shared_singleton() {
        let a = IndexRoot::empty();
        let b = IndexRoot::default();
        assert!(a.ptr_eq(&b));
        assert!(a.is_empty());
        assert_eq!(a.file_count(), 0);
    }

    #[test]
    fn test_indices_cover_every_node() {
        let queue = queue();
        let files = vec![
            nested_archive("/dl/one.zip", 100),
            nested_archive("/dl/two.zip", 200),
            root("/game/skyrim.esm", 300, 5),
        ];
        let expected: usize = files.iter().map(|f| f.tree_size()).sum();

        let index = IndexRoot::empty().integrate(files, &queue).unwrap();

        assert_eq!(expected, 9);
        assert_eq!(index.by_full_path().len(), expected);
        assert_eq!(total_entries(index.by_hash()), expected);
        assert_eq!(total_entries(index.by_name()), expected);
        assert_eq!(index.by_root_path().len(), index.all_files().len());
        assert_eq!(index.all_files().len(), 3);
    }

    #[test]
    fn test_zero_digest_is_indexed_like_any_other() {
        let queue = queue();
        let files = vec![root("/staging/other.bin", 0x50, 1), nested_archive("/dl/one.zip", 0)];
        let expected: usize = files.iter().map(|f| f.tree_size()).sum();

        let index = IndexRoot::empty().integrate(files, &queue).unwrap();

        assert_eq!(total_entries(index.by_hash()), expected);
        assert_eq!(index.files_with_hash(Hash(0)).len(), 1);
        let path = HashRelativePath::new(Hash(0), vec!["readme.txt".into()]);
        assert!(index.file_for_archive_hash_path(&path).is_some());
    }

    #[test]
    fn test_duplicate_content_groups_by_hash() {
        let queue = queue();
        let files = vec![
            root("/staging/a.esp", 0xA, 1),
            root("/staging/copy/a.esp", 0xA, 1),
            root("/staging/b.esp", 0xB, 1),
        ];

        let index = IndexRoot::empty().integrate(files, &queue).unwrap();

        assert_eq!(index.files_with_hash(Hash(0xA)).len(), 2);
        assert_eq!(index.files_with_hash(Hash(0xB)).len(), 1);
        assert!(index.files_with_hash(Hash(0xC)).is_empty());
    }

    #[test]
    fn test_same_bytes_at_different_depths_share_a_hash() {
        let queue = queue();
        let archive = VirtualFile::new_root("/dl/mod.zip", Hash(1), 10, 1);
        let entry = archive.child("plugin.esp", Hash(42), 5);
        let archive = Arc::new(archive.with_children(vec![entry]));
        let loose = root("/staging/plugin.esp", 42, 1);

        let index = IndexRoot::empty().integrate(vec![archive, loose], &queue).unwrap();

        let depths: Vec<usize> = index
            .files_with_hash(Hash(42))
            .iter()
            .map(|f| f.nesting_factor())
            .collect();
        assert_eq!(depths.len(), 2);
        assert!(depths.contains(&0) && depths.contains(&1));
    }

    #[test]
    fn test_stale_reindex_does_not_replace_newer_entry() {
        let queue = queue();
        let newer = root("/staging/a.esp", 2, 200);
        let older = root("/staging/a.esp", 1, 100);

        let index = IndexRoot::empty().integrate(vec![newer], &queue).unwrap();
        let index = index.integrate(vec![older.clone()], &queue).unwrap();
        let index = index.integrate(vec![older], &queue).unwrap();

        let file = index.file_at_root(Path::new("/staging/a.esp")).unwrap();
        assert_eq!(file.hash, Hash(2));
        assert_eq!(index.all_files().len(), 1);
        assert!(index.files_with_hash(Hash(1)).is_empty());
    }

    #[test]
    fn test_newer_and_tied_entries_replace_older() {
        let queue = queue();
        let index = IndexRoot::empty()
            .integrate(vec![root("/staging/a.esp", 1, 100)], &queue)
            .unwrap();

        let newer = index.integrate(vec![root("/staging/a.esp", 2, 150)], &queue).unwrap();
        assert_eq!(newer.file_at_root(Path::new("/staging/a.esp")).unwrap().hash, Hash(2));

        // Equal timestamps: the last one seen wins
        let tied = newer.integrate(vec![root("/staging/a.esp", 3, 150)], &queue).unwrap();
        assert_eq!(tied.file_at_root(Path::new("/staging/a.esp")).unwrap().hash, Hash(3));
    }

    #[test]
    fn test_integrate_leaves_previous_snapshot_untouched() {
        let queue = queue();
        let first = IndexRoot::empty()
            .integrate(vec![root("/staging/a.esp", 1, 1)], &queue)
            .unwrap();
        let second = first.integrate(vec![root("/staging/b.esp", 2, 1)], &queue).unwrap();

        assert_eq!(first.all_files().len(), 1);
        assert_eq!(second.all_files().len(), 2);
        assert!(first.file_at_root(Path::new("/staging/b.esp")).is_none());
        assert!(IndexRoot::empty().is_empty());

        // Unchanged nodes are shared, not copied
        let a1 = first.file_at_root(Path::new("/staging/a.esp")).unwrap();
        let a2 = second.file_at_root(Path::new("/staging/a.esp")).unwrap();
        assert!(Arc::ptr_eq(a1, a2));
    }

    #[test]
    fn test_resolves_nested_archive_hash_path() {
        let queue = queue();
        let index = IndexRoot::empty()
            .integrate(vec![nested_archive("/dl/outer.zip", 100)], &queue)
            .unwrap();

        let path = HashRelativePath::new(Hash(100), vec!["inner.zip".into(), "a.esp".into()]);
        let file = index.file_for_archive_hash_path(&path).unwrap();
        assert_eq!(file.hash, Hash(102));
        assert_eq!(file.nesting_factor(), 2);

        let archive_only = HashRelativePath::new(Hash(100), vec![]);
        assert_eq!(index.file_for_archive_hash_path(&archive_only).unwrap().hash, Hash(100));

        let parent = index.parent_of(&file).unwrap();
        assert_eq!(parent.name, "inner.zip");
        assert_eq!(index.top_parent_of(&file).unwrap().hash, Hash(100));
    }

    #[test]
    fn test_unresolvable_hash_paths_return_none() {
        let queue = queue();
        let index = IndexRoot::empty()
            .integrate(vec![nested_archive("/dl/outer.zip", 100)], &queue)
            .unwrap();

        // Unknown hash
        let unknown = HashRelativePath::new(Hash(999), vec!["a.esp".into()]);
        assert!(index.file_for_archive_hash_path(&unknown).is_none());

        // Hash only owned by a nested entry, never by a root
        let nested_only = HashRelativePath::new(Hash(101), vec!["a.esp".into()]);
        assert!(index.file_for_archive_hash_path(&nested_only).is_none());

        // Name exists in the forest but not under this parent
        let wrong_parent = HashRelativePath::new(Hash(100), vec!["a.esp".into()]);
        assert!(index.file_for_archive_hash_path(&wrong_parent).is_none());

        let missing_part = HashRelativePath::new(Hash(100), vec!["inner.zip".into(), "b.esp".into()]);
        assert!(index.file_for_archive_hash_path(&missing_part).is_none());

        assert!(IndexRoot::empty().file_for_archive_hash_path(&unknown).is_none());
    }

    #[test]
    fn test_duplicate_root_hashes_resolve_to_any_owner() {
        let queue = queue();
        let index = IndexRoot::empty()
            .integrate(
                vec![nested_archive("/dl/a/outer.zip", 100), nested_archive("/dl/b/outer.zip", 100)],
                &queue,
            )
            .unwrap();

        let path = HashRelativePath::new(Hash(100), vec!["inner.zip".into(), "a.esp".into()]);
        let file = index.file_for_archive_hash_path(&path).unwrap();

        // Either copy is acceptable
        assert_eq!(file.hash, Hash(102));
        let owner = file.absolute_name().to_path_buf();
        assert!(owner == Path::new("/dl/a/outer.zip") || owner == Path::new("/dl/b/outer.zip"));
    }

    #[test]
    fn test_integrate_on_single_worker_queue() {
        let queue = WorkQueue::new(1).unwrap();
        let index = IndexRoot::empty()
            .integrate(vec![nested_archive("/dl/outer.zip", 100)], &queue)
            .unwrap();
        assert_eq!(index.file_count(), 4);
    }
}
