//! State shared by every compilation step during a run

use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::debug;

use crate::compile::config::CompilerConfig;
use crate::compile::error::CompileError;
use crate::compile::source::IndexedArchive;
use crate::directives::PropertyType;
use crate::vfs::{Hash, HashRelativePath, IndexRoot, VirtualFile, hash_bytes};

/// Read-mostly view of the run handed to each step
///
/// Steps run concurrently, so the only mutable state here is behind
/// write-once cells and a lock around the set of embedded blobs.
#[derive(Debug)]
pub struct CompilerContext {
    config: Arc<CompilerConfig>,
    index: IndexRoot,
    indexed_archives: Vec<IndexedArchive>,
    /// Every file inside an indexed archive, shallowest first per hash
    indexed_files: HashMap<Hash, Vec<Arc<VirtualFile>>>,
    banner_id: OnceLock<String>,
    readme_id: OnceLock<String>,
    included: Mutex<HashSet<String>>,
}

impl CompilerContext {
    pub fn new(config: Arc<CompilerConfig>, index: IndexRoot) -> Self {
        Self {
            config,
            index,
            indexed_archives: Vec::new(),
            indexed_files: HashMap::new(),
            banner_id: OnceLock::new(),
            readme_id: OnceLock::new(),
            included: Mutex::new(HashSet::new()),
        }
    }

    /// Register the archives files may be matched against
    pub fn with_indexed_archives(mut self, archives: Vec<IndexedArchive>) -> Self {
        let mut files: Vec<&Arc<VirtualFile>> = archives
            .iter()
            .flat_map(|a| a.file.this_and_all_children())
            .collect();
        // Stable, so archive order is kept within one nesting level
        files.sort_by_key(|f| f.nesting_factor());

        let mut indexed_files: HashMap<Hash, Vec<Arc<VirtualFile>>> = HashMap::new();
        for file in files {
            indexed_files.entry(file.hash).or_default().push(Arc::clone(file));
        }

        self.indexed_files = indexed_files;
        self.indexed_archives = archives;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn index(&self) -> &IndexRoot {
        &self.index
    }

    pub fn indexed_archives(&self) -> &[IndexedArchive] {
        &self.indexed_archives
    }

    /// Files inside indexed archives with this hash, shallowest first
    pub fn indexed_files(&self, hash: Hash) -> &[Arc<VirtualFile>] {
        self.indexed_files.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Path of `file` relative to the archive on disk that contains it
    pub fn archive_hash_path(&self, file: &VirtualFile) -> Option<HashRelativePath> {
        let archive = self.index.top_parent_of(file)?;
        Some(HashRelativePath::new(archive.hash, file.full_path.parts.clone()))
    }

    /// Embed `data` in the output folder and return its id
    ///
    /// The id is derived from the content, so including the same bytes twice
    /// writes the blob once and returns the same id.
    pub fn include_file(&self, data: &[u8]) -> Result<String, CompileError> {
        let id = hash_bytes(data).to_hex();

        let mut included = self.included.lock().unwrap_or_else(|e| e.into_inner());
        if included.contains(&id) {
            return Ok(id);
        }

        let path = self.config.output_folder.join(&id);
        fs::create_dir_all(&self.config.output_folder).map_err(|source| CompileError::FileIo {
            path: self.config.output_folder.clone(),
            source,
        })?;
        fs::write(&path, data).map_err(|source| CompileError::FileIo { path, source })?;
        included.insert(id.clone());

        debug!("Included {} bytes as {}", data.len(), id);
        Ok(id)
    }

    /// Ids of every blob written by [`include_file`](Self::include_file)
    pub fn included_ids(&self) -> Vec<String> {
        let included = self.included.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = included.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Record the embedded id of the banner or readme; each role can be
    /// recorded once per run
    pub fn record_property(&self, role: PropertyType, id: String) -> Result<(), CompileError> {
        let (cell, name) = match role {
            PropertyType::Banner => (&self.banner_id, "banner"),
            PropertyType::Readme => (&self.readme_id, "readme"),
        };
        cell.set(id)
            .map_err(|_| CompileError::PropertyAlreadyRecorded { role: name })
    }

    pub fn banner_id(&self) -> Option<&str> {
        self.banner_id.get().map(String::as_str)
    }

    pub fn readme_id(&self) -> Option<&str> {
        self.readme_id.get().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::WorkQueue;
    use tempfile::tempdir;

    fn context(output: &std::path::Path) -> CompilerContext {
        let config = CompilerConfig::default().with_output_folder(output);
        CompilerContext::new(Arc::new(config), IndexRoot::empty())
    }

    #[test]
    fn test_include_file_writes_each_blob_once() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        let first = ctx.include_file(b"banner bytes").unwrap();
        let path = dir.path().join(&first);
        std::fs::write(&path, b"tampered").unwrap();
        let second = ctx.include_file(b"banner bytes").unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&path).unwrap(), b"tampered");
        assert_eq!(ctx.included_ids(), vec![first]);
    }

    #[test]
    fn test_properties_are_write_once() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        ctx.record_property(PropertyType::Banner, "one".into()).unwrap();
        let err = ctx.record_property(PropertyType::Banner, "two".into()).unwrap_err();

        assert!(matches!(err, CompileError::PropertyAlreadyRecorded { role: "banner" }));
        assert_eq!(ctx.banner_id(), Some("one"));
        assert_eq!(ctx.readme_id(), None);
        ctx.record_property(PropertyType::Readme, "r".into()).unwrap();
        assert_eq!(ctx.readme_id(), Some("r"));
    }

    #[test]
    fn test_indexed_files_are_ordered_by_nesting() {
        let queue = WorkQueue::new(2).unwrap();
        let deep = VirtualFile::new_root("/dl/deep.zip", Hash(10), 10, 0);
        let inner = deep.child("inner.zip", Hash(11), 5);
        let leaf = inner.child("a.esp", Hash(42), 1);
        let inner = inner.with_children(vec![leaf]);
        let deep = Arc::new(deep.with_children(vec![inner]));

        let shallow = VirtualFile::new_root("/dl/shallow.zip", Hash(20), 10, 0);
        let leaf = shallow.child("a.esp", Hash(42), 1);
        let shallow = Arc::new(shallow.with_children(vec![leaf]));

        let index = IndexRoot::empty()
            .integrate(vec![Arc::clone(&deep), Arc::clone(&shallow)], &queue)
            .unwrap();
        let archives = vec![
            IndexedArchive { file: deep, name: "deep.zip".into(), meta: String::new() },
            IndexedArchive { file: shallow, name: "shallow.zip".into(), meta: String::new() },
        ];
        let ctx = CompilerContext::new(Arc::new(CompilerConfig::default()), index).with_indexed_archives(archives);

        let matches = ctx.indexed_files(Hash(42));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].nesting_factor(), 1);
        assert_eq!(matches[1].nesting_factor(), 2);

        let path = ctx.archive_hash_path(&matches[1]).unwrap();
        assert_eq!(path.hash, Hash(10));
        assert_eq!(path.parts, vec!["inner.zip", "a.esp"]);
        assert!(ctx.indexed_files(Hash(99)).is_empty());
    }
}
