//! Path keys for the virtual file system

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::vfs::error::VfsError;
use crate::vfs::hash::Hash;

/// Normalize a path inside an archive to `/` separators without a leading slash
pub fn normalize_part(part: &str) -> String {
    part.replace('\\', "/").trim_start_matches('/').to_string()
}

/// Stable identity of a file in the forest: the real root on disk plus the
/// chain of entry names through every enclosing archive
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullPath {
    pub base: PathBuf,
    pub parts: Vec<String>,
}

impl FullPath {
    /// Key of a real file on disk
    pub fn root(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            parts: Vec::new(),
        }
    }

    /// Key of an entry extracted from the file at `self`
    pub fn join(&self, part: &str) -> Self {
        let mut parts = self.parts.clone();
        parts.push(normalize_part(part));
        Self {
            base: self.base.clone(),
            parts,
        }
    }

    /// Key of the enclosing archive, `None` for roots
    pub fn parent(&self) -> Option<FullPath> {
        let (_, rest) = self.parts.split_last()?;
        Some(Self {
            base: self.base.clone(),
            parts: rest.to_vec(),
        })
    }

    pub fn is_root(&self) -> bool {
        self.parts.is_empty()
    }

    /// Key of the real file that ultimately contains this entry
    pub fn top(&self) -> FullPath {
        FullPath::root(self.base.clone())
    }

    pub fn depth(&self) -> usize {
        self.parts.len()
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl fmt::Display for FullPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base.display())?;
        for part in &self.parts {
            write!(f, "|{}", part)?;
        }
        Ok(())
    }
}

/// Reference to a file inside a downloaded archive: the archive's hash plus
/// the entry name at every nesting level
///
/// Serialized as `[hash, part, part, ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct HashRelativePath {
    pub hash: Hash,
    pub parts: Vec<String>,
}

impl HashRelativePath {
    pub fn new(hash: Hash, parts: Vec<String>) -> Self {
        Self {
            hash,
            parts: parts.iter().map(|p| normalize_part(p)).collect(),
        }
    }

    /// Build from a `|`-separated path where each segment is one nesting level
    pub fn from_string(hash: Hash, path: &str) -> Self {
        let parts = path
            .split('|')
            .filter(|p| !p.is_empty())
            .map(normalize_part)
            .collect();
        Self { hash, parts }
    }
}

impl From<HashRelativePath> for Vec<String> {
    fn from(path: HashRelativePath) -> Self {
        std::iter::once(path.hash.to_string())
            .chain(path.parts)
            .collect()
    }
}

impl TryFrom<Vec<String>> for HashRelativePath {
    type Error = VfsError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        let mut iter = value.into_iter();
        let hash = iter
            .next()
            .ok_or_else(|| VfsError::InvalidHash {
                value: String::new(),
                reason: "Archive hash path is empty".to_string(),
            })?
            .parse()?;
        Ok(Self::new(hash, iter.collect()))
    }
}

impl fmt::Display for HashRelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hash)?;
        for part in &self.parts {
            write!(f, "|{}", part)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_path_parent_chain() {
        let root = FullPath::root("/downloads/mod.zip");
        let inner = root.join("data\\inner.bsa").join("textures/a.dds");

        assert_eq!(inner.depth(), 2);
        assert_eq!(inner.parts, vec!["data/inner.bsa", "textures/a.dds"]);
        assert_eq!(inner.parent(), Some(root.join("data/inner.bsa")));
        assert_eq!(inner.top(), root);
        assert_eq!(root.parent(), None);
        assert_eq!(inner.to_string(), "/downloads/mod.zip|data/inner.bsa|textures/a.dds");
    }

    #[test]
    fn test_hash_relative_path_wire_shape() {
        let path = HashRelativePath::new(Hash(7), vec!["a\\b.esp".to_string()]);
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, serde_json::json!([Hash(7).to_string(), "a/b.esp"]));

        let back: HashRelativePath = serde_json::from_value(json).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn test_empty_hash_path_is_rejected() {
        let result: Result<HashRelativePath, _> = serde_json::from_str("[]");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_string_splits_nesting_levels() {
        let path = HashRelativePath::from_string(Hash(1), "inner.zip|meshes\\a.nif");
        assert_eq!(path.parts, vec!["inner.zip", "meshes/a.nif"]);
    }
}
