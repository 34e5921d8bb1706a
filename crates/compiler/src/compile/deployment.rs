//! Mod manager deployment manifest
//!
//! The mod manager records which staged mod every deployed file came from.
//! The compiler only uses the set of source mods, to restrict which
//! downloads count as archives for this modlist.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::compile::error::CompileError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentManifest {
    #[serde(default)]
    pub instance: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub deployment_method: String,
    #[serde(default)]
    pub files: Vec<DeployedFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedFile {
    /// Path relative to the deployment target
    pub rel_path: String,
    /// Staged mod the file was deployed from
    pub source: String,
    #[serde(default)]
    pub target: String,
}

impl DeploymentManifest {
    pub fn from_json(json: &str) -> Result<Self, CompileError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let json = fs::read_to_string(path).map_err(|source| CompileError::FileIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Locate `file_name` anywhere under `folder`; the last match wins
    pub fn find(folder: &Path, file_name: &str) -> Option<PathBuf> {
        WalkDir::new(folder)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && e.file_name() == file_name)
            .map(|e| e.into_path())
            .last()
    }

    /// Find and parse the manifest under `folder`
    ///
    /// A missing manifest is normal; a malformed one is logged and ignored.
    pub fn discover(folder: &Path, file_name: &str) -> Option<Self> {
        info!("Searching for {}...", file_name);
        let Some(path) = Self::find(folder, file_name) else {
            info!("{} not found!", file_name);
            return None;
        };

        info!("Parsing {}...", path.display());
        match Self::load(&path) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!("Failed to parse {}, continuing without it: {}", path.display(), e);
                None
            }
        }
    }

    /// Distinct source mods, in first-seen order
    pub fn active_archives(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.files
            .iter()
            .filter(|f| !f.source.is_empty() && seen.insert(f.source.as_str()))
            .map(|f| f.source.clone())
            .collect()
    }
}
