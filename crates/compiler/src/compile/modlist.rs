//! Modlist output

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compile::error::CompileError;
use crate::compile::source::IndexedArchive;
use crate::directives::Directive;
use crate::vfs::Hash;

/// A downloaded archive the installer has to fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    #[serde(rename = "Hash")]
    pub hash: Hash,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Size")]
    pub size: u64,
    /// Raw `.meta` contents describing where the archive came from
    #[serde(rename = "Meta")]
    pub meta: String,
}

impl From<&IndexedArchive> for Archive {
    fn from(archive: &IndexedArchive) -> Self {
        Self {
            hash: archive.hash(),
            name: archive.name.clone(),
            size: archive.file.size,
            meta: archive.meta.clone(),
        }
    }
}

/// The compiled modlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModList {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Description")]
    pub description: String,
    /// Embedded id of the readme, or the configured value when none was embedded
    #[serde(rename = "Readme")]
    pub readme: String,
    /// Embedded id of the banner image
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "Archives")]
    pub archives: Vec<Archive>,
    #[serde(rename = "Directives")]
    pub directives: Vec<Directive>,
}

impl ModList {
    /// Write as pretty-printed JSON, creating parent folders as needed
    pub fn export(&self, path: &Path) -> Result<(), CompileError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CompileError::FileIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = File::create(path).map_err(|source| CompileError::FileIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let json = fs::read_to_string(path).map_err(|source| CompileError::FileIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Total bytes of every archive the installer must download
    pub fn download_size(&self) -> u64 {
        self.archives.iter().map(|a| a.size).sum()
    }

    /// Total bytes the directives install
    pub fn install_size(&self) -> u64 {
        self.directives.iter().map(Directive::size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::{FromArchive, InlineFileDirective};
    use crate::vfs::HashRelativePath;
    use tempfile::tempdir;

    fn sample() -> ModList {
        ModList {
            name: "Test List".into(),
            author: "someone".into(),
            archives: vec![Archive {
                hash: Hash(9),
                name: "mod.zip".into(),
                size: 100,
                meta: "[General]\ngameName=skyrim\n".into(),
            }],
            directives: vec![
                FromArchive::new("a.esp".into(), Hash(1), 10, HashRelativePath::new(Hash(9), vec!["a.esp".into()]))
                    .into(),
                InlineFileDirective::new("b.ini".into(), Hash(2), 5, "0200000000000000".into()).into(),
            ],
            ..ModList::default()
        }
    }

    #[test]
    fn test_export_writes_pascal_case_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/modlist.json");
        sample().export(&path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["Name"], "Test List");
        assert_eq!(json["Archives"][0]["Name"], "mod.zip");
        assert_eq!(json["Directives"][1]["$type"], "InlineFile");
        assert_eq!(ModList::load(&path).unwrap(), sample());
    }

    #[test]
    fn test_sizes() {
        let list = sample();
        assert_eq!(list.download_size(), 100);
        assert_eq!(list.install_size(), 15);
    }
}
