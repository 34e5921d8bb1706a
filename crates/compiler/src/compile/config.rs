//! Configuration types for the compiler

use std::path::{Path, PathBuf};

use crate::compile::error::CompileError;

/// Name of the subfolder game files are installed under
pub const GAME_FOLDER_FILES_DIR: &str = "Game Folder Files";

/// User-provided stack definition, looked up in the stack folder
pub const STACK_FILE_NAME: &str = "compilation_stack.yml";

/// Stack written out for reference when no user definition exists
pub const CURRENT_STACK_FILE_NAME: &str = "_current_compilation_stack.yml";

/// Configuration for a compilation run
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Installed game, indexed and emitted under [`GAME_FOLDER_FILES_DIR`]
    pub game_folder: PathBuf,
    /// Mod manager staging folder
    pub staging_folder: PathBuf,
    /// Downloaded archives and their `.meta` files
    pub downloads_folder: PathBuf,
    /// Additional folders to index, skipped when missing
    pub extra_folders: Vec<PathBuf>,
    /// Wiped at the start of every run
    pub output_folder: PathBuf,
    pub output_file: String,
    /// Where `compilation_stack.yml` is read from; defaults to the downloads folder
    pub stack_folder: Option<PathBuf>,
    /// File name of the deployment manifest searched for under the game folder
    pub deployment_file_name: String,

    pub name: String,
    pub author: String,
    pub description: String,
    pub website: String,
    pub banner_image: Option<PathBuf>,
    pub readme: Option<PathBuf>,

    /// Write the modlist even when some files have no match
    pub ignore_missing_files: bool,
    /// Worker threads, 0 for one per CPU
    pub worker_threads: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            game_folder: PathBuf::new(),
            staging_folder: PathBuf::new(),
            downloads_folder: PathBuf::new(),
            extra_folders: Vec::new(),
            output_folder: PathBuf::from("output_folder"),
            output_file: "modlist.json".to_string(),
            stack_folder: None,
            deployment_file_name: "vortex.deployment.json".to_string(),
            name: String::new(),
            author: String::new(),
            description: String::new(),
            website: String::new(),
            banner_image: None,
            readme: None,
            ignore_missing_files: false,
            worker_threads: 0,
        }
    }
}

impl CompilerConfig {
    pub fn new(
        game_folder: impl Into<PathBuf>,
        staging_folder: impl Into<PathBuf>,
        downloads_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            game_folder: game_folder.into(),
            staging_folder: staging_folder.into(),
            downloads_folder: downloads_folder.into(),
            ..Self::default()
        }
    }

    pub fn with_output_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.output_folder = folder.into();
        self
    }

    pub fn with_output_file(mut self, file: impl Into<String>) -> Self {
        self.output_file = file.into();
        self
    }

    pub fn with_extra_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.extra_folders.push(folder.into());
        self
    }

    pub fn with_stack_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.stack_folder = Some(folder.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = website.into();
        self
    }

    pub fn with_banner_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.banner_image = Some(path.into());
        self
    }

    pub fn with_readme(mut self, path: impl Into<PathBuf>) -> Self {
        self.readme = Some(path.into());
        self
    }

    pub fn with_ignore_missing_files(mut self, ignore: bool) -> Self {
        self.ignore_missing_files = ignore;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Folder holding the compilation stack files
    pub fn stack_folder(&self) -> &Path {
        self.stack_folder.as_deref().unwrap_or(&self.downloads_folder)
    }

    /// Full path of the modlist file
    pub fn output_path(&self) -> PathBuf {
        self.output_folder.join(&self.output_file)
    }

    /// Name written into the modlist, derived from the game folder when unset
    pub fn modlist_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        let game = self
            .game_folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("ModList for {}", game)
    }

    /// Build a configuration from `COMPILER_*` environment variables,
    /// loading a `.env` file first if one is present
    pub fn from_env() -> Result<Self, CompileError> {
        dotenv::dotenv().ok(); // Ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup, starting from defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CompileError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_lookup(lookup)?;
        Ok(config)
    }

    /// Overlay values found through `lookup` onto this configuration
    pub fn apply_lookup<F>(&mut self, lookup: F) -> Result<(), CompileError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("COMPILER_GAME_FOLDER") {
            self.game_folder = v.into();
        }
        if let Some(v) = lookup("COMPILER_STAGING_FOLDER") {
            self.staging_folder = v.into();
        }
        if let Some(v) = lookup("COMPILER_DOWNLOADS_FOLDER") {
            self.downloads_folder = v.into();
        }
        if let Some(v) = lookup("COMPILER_EXTRA_FOLDERS") {
            self.extra_folders = std::env::split_paths(&v).collect();
        }
        if let Some(v) = lookup("COMPILER_OUTPUT_FOLDER") {
            self.output_folder = v.into();
        }
        if let Some(v) = lookup("COMPILER_OUTPUT_FILE") {
            self.output_file = v;
        }
        if let Some(v) = lookup("COMPILER_STACK_FOLDER") {
            self.stack_folder = Some(v.into());
        }
        if let Some(v) = lookup("COMPILER_MODLIST_NAME") {
            self.name = v;
        }
        if let Some(v) = lookup("COMPILER_MODLIST_AUTHOR") {
            self.author = v;
        }
        if let Some(v) = lookup("COMPILER_MODLIST_DESCRIPTION") {
            self.description = v;
        }
        if let Some(v) = lookup("COMPILER_MODLIST_WEBSITE") {
            self.website = v;
        }
        if let Some(v) = lookup("COMPILER_BANNER_IMAGE") {
            self.banner_image = Some(v.into());
        }
        if let Some(v) = lookup("COMPILER_README") {
            self.readme = Some(v.into());
        }
        if let Some(v) = lookup("COMPILER_IGNORE_MISSING_FILES") {
            self.ignore_missing_files = parse_bool("COMPILER_IGNORE_MISSING_FILES", &v)?;
        }
        if let Some(v) = lookup("COMPILER_WORKER_THREADS") {
            self.worker_threads = v.trim().parse().map_err(|_| {
                CompileError::Configuration(format!("COMPILER_WORKER_THREADS must be a number, got '{}'", v))
            })?;
        }
        Ok(())
    }

    /// Check that the folders exist and that the output folder cannot
    /// overlap anything that gets indexed
    pub fn validate(&self) -> Result<(), CompileError> {
        for (label, folder) in [
            ("game", &self.game_folder),
            ("staging", &self.staging_folder),
            ("downloads", &self.downloads_folder),
        ] {
            if folder.as_os_str().is_empty() {
                return Err(CompileError::Configuration(format!("No {} folder configured", label)));
            }
            if !folder.is_dir() {
                return Err(CompileError::Configuration(format!(
                    "The {} folder '{}' does not exist",
                    label,
                    folder.display()
                )));
            }
        }

        if self.output_file.trim().is_empty() {
            return Err(CompileError::Configuration("Output file name is empty".to_string()));
        }
        if self.output_folder.as_os_str().is_empty() {
            return Err(CompileError::Configuration("No output folder configured".to_string()));
        }

        let inputs = [&self.game_folder, &self.staging_folder, &self.downloads_folder]
            .into_iter()
            .chain(self.extra_folders.iter());
        for input in inputs {
            if self.output_folder.starts_with(input) || input.starts_with(&self.output_folder) {
                return Err(CompileError::Configuration(format!(
                    "Output folder '{}' overlaps indexed folder '{}'",
                    self.output_folder.display(),
                    input.display()
                )));
            }
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, CompileError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(CompileError::Configuration(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}
