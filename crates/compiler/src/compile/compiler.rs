//! The compilation pipeline
//!
//! [`Compiler::compile`] runs these phases in order, checking for
//! cancellation between each:
//!
//! 1. Parse the deployment manifest, if any
//! 2. Clean the output folder
//! 3. Index the staging, game, downloads and extra folders
//! 4. Gather source files and their destination paths
//! 5. Abort when two sources share a destination
//! 6. Index the downloaded archives
//! 7. Load or create the compilation stack
//! 8. Run every source through the stack on the work queue
//! 9. Apply the no-match policy and drop ignored files
//! 10. Select the archives the directives reference and export the modlist

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::compile::config::{CompilerConfig, GAME_FOLDER_FILES_DIR};
use crate::compile::context::CompilerContext;
use crate::compile::deployment::DeploymentManifest;
use crate::compile::error::CompileError;
use crate::compile::modlist::{Archive, ModList};
use crate::compile::source::{IndexedArchive, RawSourceFile};
use crate::compile::stack::{create_steps, load_or_create_stack};
use crate::compile::step::{CompilationStep, run_stack};
use crate::directives::Directive;
use crate::queue::{TaskError, WorkQueue};
use crate::vfs::{ArchiveExtractor, Context, IndexRoot, ZipExtractor};

/// Sources that would all be installed to the same path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub path: String,
    pub sources: Vec<PathBuf>,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct CompileSummary {
    pub modlist: ModList,
    pub output_path: PathBuf,
    /// Destinations that had no match, only non-empty when missing files were allowed
    pub unmatched: Vec<String>,
    /// Number of files dropped as ignored
    pub ignored: usize,
    /// Ids of the data blobs written next to the modlist, sorted
    pub embedded: Vec<String>,
}

/// Group sources by destination and return every contested destination,
/// in the order each was first seen
pub fn find_duplicates(sources: &[RawSourceFile]) -> Vec<DuplicateGroup> {
    let mut groups: Vec<DuplicateGroup> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for source in sources {
        match positions.get(source.path.as_str()) {
            Some(&index) => groups[index].sources.push(source.absolute_path().to_path_buf()),
            None => {
                positions.insert(source.path.as_str(), groups.len());
                groups.push(DuplicateGroup {
                    path: source.path.clone(),
                    sources: vec![source.absolute_path().to_path_buf()],
                });
            }
        }
    }

    groups.retain(|g| g.sources.len() > 1);
    groups
}

/// Turns a set of folders into a modlist
pub struct Compiler {
    config: Arc<CompilerConfig>,
    queue: Arc<WorkQueue>,
    extractor: Arc<dyn ArchiveExtractor>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .field("queue", &self.queue)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Compiler {
    /// Create a compiler that runs on `queue`
    ///
    /// Cancelling the queue also cancels the compiler.
    pub fn new(config: CompilerConfig, queue: Arc<WorkQueue>) -> Self {
        let cancel = queue.cancellation_token().child_token();
        Self {
            config: Arc::new(config),
            queue,
            extractor: Arc::new(ZipExtractor),
            cancel,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    fn check_cancelled(&self) -> Result<(), CompileError> {
        if self.cancel.is_cancelled() {
            info!("Compilation cancelled");
            return Err(CompileError::Cancelled);
        }
        Ok(())
    }

    /// Run the whole pipeline and write the modlist
    pub fn compile(&self) -> Result<CompileSummary, CompileError> {
        self.check_cancelled()?;
        self.config.validate()?;
        let config = &self.config;

        info!(
            "Starting compilation for {} with staging folder at {} and downloads folder at {}",
            config.game_folder.display(),
            config.staging_folder.display(),
            config.downloads_folder.display()
        );

        let active_archives: HashSet<String> =
            DeploymentManifest::discover(&config.game_folder, &config.deployment_file_name)
                .map(|d| d.active_archives().into_iter().collect())
                .unwrap_or_default();
        if !active_archives.is_empty() {
            info!("Deployment manifest lists {} active mods", active_archives.len());
        }

        self.check_cancelled()?;
        info!("Cleaning output folder");
        clean_folder(&config.output_folder)?;

        let index = self.index_folders()?;

        self.check_cancelled()?;
        info!("Searching for mod files");
        let mut sources = gather_sources(&index, &config.staging_folder, None);
        sources.extend(gather_sources(&index, &config.downloads_folder, None));
        sources.extend(gather_sources(&index, &config.game_folder, Some(GAME_FOLDER_FILES_DIR)));
        info!("Found {} files to build into mod list", sources.len());

        info!("Verifying destinations");
        let duplicates = find_duplicates(&sources);
        if !duplicates.is_empty() {
            for group in &duplicates {
                let from: Vec<String> = group.sources.iter().map(|p| p.display().to_string()).collect();
                error!("Duplicate files installed to {} from: {}", group.path, from.join(", "));
            }
            error!("Found {} duplicates, exiting", duplicates.len());
            return Err(CompileError::DuplicateDestinations {
                count: duplicates.len(),
            });
        }

        info!("Indexing archives");
        let archives = index_archives(&index, &config.downloads_folder, &active_archives)?;
        info!("Found {} archives", archives.len());
        let ctx = Arc::new(CompilerContext::new(Arc::clone(&self.config), index).with_indexed_archives(archives));

        let states = load_or_create_stack(config.stack_folder())?;
        let steps = Arc::new(create_steps(&states, &ctx)?);

        self.check_cancelled()?;
        info!("Running compilation stack ({} steps)", steps.len());
        let results = self.run_stack_parallel(steps, Arc::clone(&ctx), sources)?;

        let unmatched: Vec<String> = results
            .iter()
            .filter(|d| d.is_no_match())
            .map(|d| d.to().to_string())
            .collect();
        info!("No match for {} files", unmatched.len());
        for path in &unmatched {
            info!("     {}", path);
        }
        if !unmatched.is_empty() {
            if config.ignore_missing_files {
                info!("Continuing even though files were missing at the request of the user.");
            } else {
                info!("Exiting due to no way to compile these files");
                return Err(CompileError::UnmatchedFiles {
                    count: unmatched.len(),
                    files: unmatched,
                });
            }
        }

        let total = results.len();
        let directives: Vec<Directive> = results.into_iter().filter(|d| !d.is_ignored()).collect();
        let ignored = total - directives.len();
        debug!("Dropped {} ignored files", ignored);

        self.check_cancelled()?;
        let archives = select_archives(&ctx, &directives);

        let modlist = ModList {
            name: config.modlist_name(),
            author: config.author.clone(),
            description: config.description.clone(),
            readme: property_value(ctx.readme_id(), config.readme.as_deref()),
            image: property_value(ctx.banner_id(), config.banner_image.as_deref()),
            website: config.website.clone(),
            archives,
            directives,
        };

        let output_path = config.output_path();
        modlist.export(&output_path)?;
        let embedded = ctx.included_ids();
        info!(
            "Done building modlist: {} directives ({} embedded) from {} archives written to {}",
            modlist.directives.len(),
            modlist.directives.iter().filter(|d| d.is_inline()).count(),
            modlist.archives.len(),
            output_path.display()
        );

        Ok(CompileSummary {
            modlist,
            output_path,
            unmatched,
            ignored,
            embedded,
        })
    }

    fn index_folders(&self) -> Result<IndexRoot, CompileError> {
        let config = &self.config;
        let mut vfs = Context::new(Arc::clone(&self.queue)).with_extractor(Arc::clone(&self.extractor));

        for folder in [&config.staging_folder, &config.game_folder, &config.downloads_folder] {
            self.check_cancelled()?;
            info!("Indexing {}", folder.display());
            vfs.add_root(folder)?;
        }

        for folder in &config.extra_folders {
            self.check_cancelled()?;
            if !folder.is_dir() {
                warn!("Extra folder {} does not exist, skipping", folder.display());
                continue;
            }
            info!("Indexing {}", folder.display());
            vfs.add_root(folder)?;
        }

        Ok(vfs.index().clone())
    }

    fn run_stack_parallel(
        &self,
        steps: Arc<Vec<Box<dyn CompilationStep>>>,
        ctx: Arc<CompilerContext>,
        sources: Vec<RawSourceFile>,
    ) -> Result<Vec<Directive>, CompileError> {
        let total = sources.len().max(1);
        let done = Arc::new(AtomicUsize::new(0));
        let reporter = self.queue.reporter();
        let cancel = self.cancel.clone();
        let fallback = sources.clone();

        let results = self.queue.parallel_map(sources, move |source| {
            if cancel.is_cancelled() {
                return None;
            }
            let progress = done.fetch_add(1, Ordering::Relaxed) * 100 / total;
            reporter.report(format!("Compiling {}", source.path), progress as u8);
            Some(run_stack(&steps, &ctx, &source))
        });

        results
            .into_iter()
            .zip(fallback)
            .map(|(result, source)| match result {
                Ok(Some(directive)) => Ok(directive),
                Ok(None) | Err(TaskError::Cancelled) => Err(CompileError::Cancelled),
                Err(TaskError::Panicked(msg)) => {
                    warn!("Compilation stack panicked on {}: {}", source.path, msg);
                    Ok(source.no_match(format!("Compilation stack panicked: {}", msg)).into())
                }
            })
            .collect()
    }
}

/// Embedded id when one was recorded, else the configured path
fn property_value(id: Option<&str>, configured: Option<&Path>) -> String {
    match (id, configured) {
        (Some(id), _) => id.to_string(),
        (None, Some(path)) => path.display().to_string(),
        (None, None) => String::new(),
    }
}

fn clean_folder(folder: &Path) -> Result<(), CompileError> {
    if folder.exists() {
        fs::remove_dir_all(folder).map_err(|source| CompileError::FileIo {
            path: folder.to_path_buf(),
            source,
        })?;
    }
    fs::create_dir_all(folder).map_err(|source| CompileError::FileIo {
        path: folder.to_path_buf(),
        source,
    })
}

/// Every indexed file under `root`, with its destination relative to `root`
/// and optionally placed under `prefix`
fn gather_sources(index: &IndexRoot, root: &Path, prefix: Option<&str>) -> Vec<RawSourceFile> {
    let mut sources = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) if entry.file_type().is_file() => entry,
            Ok(_) => continue,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        let Some(file) = index.file_at_root(entry.path()) else {
            warn!("{} was not indexed, skipping", entry.path().display());
            continue;
        };

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let path = match prefix {
            Some(prefix) => format!("{}/{}", prefix, relative),
            None => relative,
        };

        sources.push(RawSourceFile::new(Arc::clone(file), path));
    }

    sources
}

/// Downloads with a `.meta` file next to them, restricted to `active` when
/// it is non-empty
fn index_archives(
    index: &IndexRoot,
    downloads: &Path,
    active: &HashSet<String>,
) -> Result<Vec<IndexedArchive>, CompileError> {
    let entries = fs::read_dir(downloads).map_err(|source| CompileError::FileIo {
        path: downloads.to_path_buf(),
        source,
    })?;

    let mut archives = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().is_some_and(|e| e == "meta") {
            continue;
        }

        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        let meta_path = downloads.join(format!("{}.meta", name));
        if !meta_path.is_file() {
            continue;
        }

        let Some(file) = index.file_at_root(&path) else {
            warn!("Archive {} was not indexed, skipping", path.display());
            continue;
        };
        let meta = fs::read_to_string(&meta_path).map_err(|source| CompileError::FileIo {
            path: meta_path.clone(),
            source,
        })?;

        let archive = IndexedArchive {
            file: Arc::clone(file),
            name,
            meta,
        };
        if !active.is_empty() && !active.contains(&archive.name) && !active.contains(archive.stem()) {
            debug!("Archive {} is not deployed, skipping", archive.name);
            continue;
        }
        archives.push(archive);
    }

    archives.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(archives)
}

/// Archives referenced by at least one `FromArchive` directive
fn select_archives(ctx: &CompilerContext, directives: &[Directive]) -> Vec<Archive> {
    let used: HashSet<_> = directives
        .iter()
        .filter_map(|d| match d {
            Directive::FromArchive(d) => Some(d.archive_hash()),
            _ => None,
        })
        .collect();

    let mut seen = HashSet::new();
    let selected: Vec<Archive> = ctx
        .indexed_archives()
        .iter()
        .filter(|a| used.contains(&a.hash()) && seen.insert(a.hash()))
        .map(Archive::from)
        .collect();

    if selected.len() < used.len() {
        warn!(
            "{} referenced archives could not be found among the downloads",
            used.len() - selected.len()
        );
    }
    selected
}
