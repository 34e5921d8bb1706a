//! Command line front-end for the modlist compiler

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, debug, error, info};

use compiler::queue::RecvError;
use compiler::{Compiler, CompilerConfig, StatusReceiver, WorkQueue};

/// Compile a modded game installation into a modlist
#[derive(Debug, Parser)]
#[command(name = "modlist-compiler", version, about)]
struct Args {
    /// Game installation folder
    #[arg(long)]
    game: Option<PathBuf>,

    /// Mod manager staging folder
    #[arg(long)]
    staging: Option<PathBuf>,

    /// Folder holding the downloaded archives and their .meta files
    #[arg(long)]
    downloads: Option<PathBuf>,

    /// Additional folder to index (repeatable)
    #[arg(long = "extra")]
    extra_folders: Vec<PathBuf>,

    /// Output folder, wiped before every run
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Name of the modlist file inside the output folder
    #[arg(long)]
    output_file: Option<String>,

    /// Folder containing compilation_stack.yml
    #[arg(long)]
    stack_folder: Option<PathBuf>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    author: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    website: Option<String>,

    /// Banner image to embed
    #[arg(long)]
    banner: Option<PathBuf>,

    /// Readme to embed
    #[arg(long)]
    readme: Option<PathBuf>,

    /// Write the modlist even if some files have no match
    #[arg(long)]
    ignore_missing_files: bool,

    /// Worker threads, 0 for one per CPU
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Environment (and `.env`) first, then command line flags on top
    fn into_config(self) -> Result<CompilerConfig> {
        let mut config = CompilerConfig::from_env().context("Failed to read configuration from the environment")?;

        if let Some(game) = self.game {
            config.game_folder = game;
        }
        if let Some(staging) = self.staging {
            config.staging_folder = staging;
        }
        if let Some(downloads) = self.downloads {
            config.downloads_folder = downloads;
        }
        config.extra_folders.extend(self.extra_folders);
        if let Some(output) = self.output {
            config.output_folder = output;
        }
        if let Some(output_file) = self.output_file {
            config.output_file = output_file;
        }
        if let Some(stack_folder) = self.stack_folder {
            config.stack_folder = Some(stack_folder);
        }
        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(author) = self.author {
            config.author = author;
        }
        if let Some(description) = self.description {
            config.description = description;
        }
        if let Some(website) = self.website {
            config.website = website;
        }
        if self.banner.is_some() {
            config.banner_image = self.banner;
        }
        if self.readme.is_some() {
            config.readme = self.readme;
        }
        if self.ignore_missing_files {
            config.ignore_missing_files = true;
        }
        if let Some(threads) = self.threads {
            config.worker_threads = threads;
        }

        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();
}

/// Forward worker status updates to the debug log until the queue goes away
fn log_status(mut status: StatusReceiver) {
    loop {
        match status.blocking_recv() {
            Ok(update) if update.is_working => {
                debug!("[worker {}] {} ({}%)", update.id, update.msg, update.progress)
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => debug!("Status feed skipped {} updates", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.into_config()?;
    let queue = Arc::new(WorkQueue::new(config.worker_threads).context("Failed to start worker threads")?);
    info!("Using {} worker threads", queue.thread_count());

    let status = queue.subscribe();
    std::thread::spawn(move || log_status(status));

    let compiler = Compiler::new(config, Arc::clone(&queue));
    let summary = match compiler.compile() {
        Ok(summary) => summary,
        Err(e) => {
            error!("Compilation failed ({}): {}", e.category(), e);
            if e.is_user_error() {
                error!("Fix the modlist setup and run again");
            }
            return Err(e.into());
        }
    };

    if !summary.unmatched.is_empty() {
        info!("{} files had no match and were kept as NoMatch", summary.unmatched.len());
    }
    info!(
        "Modlist written to {} ({} archives, {} bytes to download, {} bytes installed, {} embedded files)",
        summary.output_path.display(),
        summary.modlist.archives.len(),
        summary.modlist.download_size(),
        summary.modlist.install_size(),
        summary.embedded.len()
    );

    queue.shutdown();
    Ok(())
}
