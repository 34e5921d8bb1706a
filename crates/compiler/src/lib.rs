//! Compiler Library
//!
//! This library turns a modded game installation into a modlist: a JSON
//! document that tells an installer, for every file, which downloaded
//! archive (or embedded blob) its bytes come from.
//!
//! The crate is organized in four layers:
//!
//! - [`queue`]: a fixed pool of worker threads with an order-preserving
//!   `parallel_map`, a live status feed, and cooperative cancellation
//! - [`vfs`]: content-hashed virtual files, nested archive expansion, and the
//!   immutable [`IndexRoot`] snapshot with its lookups
//! - [`directives`]: the per-file instructions written into the modlist
//! - [`compile`]: the compilation step chain and the [`Compiler`] pipeline
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use compiler::{Compiler, CompilerConfig, WorkQueue};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), compiler::CompileError> {
//! let config = CompilerConfig::new("/games/Skyrim", "/vortex/skyrim/mods", "/vortex/downloads/skyrim")
//!     .with_output_folder("/modlists/my-list")
//!     .with_name("My List")
//!     .with_author("me");
//!
//! let queue = Arc::new(WorkQueue::new(config.worker_threads)?);
//!
//! // Watch what each worker is doing
//! let mut status = queue.subscribe();
//! std::thread::spawn(move || {
//!     while let Ok(update) = status.blocking_recv() {
//!         println!("[{}] {} {}%", update.id, update.msg, update.progress);
//!     }
//! });
//!
//! let summary = Compiler::new(config, queue).compile()?;
//! println!(
//!     "Wrote {} directives to {}",
//!     summary.modlist.directives.len(),
//!     summary.output_path.display()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Compilation stack
//!
//! Each source file is passed through an ordered list of steps; the first
//! step that returns a directive wins and a file no step claims becomes a
//! `NoMatch`. The default stack can be replaced by placing a
//! `compilation_stack.yml` in the stack folder:
//!
//! ```yaml
//! - $type: IncludePropertyFiles
//! - $type: IgnoreStartsWith
//!   Prefix: logs/
//! - $type: IncludeRegex
//!   Pattern: '\.ini$'
//! - $type: IgnoreGameFiles
//! - $type: DirectMatch
//! - $type: DropAll
//! ```

pub mod compile;
pub mod directives;
pub mod queue;
pub mod vfs;

pub use compile::{
    CompilationStep, CompileError, CompileSummary, Compiler, CompilerConfig, CompilerContext, ModList, StepState,
};
pub use directives::Directive;
pub use queue::{CpuStatus, QueueError, StatusReceiver, TaskError, WorkQueue};
pub use vfs::{Hash, HashRelativePath, IndexRoot, VfsError, VirtualFile};
