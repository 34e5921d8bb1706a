//! Modlist compilation
//!
//! Sources are matched against downloaded archives by running each one
//! through an ordered stack of [`CompilationStep`]s; the first step to claim
//! a file decides its [`Directive`](crate::directives::Directive).

pub mod compiler;
pub mod config;
pub mod context;
pub mod deployment;
pub mod error;
pub mod modlist;
pub mod source;
pub mod stack;
pub mod step;
pub mod steps;

pub use compiler::{CompileSummary, Compiler, DuplicateGroup, find_duplicates};
pub use config::CompilerConfig;
pub use context::CompilerContext;
pub use deployment::{DeployedFile, DeploymentManifest};
pub use error::CompileError;
pub use modlist::{Archive, ModList};
pub use source::{IndexedArchive, RawSourceFile};
pub use stack::{StepState, default_stack, load_or_create_stack};
pub use step::{CompilationStep, run_stack};
