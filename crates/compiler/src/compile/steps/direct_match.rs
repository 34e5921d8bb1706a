//! Match files against the contents of downloaded archives

use tracing::trace;

use crate::compile::context::CompilerContext;
use crate::compile::error::CompileError;
use crate::compile::source::RawSourceFile;
use crate::compile::stack::StepState;
use crate::compile::step::CompilationStep;
use crate::directives::{Directive, FromArchive};

/// Claims files whose exact bytes exist inside an indexed archive
///
/// Among the archive entries with the same hash, one with the same file
/// name as the destination is preferred, then the shallowest.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectMatch;

impl CompilationStep for DirectMatch {
    fn name(&self) -> &'static str {
        "DirectMatch"
    }

    fn run(&self, ctx: &CompilerContext, source: &RawSourceFile) -> Result<Option<Directive>, CompileError> {
        let found = ctx.indexed_files(source.hash());
        if found.is_empty() {
            return Ok(None);
        }

        let target_name = source.path.rsplit('/').next().unwrap_or(&source.path);
        // `found` is already ordered shallowest first
        let candidate = found
            .iter()
            .find(|f| f.file_name() == target_name)
            .or_else(|| found.first());

        let Some(candidate) = candidate else {
            return Ok(None);
        };
        let Some(archive_hash_path) = ctx.archive_hash_path(candidate) else {
            return Ok(None);
        };

        trace!("{} matched {}", source.path, archive_hash_path);
        Ok(Some(
            FromArchive::new(source.path.clone(), source.hash(), source.size(), archive_hash_path).into(),
        ))
    }

    fn state(&self) -> StepState {
        StepState::DirectMatch
    }
}
