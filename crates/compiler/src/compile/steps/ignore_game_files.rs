//! Skip files that ship with the game

use crate::compile::config::GAME_FOLDER_FILES_DIR;
use crate::compile::context::CompilerContext;
use crate::compile::error::CompileError;
use crate::compile::source::RawSourceFile;
use crate::compile::stack::StepState;
use crate::compile::step::CompilationStep;
use crate::directives::Directive;

/// Ignores everything under the game folder; those files are already on
/// the user's machine
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreGameFiles;

impl CompilationStep for IgnoreGameFiles {
    fn name(&self) -> &'static str {
        "IgnoreGameFiles"
    }

    fn run(&self, _ctx: &CompilerContext, source: &RawSourceFile) -> Result<Option<Directive>, CompileError> {
        let is_game_file = source
            .path
            .strip_prefix(GAME_FOLDER_FILES_DIR)
            .is_some_and(|rest| rest.starts_with('/'));
        if !is_game_file {
            return Ok(None);
        }
        Ok(Some(source.ignored("Default game file").into()))
    }

    fn state(&self) -> StepState {
        StepState::IgnoreGameFiles
    }
}
