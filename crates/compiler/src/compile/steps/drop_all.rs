//! Catch-all last step

use crate::compile::context::CompilerContext;
use crate::compile::error::CompileError;
use crate::compile::source::RawSourceFile;
use crate::compile::stack::StepState;
use crate::compile::step::{CompilationStep, NO_MATCH_REASON};
use crate::directives::Directive;

/// Claims every file as `NoMatch`
#[derive(Debug, Default, Clone, Copy)]
pub struct DropAll;

impl CompilationStep for DropAll {
    fn name(&self) -> &'static str {
        "DropAll"
    }

    fn run(&self, _ctx: &CompilerContext, source: &RawSourceFile) -> Result<Option<Directive>, CompileError> {
        Ok(Some(source.no_match(NO_MATCH_REASON).into()))
    }

    fn state(&self) -> StepState {
        StepState::DropAll
    }
}
