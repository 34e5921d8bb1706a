//! Ignore by path suffix

use crate::compile::context::CompilerContext;
use crate::compile::error::CompileError;
use crate::compile::source::RawSourceFile;
use crate::compile::stack::StepState;
use crate::compile::step::CompilationStep;
use crate::directives::Directive;

#[derive(Debug, Clone)]
pub struct IgnoreEndsWith {
    postfix: String,
    reason: String,
}

impl IgnoreEndsWith {
    pub fn new(postfix: impl Into<String>) -> Self {
        let postfix = postfix.into();
        Self {
            reason: format!("Ignored because path ends with {}", postfix),
            postfix,
        }
    }
}

impl CompilationStep for IgnoreEndsWith {
    fn name(&self) -> &'static str {
        "IgnoreEndsWith"
    }

    fn run(&self, _ctx: &CompilerContext, source: &RawSourceFile) -> Result<Option<Directive>, CompileError> {
        if !source.path.ends_with(&self.postfix) {
            return Ok(None);
        }
        Ok(Some(source.ignored(self.reason.as_str()).into()))
    }

    fn state(&self) -> StepState {
        StepState::IgnoreEndsWith {
            postfix: self.postfix.clone(),
        }
    }
}
