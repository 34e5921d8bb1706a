//! Ignore by path prefix

use crate::compile::context::CompilerContext;
use crate::compile::error::CompileError;
use crate::compile::source::RawSourceFile;
use crate::compile::stack::StepState;
use crate::compile::step::CompilationStep;
use crate::directives::Directive;

#[derive(Debug, Clone)]
pub struct IgnoreStartsWith {
    prefix: String,
    reason: String,
}

impl IgnoreStartsWith {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            reason: format!("Ignored because path starts with {}", prefix),
            prefix,
        }
    }
}

impl CompilationStep for IgnoreStartsWith {
    fn name(&self) -> &'static str {
        "IgnoreStartsWith"
    }

    fn run(&self, _ctx: &CompilerContext, source: &RawSourceFile) -> Result<Option<Directive>, CompileError> {
        if !source.path.starts_with(&self.prefix) {
            return Ok(None);
        }
        Ok(Some(source.ignored(self.reason.as_str()).into()))
    }

    fn state(&self) -> StepState {
        StepState::IgnoreStartsWith {
            prefix: self.prefix.clone(),
        }
    }
}
