//! Ignore by regular expression

use regex::Regex;

use crate::compile::context::CompilerContext;
use crate::compile::error::CompileError;
use crate::compile::source::RawSourceFile;
use crate::compile::stack::StepState;
use crate::compile::step::CompilationStep;
use crate::directives::Directive;

/// Ignores files whose destination path matches `pattern`
#[derive(Debug, Clone)]
pub struct IgnoreRegex {
    regex: Regex,
    reason: String,
}

impl IgnoreRegex {
    pub fn new(pattern: &str) -> Result<Self, CompileError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            reason: format!("Ignored because path matches regex {}", pattern),
        })
    }
}

impl CompilationStep for IgnoreRegex {
    fn name(&self) -> &'static str {
        "IgnoreRegex"
    }

    fn run(&self, _ctx: &CompilerContext, source: &RawSourceFile) -> Result<Option<Directive>, CompileError> {
        if !self.regex.is_match(&source.path) {
            return Ok(None);
        }
        Ok(Some(source.ignored(self.reason.as_str()).into()))
    }

    fn state(&self) -> StepState {
        StepState::IgnoreRegex {
            pattern: self.regex.as_str().to_string(),
        }
    }
}
