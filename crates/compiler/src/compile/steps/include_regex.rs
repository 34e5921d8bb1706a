//! Embed files matching a regular expression

use std::fs;

use regex::Regex;

use crate::compile::context::CompilerContext;
use crate::compile::error::CompileError;
use crate::compile::source::RawSourceFile;
use crate::compile::stack::StepState;
use crate::compile::step::CompilationStep;
use crate::directives::{Directive, InlineFileDirective};

/// Embeds the bytes of every file whose destination path matches `pattern`
/// into the modlist
#[derive(Debug, Clone)]
pub struct IncludeRegex {
    regex: Regex,
}

impl IncludeRegex {
    pub fn new(pattern: &str) -> Result<Self, CompileError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl CompilationStep for IncludeRegex {
    fn name(&self) -> &'static str {
        "IncludeRegex"
    }

    fn run(&self, ctx: &CompilerContext, source: &RawSourceFile) -> Result<Option<Directive>, CompileError> {
        if !self.regex.is_match(&source.path) {
            return Ok(None);
        }

        let data = fs::read(source.absolute_path()).map_err(|e| CompileError::FileIo {
            path: source.absolute_path().to_path_buf(),
            source: e,
        })?;
        let id = ctx.include_file(&data)?;

        Ok(Some(
            InlineFileDirective::new(source.path.clone(), source.hash(), source.size(), id).into(),
        ))
    }

    fn state(&self) -> StepState {
        StepState::IncludeRegex {
            pattern: self.regex.as_str().to_string(),
        }
    }
}
