//! Skip files the installer itself leaves behind

use crate::compile::context::CompilerContext;
use crate::compile::error::CompileError;
use crate::compile::source::RawSourceFile;
use crate::compile::stack::StepState;
use crate::compile::step::CompilationStep;
use crate::directives::Directive;

const CRUFT_PREFIXES: &[&str] = &[
    "7z.dll",
    "7z.exe",
    "vfs_staged_files/",
    "nexus.key_cache",
    "patch_cache/",
    "nexus_link_cache/",
];

#[derive(Debug, Clone)]
pub struct IgnoreInstallCruft {
    prefixes: Vec<String>,
}

impl Default for IgnoreInstallCruft {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnoreInstallCruft {
    pub fn new() -> Self {
        Self {
            prefixes: CRUFT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl CompilationStep for IgnoreInstallCruft {
    fn name(&self) -> &'static str {
        "IgnoreInstallCruft"
    }

    fn run(&self, _ctx: &CompilerContext, source: &RawSourceFile) -> Result<Option<Directive>, CompileError> {
        let path = source.path.to_ascii_lowercase();
        if !self.prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return Ok(None);
        }
        Ok(Some(source.ignored("Installer cruft file").into()))
    }

    fn state(&self) -> StepState {
        StepState::IgnoreInstallCruft
    }
}
