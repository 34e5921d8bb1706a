//! Embed the modlist banner and readme

use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::compile::config::CompilerConfig;
use crate::compile::context::CompilerContext;
use crate::compile::error::CompileError;
use crate::compile::source::RawSourceFile;
use crate::compile::stack::StepState;
use crate::compile::step::CompilationStep;
use crate::directives::{Directive, PropertyFileDirective, PropertyType};

/// Claims the configured banner image and readme
///
/// The file's bytes are embedded and the embedded id is recorded on the
/// context so the modlist can point at it. Files that are configured but do
/// not exist on disk are passed on to the next step.
#[derive(Debug, Clone, Default)]
pub struct IncludePropertyFiles {
    banner: Option<PathBuf>,
    readme: Option<PathBuf>,
}

impl IncludePropertyFiles {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            banner: config.banner_image.clone(),
            readme: config.readme.clone(),
        }
    }

    fn role_of(&self, source: &RawSourceFile) -> Option<PropertyType> {
        let path = source.absolute_path();
        if self.banner.as_deref() == Some(path) {
            Some(PropertyType::Banner)
        } else if self.readme.as_deref() == Some(path) {
            Some(PropertyType::Readme)
        } else {
            None
        }
    }
}

impl CompilationStep for IncludePropertyFiles {
    fn name(&self) -> &'static str {
        "IncludePropertyFiles"
    }

    fn run(&self, ctx: &CompilerContext, source: &RawSourceFile) -> Result<Option<Directive>, CompileError> {
        let Some(role) = self.role_of(source) else {
            return Ok(None);
        };
        if !source.absolute_path().exists() {
            return Ok(None);
        }

        let data = fs::read(source.absolute_path()).map_err(|e| CompileError::FileIo {
            path: source.absolute_path().to_path_buf(),
            source: e,
        })?;
        let id = ctx.include_file(&data)?;
        ctx.record_property(role, id.clone())?;

        info!("Included {} {} as {}", role, source.path, id);
        Ok(Some(
            PropertyFileDirective::new(source.path.clone(), source.hash(), source.size(), id, role).into(),
        ))
    }

    fn state(&self) -> StepState {
        StepState::IncludePropertyFiles
    }
}
