//! Serializable compilation stack
//!
//! A stack is a list of [`StepState`]s. Authors can override the default by
//! placing a `compilation_stack.yml` in the stack folder; otherwise the
//! default stack is used and written next to it as
//! `_current_compilation_stack.yml` to start from.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::compile::config::{CURRENT_STACK_FILE_NAME, STACK_FILE_NAME};
use crate::compile::context::CompilerContext;
use crate::compile::error::CompileError;
use crate::compile::step::CompilationStep;
use crate::compile::steps::{
    DirectMatch, DropAll, IgnoreEndsWith, IgnoreGameFiles, IgnoreInstallCruft, IgnoreRegex, IgnoreStartsWith,
    IncludePropertyFiles, IncludeRegex,
};

/// Marker files the mod manager leaves in its own folders
pub const STAGING_MARKER_NAME: &str = "__vortex_staging_folder";
pub const DOWNLOADS_MARKER_NAME: &str = "__vortex_downloads_folder";

/// Persistable description of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum StepState {
    IncludePropertyFiles,
    IncludeRegex {
        #[serde(rename = "Pattern")]
        pattern: String,
    },
    IgnoreRegex {
        #[serde(rename = "Pattern")]
        pattern: String,
    },
    IgnoreStartsWith {
        #[serde(rename = "Prefix")]
        prefix: String,
    },
    IgnoreEndsWith {
        #[serde(rename = "Postfix")]
        postfix: String,
    },
    IgnoreGameFiles,
    DirectMatch,
    IgnoreInstallCruft,
    DropAll,
}

impl StepState {
    /// Build the step this state describes
    ///
    /// Only reads configuration from `ctx`; the context is not modified.
    pub fn create_step(&self, ctx: &CompilerContext) -> Result<Box<dyn CompilationStep>, CompileError> {
        Ok(match self {
            StepState::IncludePropertyFiles => Box::new(IncludePropertyFiles::new(ctx.config())),
            StepState::IncludeRegex { pattern } => Box::new(IncludeRegex::new(pattern)?),
            StepState::IgnoreRegex { pattern } => Box::new(IgnoreRegex::new(pattern)?),
            StepState::IgnoreStartsWith { prefix } => Box::new(IgnoreStartsWith::new(prefix)),
            StepState::IgnoreEndsWith { postfix } => Box::new(IgnoreEndsWith::new(postfix)),
            StepState::IgnoreGameFiles => Box::new(IgnoreGameFiles),
            StepState::DirectMatch => Box::new(DirectMatch),
            StepState::IgnoreInstallCruft => Box::new(IgnoreInstallCruft::new()),
            StepState::DropAll => Box::new(DropAll),
        })
    }
}

/// The stack used when the author has not provided one
pub fn default_stack() -> Vec<StepState> {
    vec![
        StepState::IncludePropertyFiles,
        StepState::IgnoreRegex {
            pattern: format!("(^|/){}$", STAGING_MARKER_NAME),
        },
        StepState::IgnoreRegex {
            pattern: format!("(^|/){}$", DOWNLOADS_MARKER_NAME),
        },
        StepState::IgnoreEndsWith {
            postfix: ".meta".to_string(),
        },
        StepState::IgnoreEndsWith {
            postfix: STACK_FILE_NAME.to_string(),
        },
        StepState::IgnoreGameFiles,
        StepState::DirectMatch,
        StepState::IgnoreInstallCruft,
        StepState::DropAll,
    ]
}

/// Build every step of `states`, in order
pub fn create_steps(states: &[StepState], ctx: &CompilerContext) -> Result<Vec<Box<dyn CompilationStep>>, CompileError> {
    states.iter().map(|s| s.create_step(ctx)).collect()
}

pub fn serialize_stack(states: &[StepState]) -> Result<String, CompileError> {
    Ok(serde_yaml::to_string(states)?)
}

pub fn deserialize_stack(yaml: &str) -> Result<Vec<StepState>, CompileError> {
    Ok(serde_yaml::from_str(yaml)?)
}

pub fn save_stack(path: &Path, states: &[StepState]) -> Result<(), CompileError> {
    let yaml = serialize_stack(states)?;
    fs::write(path, yaml).map_err(|source| CompileError::FileIo {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_stack(path: &Path) -> Result<Vec<StepState>, CompileError> {
    let yaml = fs::read_to_string(path).map_err(|source| CompileError::FileIo {
        path: path.to_path_buf(),
        source,
    })?;
    deserialize_stack(&yaml)
}

/// Load `compilation_stack.yml` from `folder`, or fall back to the default
/// stack and write it out as `_current_compilation_stack.yml`
pub fn load_or_create_stack(folder: &Path) -> Result<Vec<StepState>, CompileError> {
    let user_stack = folder.join(STACK_FILE_NAME);
    if user_stack.is_file() {
        info!("Using compilation stack from {}", user_stack.display());
        return load_stack(&user_stack);
    }

    info!("Generating compilation stack");
    let stack = default_stack();
    save_stack(&folder.join(CURRENT_STACK_FILE_NAME), &stack)?;
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::config::CompilerConfig;
    use crate::vfs::IndexRoot;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn ctx() -> CompilerContext {
        CompilerContext::new(Arc::new(CompilerConfig::default()), IndexRoot::empty())
    }

    #[test]
    fn test_stack_round_trips_through_yaml() {
        let ctx = ctx();
        let states = default_stack();
        let steps = create_steps(&states, &ctx).unwrap();

        let yaml = serialize_stack(&steps.iter().map(|s| s.state()).collect::<Vec<_>>()).unwrap();
        let back = deserialize_stack(&yaml).unwrap();
        let rebuilt = create_steps(&back, &ctx).unwrap();

        assert_eq!(back, states);
        assert_eq!(
            rebuilt.iter().map(|s| s.name()).collect::<Vec<_>>(),
            steps.iter().map(|s| s.name()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_yaml_uses_type_tag() {
        let yaml = serialize_stack(&[StepState::IgnoreStartsWith {
            prefix: "logs/".into(),
        }])
        .unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(value[0]["$type"].as_str(), Some("IgnoreStartsWith"));
        assert_eq!(value[0]["Prefix"].as_str(), Some("logs/"));

        let parsed = deserialize_stack("- $type: DropAll\n- $type: IncludeRegex\n  Pattern: '\\.ini$'\n").unwrap();
        assert_eq!(
            parsed,
            vec![
                StepState::DropAll,
                StepState::IncludeRegex {
                    pattern: "\\.ini$".into()
                }
            ]
        );
    }

    #[test]
    fn test_invalid_pattern_fails_step_creation() {
        let state = StepState::IgnoreRegex { pattern: "(".into() };
        assert!(matches!(state.create_step(&ctx()), Err(CompileError::Regex(_))));
    }

    #[test]
    fn test_unknown_step_type_is_rejected() {
        assert!(deserialize_stack("- $type: NotAStep\n").is_err());
    }

    #[test]
    fn test_missing_user_stack_writes_current_stack() {
        let dir = tempdir().unwrap();
        let stack = load_or_create_stack(dir.path()).unwrap();

        assert_eq!(stack, default_stack());
        let written = load_stack(&dir.path().join(CURRENT_STACK_FILE_NAME)).unwrap();
        assert_eq!(written, stack);
    }

    #[test]
    fn test_user_stack_takes_precedence() {
        let dir = tempdir().unwrap();
        save_stack(&dir.path().join(STACK_FILE_NAME), &[StepState::DropAll]).unwrap();

        let stack = load_or_create_stack(dir.path()).unwrap();

        assert_eq!(stack, vec![StepState::DropAll]);
        assert!(!dir.path().join(CURRENT_STACK_FILE_NAME).exists());
    }
}
