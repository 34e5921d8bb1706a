//! Compilation step chain

use tracing::debug;

use crate::compile::context::CompilerContext;
use crate::compile::error::CompileError;
use crate::compile::source::RawSourceFile;
use crate::compile::stack::StepState;
use crate::directives::Directive;

/// Reason attached to files no step claimed
pub const NO_MATCH_REASON: &str = "No Match in Stack";

/// One rule in the compilation stack
///
/// A step either claims a file by returning a directive or declines it with
/// `Ok(None)`, passing it on to the next step. Steps are shared across worker
/// threads and must not keep per-file state.
pub trait CompilationStep: Send + Sync {
    /// Name used in logs, same as the `$type` of its state
    fn name(&self) -> &'static str;

    fn run(&self, ctx: &CompilerContext, source: &RawSourceFile) -> Result<Option<Directive>, CompileError>;

    /// Serializable description that recreates this step
    fn state(&self) -> StepState;
}

/// Run `source` through `steps` in order and return the first directive
///
/// Every file gets exactly one directive: when all steps decline, or a step
/// fails, the result is a `NoMatch` that says why.
pub fn run_stack(steps: &[Box<dyn CompilationStep>], ctx: &CompilerContext, source: &RawSourceFile) -> Directive {
    for step in steps {
        match step.run(ctx, source) {
            Ok(Some(directive)) => return directive,
            Ok(None) => continue,
            Err(e) => {
                debug!("Step {} failed on {}: {}", step.name(), source.path, e);
                let failure = CompileError::StepFailed {
                    step: step.name().to_string(),
                    reason: e.to_string(),
                };
                return source.no_match(failure.to_string()).into();
            }
        }
    }

    source.no_match(NO_MATCH_REASON).into()
}
