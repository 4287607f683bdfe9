//! Script runtime management
//!
//! Owns the QuickJS runtime and its single context. Everything here runs on
//! the host thread; the runtime is deliberately not `Send`.

use crate::ScriptError;
use rquickjs::{Context, FromJs, Runtime};
use std::path::Path;
use tracing::warn;

/// Script execution context
pub struct ScriptRuntime {
    runtime: Runtime,
    pub context: Context,
}

impl ScriptRuntime {
    pub fn new() -> Result<Self, ScriptError> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;

        Ok(Self { runtime, context })
    }

    pub fn execute_file(&self, path: &Path) -> Result<(), ScriptError> {
        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.execute(&source)
    }

    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            ctx.eval::<(), _>(source)
                .map_err(|err| ScriptError::from_js(&ctx, err))
        })
    }

    /// Evaluate an expression and convert its value.
    pub fn evaluate<T>(&self, source: &str) -> Result<T, ScriptError>
    where
        T: for<'js> FromJs<'js> + 'static,
    {
        self.context.with(|ctx| {
            ctx.eval::<T, _>(source)
                .map_err(|err| ScriptError::from_js(&ctx, err))
        })
    }

    /// Run queued promise jobs until none are left. Returns how many ran.
    ///
    /// A job that throws is logged and skipped; the rest still run.
    pub fn run_pending_jobs(&self) -> usize {
        let mut ran = 0;
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => ran += 1,
                Ok(false) => break,
                Err(_) => {
                    ran += 1;
                    warn!("uncaught exception in promise job");
                }
            }
        }
        ran
    }
}
