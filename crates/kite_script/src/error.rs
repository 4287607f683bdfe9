use kite_core::timer::TimerError;
use rquickjs::Ctx;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("JavaScript engine error: {0}")]
    Engine(#[from] rquickjs::Error),

    #[error("uncaught exception: {message}")]
    Exception {
        message: String,
        stack: Option<String>,
    },

    #[error("cannot read script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Timer(#[from] TimerError),
}

impl ScriptError {
    /// Convert an engine error, pulling the pending exception out of `ctx`
    /// when the error is a thrown JS value.
    pub(crate) fn from_js(ctx: &Ctx<'_>, err: rquickjs::Error) -> Self {
        if !matches!(err, rquickjs::Error::Exception) {
            return ScriptError::Engine(err);
        }

        let value = ctx.catch();
        if let Some(exception) = value.as_exception() {
            return ScriptError::Exception {
                message: exception.message().unwrap_or_default(),
                stack: exception.stack(),
            };
        }
        let message = value
            .as_string()
            .and_then(|s| s.to_string().ok())
            .unwrap_or_else(|| format!("{:?}", value));
        ScriptError::Exception {
            message,
            stack: None,
        }
    }
}
