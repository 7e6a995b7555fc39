use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring an engine or rendering a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Bad input to `assign*` or `fetch` (non-iterable dataset, missing template path).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine cannot be put into the requested state (bad template directory).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A single-name variable lookup for a name that was never assigned.
    #[error("Undefined template variable: {0}")]
    UndefinedKey(String),

    /// The output capture could not be started or the template file could not be read.
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The template left the capture stack at a different depth than it found it.
    #[error("Logic error: {0}")]
    Logic(String),

    /// The template failed while rendering.
    #[error("{path:?}, error: {source}")]
    Execution {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },
}

impl TemplateError {
    pub(crate) fn io(message: impl Into<String>, source: Option<std::io::Error>) -> Self {
        TemplateError::Io {
            message: message.into(),
            source,
        }
    }

    /// Line of the template where rendering failed, if known.
    pub fn line(&self) -> Option<usize> {
        match self {
            TemplateError::Execution { source, .. } => source.line(),
            _ => None,
        }
    }
}
