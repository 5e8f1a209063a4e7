//! Error types for template composition and execution.
//!
//! All compose-time failures are fatal to the directory walk they occur in:
//! there is no retry and no partial-success mode. A walk either produces a
//! complete template map or surfaces the first error it hit.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while composing or executing templates.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A fragment file (or the output sink) could not be read or written.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fragment file exists but contains zero bytes.
    #[error("template file is empty: {}", path.display())]
    EmptyTemplate { path: PathBuf },

    /// Fragment source is not syntactically valid after resolution.
    #[error("failed to compile template \"{name}\": {message}")]
    Compile { name: String, message: String },

    /// Execution referenced a name absent from the compiled unit.
    #[error("template \"{name}\" is undefined")]
    UndefinedTemplate { name: String },

    /// Template inclusion recursed past the depth cap at execution time.
    #[error("include depth limit exceeded while executing \"{name}\"")]
    RecursionLimit { name: String },

    /// A custom function bound into the unit failed at execution time.
    #[error("function error while executing \"{name}\": {message}")]
    Render { name: String, message: String },
}

impl ComposeError {
    /// Builds an [`ComposeError::Io`] from a path and io error.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ComposeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a [`ComposeError::Compile`] for the named fragment.
    pub(crate) fn compile(name: impl Into<String>, message: impl Into<String>) -> Self {
        ComposeError::Compile {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Result type for composition operations.
pub type Result<T> = std::result::Result<T, ComposeError>;
