use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures from resolving, building or running an encoder invocation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A bare program name that is not on `PATH`.
    #[error("encoder `{program}` not found on PATH")]
    EncoderNotFound { program: String },

    /// An explicit encoder path that does not exist.
    #[error("encoder executable does not exist: {}", .0.display())]
    MissingExecutable(PathBuf),

    /// The process could not be spawned or waited on.
    #[error("could not run {program}: {message}")]
    Launch { program: String, message: String },

    /// The process outlived its time budget and was killed.
    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// A command builder rejected one of its parameters.
    #[error("invalid encode parameter: {0}")]
    InvalidParameter(String),

    #[error("scratch workspace: {0}")]
    Workspace(String),
}

impl Error {
    pub(crate) fn parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub(crate) fn launch(program: &str, message: impl Into<String>) -> Self {
        Self::Launch {
            program: program.to_string(),
            message: message.into(),
        }
    }
}
