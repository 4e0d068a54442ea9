use std::path::PathBuf;

use thiserror::Error;

/// Failures inside one launch branch. The runner turns every one of these
/// into a diagnostics line plus a user notification; none escapes `launch`.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create process for '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("entry '{0}' has no location configured")]
    NotLaunchable(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RunnerError {
    RunnerError::Io {
        path: path.into(),
        source,
    }
}
