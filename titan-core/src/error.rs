//! Error types for titan-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure, annotated with the file it happened on.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS refused to let us write the entry store.
    #[error("unable to save to file '{path}': permission denied")]
    PermissionDenied { path: PathBuf },

    /// TOML serialization error (save path).
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// TOML parse error on load: also raised for a title declared twice.
    #[error("formatting error in file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A table parsed fine but does not have the shape of an entry.
    #[error("entry '{title}' is malformed: {source}")]
    InvalidEntry {
        title: String,
        #[source]
        source: toml::de::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.titan/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The entry store did not exist at the expected path.
    #[error("config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("entry '{0}' already exists")]
    DuplicateTitle(String),

    /// The title would collide with the `[titan_info]` table on disk.
    #[error("'{0}' is reserved and cannot be used as an entry title")]
    ReservedTitle(String),

    #[error("entry '{0}' does not exist")]
    EntryNotFound(String),

    /// Another launch holds `launch.lock`.
    #[error("a launch is in progress ({holder}); lock file: {path}")]
    LaunchInProgress { holder: String, path: PathBuf },
}

/// Convenience constructor for [`RegistryError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    let path = path.into();
    if source.kind() == std::io::ErrorKind::PermissionDenied {
        return RegistryError::PermissionDenied { path };
    }
    RegistryError::Io { path, source }
}
