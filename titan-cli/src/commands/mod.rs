pub mod entry;
pub mod list;
pub mod log;
pub mod start;
pub mod stats;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use titan_core::{paths, registry, Registry, RegistryError};
use titan_runner::{log_rotation, Notifier};

use crate::console::TerminalNotifier;

/// Resolve `~`, create the entry store template if missing, cap the log.
///
/// Runs before every command.
pub fn prepare_home() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let created = registry::init_files_at(&home)
        .with_context(|| format!("failed to initialise {}", paths::titan_root(&home).display()))?;
    if created {
        tracing::info!(path = %paths::config_path(&home).display(), "created entry store");
    }
    log_rotation::cap_logs(&home);
    Ok(home)
}

pub fn load_registry(home: &Path) -> Result<Registry> {
    registry::load_entries_at(home).with_context(|| {
        format!(
            "failed to load entries from '{}'",
            paths::config_path(home).display()
        )
    })
}

/// Persist `registry`. A permission failure is reported, not returned.
pub fn save_registry(home: &Path, registry: &Registry) -> Result<()> {
    match registry::save_entries_at(home, registry) {
        Ok(()) => Ok(()),
        Err(err @ RegistryError::PermissionDenied { .. }) => {
            TerminalNotifier::stdio().warn(&format!("{err}; changes were not saved"));
            Ok(())
        }
        Err(err) => Err(err).context("failed to save entries"),
    }
}
