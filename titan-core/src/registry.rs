//! Entry registry: the in-memory collection plus its TOML store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.titan/
//!   titan_games.toml   (every table except [titan_info] is one entry)
//!   titan.log          (launch diagnostics, appended by the runner)
//!   launch.lock        (present while a launch is in flight)
//! ```
//!
//! # API pattern
//!
//! Every filesystem function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, RegistryError};
use crate::paths::{config_path, titan_root};
use crate::types::Entry;

/// Name of the bookkeeping table that is not an entry.
pub const INFO_TABLE: &str = "titan_info";

/// Version written into `[titan_info] cfg_version`.
pub const CFG_VERSION: i64 = 1;

const TEMPLATE_HEADER: &str = r#"# This file may also be edited manually. However, there are a few things to note:
#   - Path variables (location, preloads, etc) are OS-specific. If you're unsure how to format them, try adding an entry via the program and see how it formats the path.
#   - Names can be formatted however you like. If the name uses spaces or special characters, you must surround it with double quotes (ex. "Titanfall 2").
#   - time_played takes a float value of the amount of time played (in seconds).
#   - times_opened takes an integer value of the amount of times opened.
#   - A preload written as ent[Other Game] starts that entry after this one.

# ["Example Game"]
# time_played = 60.0 # Time in seconds
# times_opened = 1
# location  = "/games/example/bin/game" # Path to the main executable of the game.
# arguments = [ "--console", "--windowed=true" ] # Passed to the game, like "Set Launch Options" in Steam.
# preloads  = [ "/games/example/bin/trainer", "ent[Voice Chat]" ] # Started before the main program.

"#;

const SAVE_HEADER: &str = "# Managed by titan. Manual edits are allowed while no launch is running.\n\n";

// ---------------------------------------------------------------------------
// 1. In-memory registry
// ---------------------------------------------------------------------------

/// Entries keyed by unique title, kept in insertion order for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an entry from its parts and add it.
    pub fn create(
        &mut self,
        title: impl Into<String>,
        location: impl Into<PathBuf>,
        arguments: Vec<String>,
        preloads: Vec<String>,
    ) -> Result<&Entry, RegistryError> {
        let entry = Entry::new(title)
            .with_location(location)
            .with_arguments(arguments)
            .with_preloads(preloads);
        self.add(entry)
    }

    /// Append `entry`. A title that is already registered, or the name of the
    /// store's info table, is rejected.
    pub fn add(&mut self, entry: Entry) -> Result<&Entry, RegistryError> {
        if entry.title == INFO_TABLE {
            return Err(RegistryError::ReservedTitle(entry.title));
        }
        if self.position(&entry.title).is_some() {
            return Err(RegistryError::DuplicateTitle(entry.title));
        }
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn lookup(&self, title: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.title == title)
    }

    pub fn lookup_mut(&mut self, title: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.title == title)
    }

    pub fn position(&self, title: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.title == title)
    }

    pub fn remove(&mut self, title: &str) -> Result<Entry, RegistryError> {
        let idx = self
            .position(title)
            .ok_or_else(|| RegistryError::EntryNotFound(title.to_owned()))?;
        Ok(self.entries.remove(idx))
    }

    /// Change an entry's title in place, keeping its position.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), RegistryError> {
        if old == new {
            return self
                .lookup(old)
                .map(|_| ())
                .ok_or_else(|| RegistryError::EntryNotFound(old.to_owned()));
        }
        if new == INFO_TABLE {
            return Err(RegistryError::ReservedTitle(new.to_owned()));
        }
        if self.position(new).is_some() {
            return Err(RegistryError::DuplicateTitle(new.to_owned()));
        }
        let entry = self
            .lookup_mut(old)
            .ok_or_else(|| RegistryError::EntryNotFound(old.to_owned()))?;
        entry.title = new.to_owned();
        Ok(())
    }

    /// Count one completed launch of `title` lasting `duration_secs`.
    pub fn record_completion(
        &mut self,
        title: &str,
        duration_secs: f64,
    ) -> Result<&Entry, RegistryError> {
        let entry = self
            .lookup_mut(title)
            .ok_or_else(|| RegistryError::EntryNotFound(title.to_owned()))?;
        entry.record_completion(duration_secs);
        Ok(entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.title.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// 2. On-disk shape
// ---------------------------------------------------------------------------

/// One entry table; the title is the table key, not a field.
#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    #[serde(default)]
    time_played: f64,
    #[serde(default)]
    times_opened: u64,
    #[serde(default)]
    location: PathBuf,
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    preloads: Vec<String>,
}

impl EntryRecord {
    fn from_entry(entry: &Entry) -> Self {
        Self {
            time_played: entry.time_played,
            times_opened: entry.times_opened,
            location: entry.location.clone(),
            arguments: entry.arguments.iter().map(|a| a.trim().to_owned()).collect(),
            preloads: entry.preloads.iter().map(|p| p.trim().to_owned()).collect(),
        }
    }

    fn into_entry(self, title: String) -> Entry {
        Entry {
            title,
            location: self.location,
            arguments: self.arguments,
            preloads: self.preloads,
            time_played: self.time_played,
            times_opened: self.times_opened,
        }
    }
}

fn info_table() -> toml::Table {
    let mut info = toml::Table::new();
    info.insert("cfg_version".to_owned(), toml::Value::Integer(CFG_VERSION));
    info
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

/// Create `~/.titan/` and a commented template store if none exists yet.
///
/// Returns `true` when the template was written.
pub fn init_files_at(home: &Path) -> Result<bool, RegistryError> {
    let root = titan_root(home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        set_dir_permissions(&root)?;
    }
    let path = config_path(home);
    if path.exists() {
        return Ok(false);
    }
    let mut doc = toml::Table::new();
    doc.insert(INFO_TABLE.to_owned(), toml::Value::Table(info_table()));
    let body = format!("{TEMPLATE_HEADER}{}", toml::to_string(&doc)?);
    write_atomic(&path, &body)?;
    Ok(true)
}

/// `init_files_at` convenience wrapper.
pub fn init_files() -> Result<bool, RegistryError> {
    init_files_at(&home()?)
}

// ---------------------------------------------------------------------------
// 4. Load
// ---------------------------------------------------------------------------

/// Load every entry from `<home>/.titan/titan_games.toml`, in file order.
///
/// Returns `RegistryError::ConfigNotFound` if absent and
/// `RegistryError::Parse` if the TOML is malformed. A title declared twice is
/// a TOML error too, so duplicates never reach the registry.
pub fn load_entries_at(home: &Path) -> Result<Registry, RegistryError> {
    let path = config_path(home);
    if !path.exists() {
        return Err(RegistryError::ConfigNotFound { path });
    }
    let contents = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let mut doc: toml::Table =
        toml::from_str(&contents).map_err(|e| RegistryError::Parse { path, source: e })?;
    doc.remove(INFO_TABLE);

    let mut registry = Registry::new();
    for (title, value) in doc {
        let record: EntryRecord = value
            .try_into()
            .map_err(|e| RegistryError::InvalidEntry { title: title.clone(), source: e })?;
        registry.add(record.into_entry(title))?;
    }
    Ok(registry)
}

/// `load_entries_at` convenience wrapper.
pub fn load_entries() -> Result<Registry, RegistryError> {
    load_entries_at(&home()?)
}

// ---------------------------------------------------------------------------
// 5. Save (atomic)
// ---------------------------------------------------------------------------

/// Rewrite the whole store from `registry`.
///
/// Write flow: serialize → `.toml.tmp` sibling → `chmod 0600` → `rename`.
/// A permission failure maps to `RegistryError::PermissionDenied` so callers
/// can warn and keep their in-memory state.
pub fn save_entries_at(home: &Path, registry: &Registry) -> Result<(), RegistryError> {
    let root = titan_root(home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        set_dir_permissions(&root)?;
    }

    let mut doc = toml::Table::new();
    doc.insert(INFO_TABLE.to_owned(), toml::Value::Table(info_table()));
    for entry in registry.iter() {
        let record = toml::Value::try_from(EntryRecord::from_entry(entry))?;
        doc.insert(entry.title.clone(), record);
    }
    let body = format!("{SAVE_HEADER}{}", toml::to_string(&doc)?);
    write_atomic(&config_path(home), &body)
}

/// `save_entries_at` convenience wrapper.
pub fn save_entries(registry: &Registry) -> Result<(), RegistryError> {
    save_entries_at(&home()?, registry)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

pub(crate) fn home() -> Result<PathBuf, RegistryError> {
    dirs::home_dir().ok_or(RegistryError::HomeNotFound)
}

fn write_atomic(path: &Path, body: &str) -> Result<(), RegistryError> {
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, body).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700)).map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
