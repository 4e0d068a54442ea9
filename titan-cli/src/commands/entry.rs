//! `titan add`, `titan edit` and `titan remove`.
//!
//! All three refuse to run while another `titan start` holds the launch lock.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use titan_core::{Entry, LaunchLock};

use super::{load_registry, prepare_home, save_registry};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Title shown in listings and used by `ent[<title>]` references.
    pub title: String,

    /// Path to the executable to start.
    #[arg(long, short = 'l')]
    pub location: Option<PathBuf>,

    /// Command-line argument for the executable (repeatable).
    #[arg(long = "arg", short = 'a', value_name = "ARG", allow_hyphen_values = true)]
    pub arguments: Vec<String>,

    /// Program path or `ent[<title>]` to start first (repeatable).
    #[arg(long = "preload", short = 'p', value_name = "PRELOAD")]
    pub preloads: Vec<String>,
}

impl AddArgs {
    pub fn run(self) -> Result<()> {
        let home = prepare_home()?;
        ensure_no_launch(&home)?;
        let mut registry = load_registry(&home)?;

        let entry = registry
            .create(
                self.title.clone(),
                self.location.unwrap_or_default(),
                self.arguments,
                self.preloads,
            )
            .with_context(|| format!("failed to add '{}'", self.title))?;
        let launchable = entry.is_launchable();

        save_registry(&home, &registry)?;
        println!("✓ Added '{}'", self.title);
        if !launchable {
            println!(
                "  Set a location before starting it: titan edit \"{}\" --location <path>",
                self.title
            );
        }
        Ok(())
    }
}

/// `--clear-*` runs first, so `--clear-args --arg x` replaces the arguments.
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Entry to change.
    pub title: String,

    /// New title.
    #[arg(long)]
    pub rename: Option<String>,

    /// New executable path.
    #[arg(long, short = 'l')]
    pub location: Option<PathBuf>,

    /// Append an argument (repeatable).
    #[arg(long = "arg", short = 'a', value_name = "ARG", allow_hyphen_values = true)]
    pub arguments: Vec<String>,

    /// Append a preload (repeatable).
    #[arg(long = "preload", short = 'p', value_name = "PRELOAD")]
    pub preloads: Vec<String>,

    /// Remove all arguments.
    #[arg(long)]
    pub clear_args: bool,

    /// Remove all preloads.
    #[arg(long)]
    pub clear_preloads: bool,
}

impl EditArgs {
    fn is_noop(&self) -> bool {
        self.rename.is_none()
            && self.location.is_none()
            && self.arguments.is_empty()
            && self.preloads.is_empty()
            && !self.clear_args
            && !self.clear_preloads
    }

    fn apply(&self, entry: &mut Entry) {
        if let Some(location) = &self.location {
            entry.location = location.clone();
        }
        if self.clear_args {
            entry.arguments.clear();
        }
        entry.arguments.extend(self.arguments.iter().cloned());
        if self.clear_preloads {
            entry.preloads.clear();
        }
        entry.preloads.extend(self.preloads.iter().cloned());
    }

    pub fn run(self) -> Result<()> {
        if self.is_noop() {
            bail!("nothing to change for '{}'; see `titan edit --help`", self.title);
        }

        let home = prepare_home()?;
        ensure_no_launch(&home)?;
        let mut registry = load_registry(&home)?;

        let Some(entry) = registry.lookup_mut(&self.title) else {
            bail!("entry '{}' not found", self.title);
        };
        self.apply(entry);

        let mut title = self.title.clone();
        if let Some(new_title) = &self.rename {
            registry
                .rename(&self.title, new_title)
                .with_context(|| format!("failed to rename '{}'", self.title))?;
            title = new_title.clone();
        }

        save_registry(&home, &registry)?;
        println!("✓ Updated '{title}'");
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Entry to remove.
    pub title: String,
}

impl RemoveArgs {
    pub fn run(self) -> Result<()> {
        let home = prepare_home()?;
        ensure_no_launch(&home)?;
        let mut registry = load_registry(&home)?;

        let removed = registry
            .remove(&self.title)
            .with_context(|| format!("failed to remove '{}'", self.title))?;

        save_registry(&home, &registry)?;
        println!(
            "✓ Removed '{}' ({} played, opened {} times)",
            removed.title,
            removed.time_played_display(),
            removed.times_opened
        );
        Ok(())
    }
}

fn ensure_no_launch(home: &Path) -> Result<()> {
    LaunchLock::ensure_free_at(home)
        .context("entries cannot be changed while a launch is running")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(title: &str) -> EditArgs {
        EditArgs {
            title: title.to_owned(),
            rename: None,
            location: None,
            arguments: Vec::new(),
            preloads: Vec::new(),
            clear_args: false,
            clear_preloads: false,
        }
    }

    #[test]
    fn bare_edit_is_a_noop() {
        assert!(edit("Quake").is_noop());
    }

    #[test]
    fn clear_then_append_replaces() {
        let mut entry = Entry::new("Quake")
            .with_location("/games/quake")
            .with_arguments(["-old"])
            .with_preloads(["/tools/obs"]);
        let args = EditArgs {
            arguments: vec!["-fast".into()],
            clear_args: true,
            preloads: vec!["ent[Doom]".into()],
            ..edit("Quake")
        };

        args.apply(&mut entry);

        assert_eq!(entry.arguments, vec!["-fast"]);
        assert_eq!(entry.preloads, vec!["/tools/obs", "ent[Doom]"]);
        assert_eq!(entry.location, PathBuf::from("/games/quake"));
    }

    #[test]
    fn location_and_clear_preloads() {
        let mut entry = Entry::new("Quake").with_preloads(["/tools/obs"]);
        let args = EditArgs {
            location: Some(PathBuf::from("/games/q2/quake2")),
            clear_preloads: true,
            ..edit("Quake")
        };

        args.apply(&mut entry);

        assert!(entry.preloads.is_empty());
        assert!(entry.is_launchable());
    }
}
