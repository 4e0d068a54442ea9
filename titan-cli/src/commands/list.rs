//! `titan list`: registered entries in file order.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use titan_core::Entry;

use super::{load_registry, prepare_home};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct EntryJson<'a> {
    title: &'a str,
    location: String,
    arguments: &'a [String],
    preloads: &'a [String],
    time_played: f64,
    time_played_display: String,
    times_opened: u64,
}

impl<'a> From<&'a Entry> for EntryJson<'a> {
    fn from(entry: &'a Entry) -> Self {
        Self {
            title: &entry.title,
            location: entry.location.display().to_string(),
            arguments: &entry.arguments,
            preloads: &entry.preloads,
            time_played: entry.time_played,
            time_played_display: entry.time_played_display(),
            times_opened: entry.times_opened,
        }
    }
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "time played")]
    time_played: String,
    #[tabled(rename = "times opened")]
    times_opened: u64,
    #[tabled(rename = "location")]
    location: String,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let home = prepare_home()?;
        let registry = load_registry(&home)?;

        if self.json {
            let payload: Vec<EntryJson<'_>> = registry.iter().map(EntryJson::from).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize entries")?
            );
            return Ok(());
        }

        if registry.is_empty() {
            println!("No entries registered.");
            println!("Run: titan add <title> --location <path>");
            return Ok(());
        }

        let rows: Vec<EntryRow> = registry
            .iter()
            .map(|e| EntryRow {
                title: e.title.clone(),
                time_played: e.time_played_display(),
                times_opened: e.times_opened,
                location: if e.is_launchable() {
                    e.location.display().to_string()
                } else {
                    "(not set)".to_string()
                },
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
