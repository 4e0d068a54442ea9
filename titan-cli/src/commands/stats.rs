//! `titan stats [title]`: playtime for one entry or all of them.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use titan_core::{format_duration, Entry, Registry};

use super::{load_registry, prepare_home};

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Entry to show; all entries when omitted.
    pub title: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatsJson {
    generated_at: DateTime<Utc>,
    total_time_played: f64,
    total_times_opened: u64,
    entries: Vec<EntryStatsJson>,
}

#[derive(Serialize)]
struct EntryStatsJson {
    title: String,
    time_played: f64,
    time_played_display: String,
    times_opened: u64,
}

impl StatsArgs {
    pub fn run(self) -> Result<()> {
        let home = prepare_home()?;
        let registry = load_registry(&home)?;

        let selected: Vec<&Entry> = match &self.title {
            Some(title) => match registry.lookup(title) {
                Some(entry) => vec![entry],
                None => bail!("entry '{title}' not found"),
            },
            None => registry.iter().collect(),
        };

        if self.json {
            print_json(&selected)?;
            return Ok(());
        }

        if selected.is_empty() {
            println!("No entries registered.");
            return Ok(());
        }
        for entry in &selected {
            print_entry(entry);
        }
        if self.title.is_none() {
            print_totals(&registry);
        }
        Ok(())
    }
}

fn print_entry(entry: &Entry) {
    println!("{}", entry.title.bold());
    println!("  time played:  {}", entry.time_played_display());
    println!("  times opened: {}", entry.times_opened);
    if entry.is_launchable() {
        println!("  location:     {}", entry.location.display());
    } else {
        println!("  location:     {}", "(not set)".bright_black());
    }
    if !entry.arguments.is_empty() {
        println!("  arguments:    {}", entry.arguments.join(" "));
    }
    if !entry.preloads.is_empty() {
        println!("  preloads:     {}", entry.preloads.join(", "));
    }
}

fn print_totals(registry: &Registry) {
    let secs: f64 = registry.iter().map(|e| e.time_played).sum();
    let opened: u64 = registry.iter().map(|e| e.times_opened).sum();
    println!(
        "{} entries | {:.1} hours played | {} launches",
        registry.len(),
        secs / 3600.0,
        opened
    );
}

fn print_json(entries: &[&Entry]) -> Result<()> {
    let payload = StatsJson {
        generated_at: Utc::now(),
        total_time_played: entries.iter().map(|e| e.time_played).sum(),
        total_times_opened: entries.iter().map(|e| e.times_opened).sum(),
        entries: entries
            .iter()
            .map(|e| EntryStatsJson {
                title: e.title.clone(),
                time_played: e.time_played,
                time_played_display: format_duration(e.time_played),
                times_opened: e.times_opened,
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize stats JSON")?
    );
    Ok(())
}
