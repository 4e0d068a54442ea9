//! `titan log`: recent launch diagnostics.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use titan_core::paths::log_path;

use super::prepare_home;

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Number of trailing lines to show.
    #[arg(long, default_value_t = 50)]
    pub lines: usize,
}

impl LogArgs {
    pub fn run(self) -> Result<()> {
        let home = prepare_home()?;
        print_tail(&log_path(&home), self.lines).context("failed to read launch log")
    }
}

/// `titan.log` is capped at startup, so reading it whole is fine.
fn print_tail(path: &Path, lines: usize) -> Result<()> {
    let body = match fs::read_to_string(path) {
        Ok(body) => body,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            println!("No launches logged yet ({}).", path.display());
            return Ok(());
        }
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };

    let all: Vec<&str> = body.lines().collect();
    let skip = all.len().saturating_sub(lines);
    println!("==> {} <==", path.display());
    for line in &all[skip..] {
        println!("{line}");
    }
    Ok(())
}
