//! Preload classification.
//!
//! A preload string is either a path to run, or `ent[<title>]` / `ENT[<title>]`
//! naming another entry. Strings are classified once, when a launch reaches
//! them, so the rest of the runner only ever matches on [`Preload`].

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preload {
    /// Executable started detached before the entry's main process.
    PlainCommand(PathBuf),
    /// Title of another entry to launch after this one.
    EntryReference(String),
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:ent|ENT)\s*\[\s*(?P<title>.*?)\s*\]\s*$")
            .expect("reference pattern is a valid literal")
    })
}

impl Preload {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match reference_pattern().captures(trimmed) {
            Some(caps) => Preload::EntryReference(caps["title"].to_owned()),
            None => Preload::PlainCommand(PathBuf::from(trimmed)),
        }
    }
}
