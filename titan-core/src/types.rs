//! Domain types for the Titan entry store.
//!
//! An [`Entry`] is one registered program: where it lives, how to start it,
//! what to start before it, and how long it has been played.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered launchable program with its accumulated stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique within a [`Registry`](crate::Registry); also the lookup key.
    pub title: String,
    /// Main executable. Empty only for a freshly created entry.
    pub location: PathBuf,
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Executable paths or `ent[<title>]` references, in launch order.
    #[serde(default)]
    pub preloads: Vec<String>,
    /// Cumulative seconds.
    #[serde(default)]
    pub time_played: f64,
    #[serde(default)]
    pub times_opened: u64,
}

impl Entry {
    /// An unconfigured entry: no location, no arguments, no preloads, zero stats.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            location: PathBuf::new(),
            arguments: Vec::new(),
            preloads: Vec::new(),
            time_played: 0.0,
            times_opened: 0,
        }
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_preloads<I, S>(mut self, preloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preloads = preloads.into_iter().map(Into::into).collect();
        self
    }

    /// An entry without a location cannot be started.
    pub fn is_launchable(&self) -> bool {
        !self.location.as_os_str().is_empty()
    }

    /// Count one completed launch and add `duration_secs` of playtime.
    ///
    /// Negative or non-finite durations add nothing; stats never decrease.
    pub fn record_completion(&mut self, duration_secs: f64) {
        if duration_secs.is_finite() && duration_secs > 0.0 {
            self.time_played += duration_secs;
        }
        self.times_opened += 1;
    }

    pub fn time_played_display(&self) -> String {
        format_duration(self.time_played)
    }
}

/// Format `secs` as `HH:MM:SS`, read as a time of day since the Unix epoch.
///
/// Fractional seconds are truncated. A full day wraps back to `00:00:00`,
/// the same way a wall clock does.
pub fn format_duration(secs: f64) -> String {
    let whole = if secs.is_finite() && secs > 0.0 {
        secs.trunc() as i64
    } else {
        0
    };
    DateTime::<Utc>::from_timestamp(whole, 0)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "00:00:00".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_zero() {
        assert_eq!(format_duration(0.0), "00:00:00");
    }

    #[test]
    fn format_duration_mixed_units() {
        assert_eq!(format_duration(3661.0), "01:01:01");
        assert_eq!(format_duration(59.99), "00:00:59");
    }

    #[test]
    fn format_duration_wraps_like_a_clock() {
        assert_eq!(format_duration(86_400.0 + 5.0), "00:00:05");
    }

    #[test]
    fn format_duration_rejects_garbage() {
        assert_eq!(format_duration(-12.0), "00:00:00");
        assert_eq!(format_duration(f64::NAN), "00:00:00");
    }

    #[test]
    fn new_entry_is_not_launchable() {
        let entry = Entry::new("New Game");
        assert!(!entry.is_launchable());
        assert_eq!(entry.times_opened, 0);
        assert!(entry.with_location("/games/x").is_launchable());
    }

    #[test]
    fn record_completion_accumulates() {
        let mut entry = Entry::new("Quake");
        entry.record_completion(30.5);
        entry.record_completion(10.0);
        assert_eq!(entry.times_opened, 2);
        assert!((entry.time_played - 40.5).abs() < f64::EPSILON);
    }

    #[test]
    fn record_completion_never_subtracts() {
        let mut entry = Entry::new("Quake");
        entry.time_played = 100.0;
        entry.record_completion(-5.0);
        assert_eq!(entry.times_opened, 1);
        assert_eq!(entry.time_played, 100.0);
    }
}
