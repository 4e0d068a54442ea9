//! Launch diagnostics.
//!
//! Each launch builds an ordered list of lines in memory and hands them to a
//! [`LogSink`] when it finishes, or earlier when something goes badly wrong
//! (a reference cycle, a main executable that will not start). Lines are
//! handed over at most once; a completion flush after an early one is skipped.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{io_err, RunnerError};

/// Append-only destination for diagnostics lines.
pub trait LogSink: Send + Sync {
    /// Append `lines` verbatim. Each line already ends with `\n`.
    fn append_log(&self, lines: &[String]) -> io::Result<()>;
}

/// Appends to a file on disk, creating it and its parent directory if needed.
#[derive(Debug, Clone)]
pub struct FileLogSink {
    path: PathBuf,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<home>/.titan/titan.log`
    pub fn at_home(home: &Path) -> Self {
        Self::new(titan_core::paths::log_path(home))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileLogSink {
    fn append_log(&self, lines: &[String]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        for line in lines {
            file.write_all(line.as_bytes())?;
        }
        file.flush()
    }
}

#[derive(Debug, Default)]
pub struct DiagnosticsLog {
    lines: Vec<String>,
    /// Number of leading lines already handed to a sink.
    written: usize,
    flushed_early: bool,
}

impl DiagnosticsLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `[<local time>] <msg>`.
    pub fn log(&mut self, msg: impl AsRef<str>) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.6f");
        self.lines.push(format!("[{stamp}] {}\n", msg.as_ref()));
    }

    /// Append `<msg>` with no timestamp.
    pub fn raw(&mut self, msg: impl AsRef<str>) {
        self.lines.push(format!("{}\n", msg.as_ref()));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Flush now because of a cycle report or a fatal spawn failure.
    ///
    /// Later early flushes write only lines added since; the completion
    /// flush is suppressed.
    pub fn flush_early(&mut self, sink: &dyn LogSink) -> Result<(), RunnerError> {
        self.flushed_early = true;
        self.write_pending(sink)
    }

    /// Flush at the end of a launch unless an early flush already happened.
    ///
    /// Returns `true` if anything was handed to the sink.
    pub fn flush_on_completion(&mut self, sink: &dyn LogSink) -> Result<bool, RunnerError> {
        if self.flushed_early {
            return Ok(false);
        }
        self.write_pending(sink)?;
        Ok(true)
    }

    fn write_pending(&mut self, sink: &dyn LogSink) -> Result<(), RunnerError> {
        let pending = &self.lines[self.written..];
        if pending.is_empty() {
            return Ok(());
        }
        sink.append_log(pending)
            .map_err(|e| io_err("diagnostics log", e))?;
        self.written = self.lines.len();
        Ok(())
    }
}

/// In-memory sink shared by the crate's unit tests.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub(crate) struct MemorySink {
    pub(crate) writes: std::sync::Arc<std::sync::Mutex<Vec<Vec<String>>>>,
}

#[cfg(test)]
impl MemorySink {
    pub(crate) fn batches(&self) -> Vec<Vec<String>> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) fn all_lines(&self) -> Vec<String> {
        self.batches().into_iter().flatten().collect()
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn append_log(&self, lines: &[String]) -> io::Result<()> {
        self.writes.lock().unwrap().push(lines.to_vec());
        Ok(())
    }
}
