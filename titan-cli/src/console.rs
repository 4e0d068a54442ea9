//! Terminal front end for runner notifications.
//!
//! Status updates share one line that is rewritten in place; anything else
//! ends that line first so it is not overwritten.

use std::io::{self, Write};
use std::sync::Mutex;

use colored::Colorize;
use tokio::sync::mpsc::UnboundedReceiver;

use titan_core::Entry;
use titan_runner::{Notifier, UiEvent};

pub struct Console<O: Write, E: Write> {
    out: O,
    err: E,
    /// Width of the status line currently on screen; 0 when none.
    status_width: usize,
}

impl<O: Write, E: Write> Console<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            status_width: 0,
        }
    }

    pub fn handle(&mut self, event: UiEvent) -> io::Result<()> {
        match event {
            UiEvent::Status(text) => {
                let width = text.chars().count();
                let pad = self.status_width.saturating_sub(width);
                write!(self.out, "\r{text}{}", " ".repeat(pad))?;
                self.out.flush()?;
                self.status_width = width.max(1);
            }
            UiEvent::RefreshRow {
                title,
                time_played,
                times_opened,
            } => {
                self.end_status()?;
                writeln!(
                    self.out,
                    "{} {title}: {time_played} played, opened {times_opened} times",
                    "✓".green()
                )?;
            }
            UiEvent::Warning(text) => {
                self.end_status()?;
                writeln!(self.err, "{} {text}", "warning:".yellow().bold())?;
            }
            UiEvent::Error(text) => {
                self.end_status()?;
                writeln!(self.err, "{} {text}", "error:".red().bold())?;
            }
        }
        Ok(())
    }

    pub fn finish(&mut self) -> io::Result<()> {
        self.end_status()?;
        self.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }

    fn end_status(&mut self) -> io::Result<()> {
        if self.status_width > 0 {
            writeln!(self.out)?;
            self.status_width = 0;
        }
        Ok(())
    }
}

/// Print events until every sender is gone.
pub async fn drain(mut events: UnboundedReceiver<UiEvent>) -> io::Result<()> {
    let mut console = Console::new(io::stdout(), io::stderr());
    while let Some(event) = events.recv().await {
        console.handle(event)?;
    }
    console.finish()
}

/// Synchronous [`Notifier`] for messages raised outside a launch: save
/// warnings and the fatal error a command exits with.
pub struct TerminalNotifier<O: Write, E: Write> {
    console: Mutex<Console<O, E>>,
}

impl TerminalNotifier<io::Stdout, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> TerminalNotifier<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            console: Mutex::new(Console::new(out, err)),
        }
    }

    fn emit(&self, event: UiEvent) {
        let Ok(mut console) = self.console.lock() else {
            return;
        };
        // Nowhere left to report a broken terminal.
        let _ = console.handle(event).and_then(|()| console.flush());
    }
}

impl<O: Write + Send, E: Write + Send> Notifier for TerminalNotifier<O, E> {
    fn set_status(&self, text: &str) {
        self.emit(UiEvent::Status(text.to_owned()));
    }

    fn refresh_row(&self, entry: &Entry) {
        self.emit(UiEvent::RefreshRow {
            title: entry.title.clone(),
            time_played: entry.time_played_display(),
            times_opened: entry.times_opened,
        });
    }

    fn warn(&self, message: &str) {
        self.emit(UiEvent::Warning(message.to_owned()));
    }

    fn error(&self, message: &str) {
        self.emit(UiEvent::Error(message.to_owned()));
    }
}
