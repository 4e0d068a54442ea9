//! UI notification seam.
//!
//! The runner never touches a window or terminal directly. It gets a
//! [`Notifier`] and calls the four operations a front end must provide.

use tokio::sync::mpsc;

use titan_core::Entry;

pub trait Notifier: Send + Sync {
    /// Best-effort status line update; called every poll while supervising.
    fn set_status(&self, text: &str);
    /// An entry's stats changed and its row should be redrawn.
    fn refresh_row(&self, entry: &Entry);
    /// Non-fatal problem the user should acknowledge.
    fn warn(&self, message: &str);
    /// Fatal problem; the front end exits after showing it.
    fn error(&self, message: &str);
}

/// One notification, as posted by [`ChannelNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Status(String),
    RefreshRow {
        title: String,
        time_played: String,
        times_opened: u64,
    },
    Warning(String),
    Error(String),
}

/// Posts every notification onto an unbounded channel so the runner can live
/// on any task or thread while the front end renders from its own loop.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn post(&self, event: UiEvent) {
        // A closed receiver means the front end is gone; nothing left to show.
        let _ = self.tx.send(event);
    }
}

impl Notifier for ChannelNotifier {
    fn set_status(&self, text: &str) {
        self.post(UiEvent::Status(text.to_owned()));
    }

    fn refresh_row(&self, entry: &Entry) {
        self.post(UiEvent::RefreshRow {
            title: entry.title.clone(),
            time_played: entry.time_played_display(),
            times_opened: entry.times_opened,
        });
    }

    fn warn(&self, message: &str) {
        self.post(UiEvent::Warning(message.to_owned()));
    }

    fn error(&self, message: &str) {
        self.post(UiEvent::Error(message.to_owned()));
    }
}
