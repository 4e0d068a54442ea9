//! Launch orchestration: preloads, entry references, cycle detection,
//! process supervision and launch diagnostics.

pub mod diagnostics;
mod error;
pub mod log_rotation;
pub mod notify;
pub mod preload;
pub mod process;
mod runner;

pub use diagnostics::{DiagnosticsLog, FileLogSink, LogSink};
pub use error::RunnerError;
pub use notify::{ChannelNotifier, Notifier, UiEvent};
pub use preload::Preload;
pub use process::{ProcessLauncher, ProcessRole, RunningProcess, SpawnRequest, SystemLauncher};
pub use runner::{CycleReport, LaunchReport, LaunchState, Runner, POLL_INTERVAL};
