//! Process creation seam.
//!
//! The runner only needs two things from the OS: start a program, and later
//! ask whether it has exited. [`SystemLauncher`] does this with
//! `tokio::process`; tests substitute their own [`ProcessLauncher`].

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    /// Fire-and-forget helper started before an entry.
    Preload,
    /// An entry's main executable.
    Primary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Directory containing `program`, when it has one.
    pub working_dir: Option<PathBuf>,
    pub role: ProcessRole,
}

impl SpawnRequest {
    pub fn preload(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            args: Vec::new(),
            working_dir: containing_dir(program),
            role: ProcessRole::Preload,
        }
    }

    pub fn primary(program: &Path, args: &[String]) -> Self {
        Self {
            program: program.to_path_buf(),
            args: args.to_vec(),
            working_dir: containing_dir(program),
            role: ProcessRole::Primary,
        }
    }
}

fn containing_dir(program: &Path) -> Option<PathBuf> {
    program
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// A started process the runner can poll.
pub trait RunningProcess: Send {
    /// `Ok(true)` once the process has terminated. Never blocks.
    fn has_exited(&mut self) -> io::Result<bool>;
}

pub trait ProcessLauncher: Send + Sync {
    /// Start the process and return immediately; never waits for the child.
    fn spawn(&self, request: &SpawnRequest) -> io::Result<Box<dyn RunningProcess>>;
}

/// Launches real OS processes through `tokio::process`.
///
/// Children are never killed on drop: a preload handle is dropped right
/// after spawning and the process keeps running, reaped by tokio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<Box<dyn RunningProcess>> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(false);
        if let Some(dir) = &request.working_dir {
            cmd.current_dir(dir);
        }
        // Own process group: a terminal Ctrl-C stops supervision, not the game.
        #[cfg(unix)]
        cmd.process_group(0);
        let child = cmd.spawn()?;
        tracing::debug!(
            program = %request.program.display(),
            pid = child.id().unwrap_or_default(),
            role = ?request.role,
            "process spawned",
        );
        Ok(Box::new(child))
    }
}

impl RunningProcess for Child {
    fn has_exited(&mut self) -> io::Result<bool> {
        Ok(self.try_wait()?.is_some())
    }
}
