//! `titan start <title>`: launch an entry and record its playtime.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio::sync::broadcast;

use titan_core::{paths, LaunchLock, Registry};
use titan_runner::{
    ChannelNotifier, FileLogSink, LaunchReport, LaunchState, Runner, SystemLauncher,
};

use super::{load_registry, prepare_home, save_registry};
use crate::console;

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Entry to launch.
    pub title: String,
}

impl StartArgs {
    pub fn run(self) -> Result<()> {
        let home = prepare_home()?;
        let _lock = LaunchLock::acquire_at(&home, &self.title)
            .context("cannot start while another launch is running")?;
        let mut registry = load_registry(&home)?;
        if registry.lookup(&self.title).is_none() {
            bail!("entry '{}' not found", self.title);
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        let report = runtime.block_on(launch(&home, &mut registry, &self.title))?;

        if report.state != LaunchState::Completed {
            bail!("'{}' could not be started", self.title);
        }
        save_registry(&home, &registry)
    }
}

async fn launch(home: &Path, registry: &mut Registry, title: &str) -> Result<LaunchReport> {
    let (notifier, events) = ChannelNotifier::new();
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    let signal_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, stopping supervision");
            let _ = shutdown_tx.send(());
        }
    });
    let console_handle = tokio::spawn(console::drain(events));

    let mut runner = Runner::new(
        Arc::new(SystemLauncher),
        Arc::new(notifier),
        Arc::new(FileLogSink::at_home(home)),
    )
    .with_log_location(paths::log_path(home).display().to_string())
    .with_shutdown(shutdown_rx);

    let report = runner.launch(registry, title).await;

    signal_handle.abort();
    // Dropping the runner closes the event channel and ends the console.
    drop(runner);
    console_handle
        .await
        .context("console task panicked")?
        .context("failed to write to the terminal")?;

    tracing::debug!(
        entry = %report.title,
        state = ?report.state,
        launched = report.launched.len(),
        cycles = report.cycles.len(),
        "launch finished"
    );
    Ok(report)
}
