//! The launch orchestrator.
//!
//! One call to [`Runner::launch`] is one invocation:
//!
//! 1. the requested entry's preloads are classified; plain commands start
//!    detached, `ent[..]` references are queued,
//! 2. its main process starts and the timer begins,
//! 3. queued entries are drained FIFO, each running steps 1–2 against the
//!    same `run_log`, so cycles across any number of entries are caught,
//! 4. the first main process is polled until it exits, then playtime is
//!    recorded and diagnostics are flushed.
//!
//! `run_log` holds launch identities (locations and preload paths) in the
//! order they were *started*. A reference whose location is already in it is
//! a cycle: reported, never launched.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, MissedTickBehavior};

use titan_core::{format_duration, Entry, Registry};

use crate::diagnostics::{DiagnosticsLog, LogSink};
use crate::error::RunnerError;
use crate::notify::Notifier;
use crate::preload::Preload;
use crate::process::{ProcessLauncher, RunningProcess, SpawnRequest};

/// How often the main process is checked while supervising.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    Idle,
    Preloading,
    MainRunning,
    Supervising,
    Completed,
    Aborted,
}

/// `callee` was referenced by `caller` after it had already started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub caller: String,
    pub callee: String,
}

/// What one invocation did.
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub title: String,
    pub state: LaunchState,
    pub run_log: Vec<String>,
    /// Titles whose main process started, in launch order.
    pub launched: Vec<String>,
    pub cycles: Vec<CycleReport>,
    /// Supervised time of the requested entry; `None` when aborted.
    pub duration: Option<Duration>,
}

/// A queued entry's main process, timed so it gets its own stats.
struct Tracked {
    title: String,
    process: Box<dyn RunningProcess>,
    started: Instant,
    ended: Option<Instant>,
}

/// Per-invocation state.
struct Session {
    initial: String,
    state: LaunchState,
    run_log: Vec<String>,
    queue: VecDeque<String>,
    diagnostics: DiagnosticsLog,
    launched: Vec<String>,
    cycles: Vec<CycleReport>,
    tracked: Vec<Tracked>,
}

impl Session {
    fn new(initial: &str) -> Self {
        Self {
            initial: initial.to_owned(),
            state: LaunchState::Idle,
            run_log: Vec::new(),
            queue: VecDeque::new(),
            diagnostics: DiagnosticsLog::new(),
            launched: Vec::new(),
            cycles: Vec::new(),
            tracked: Vec::new(),
        }
    }

    fn transition(&mut self, next: LaunchState) {
        tracing::debug!(entry = %self.initial, from = ?self.state, to = ?next, "launch state");
        self.state = next;
    }

    fn into_report(self, duration: Option<Duration>) -> LaunchReport {
        LaunchReport {
            title: self.initial,
            state: self.state,
            run_log: self.run_log,
            launched: self.launched,
            cycles: self.cycles,
            duration,
        }
    }
}

pub struct Runner {
    launcher: Arc<dyn ProcessLauncher>,
    notifier: Arc<dyn Notifier>,
    sink: Arc<dyn LogSink>,
    log_location: String,
    poll_interval: Duration,
    shutdown: Option<broadcast::Receiver<()>>,
}

impl Runner {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        notifier: Arc<dyn Notifier>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            launcher,
            notifier,
            sink,
            log_location: "the diagnostics log".to_owned(),
            poll_interval: POLL_INTERVAL,
            shutdown: None,
        }
    }

    /// Where users are told to look for details, e.g. the log file path.
    pub fn with_log_location(mut self, location: impl Into<String>) -> Self {
        self.log_location = location.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Stop supervising early when a message arrives. The game keeps
    /// running; the time supervised so far is recorded.
    pub fn with_shutdown(mut self, shutdown: broadcast::Receiver<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Launch `title` and supervise it until its main process exits.
    ///
    /// Holds `registry` mutably for the whole invocation, so no entry can be
    /// added, edited or removed while the launch is pending.
    pub async fn launch(&mut self, registry: &mut Registry, title: &str) -> LaunchReport {
        let mut session = Session::new(title);
        session.diagnostics.raw(format!(
            "\n[Titan Run - {}]",
            Local::now().format("%Y-%m-%d %H:%M:%S%.6f")
        ));
        tracing::info!(entry = %title, "launch requested");
        self.notifier.set_status(&format!("Starting {title}..."));

        let Some(entry) = registry.lookup(title).cloned() else {
            let message = format!("Entry '{title}' doesn't exist!");
            session.diagnostics.log(&message);
            self.notifier.warn(&message);
            self.flush_early(&mut session);
            session.transition(LaunchState::Aborted);
            return session.into_report(None);
        };

        session.transition(LaunchState::Preloading);
        let Some(initial) = self.run_branch(&mut session, registry, &entry) else {
            session.transition(LaunchState::Aborted);
            self.notifier
                .set_status(&format!("Entry '{}' failed to start", entry.title));
            tracing::warn!(entry = %entry.title, "launch aborted");
            return session.into_report(None);
        };
        session.transition(LaunchState::MainRunning);
        let started = Instant::now();
        session.diagnostics.log("Timer has been started.");

        if !session.queue.is_empty() {
            session.diagnostics.log("Starting queued entries...");
            while let Some(next) = session.queue.pop_front() {
                let Some(queued) = registry.lookup(&next).cloned() else {
                    tracing::debug!(entry = %next, "queued entry is no longer registered");
                    continue;
                };
                if let Some(process) = self.run_branch(&mut session, registry, &queued) {
                    session.tracked.push(Tracked {
                        title: queued.title.clone(),
                        process,
                        started: Instant::now(),
                        ended: None,
                    });
                }
            }
            session.diagnostics.log("Queued entries have been started.");
        }

        let duration = self
            .supervise(&mut session, &entry.title, initial, started)
            .await;
        self.finish(&mut session, registry, &entry.title, duration);
        session.into_report(Some(duration))
    }

    /// Steps 1–4 for one entry. Returns its main process when it started.
    fn run_branch(
        &self,
        session: &mut Session,
        registry: &Registry,
        entry: &Entry,
    ) -> Option<Box<dyn RunningProcess>> {
        session
            .diagnostics
            .log(format!("Starting entry '{}'...", entry.title));

        if !entry.is_launchable() {
            self.fail_branch(session, entry, RunnerError::NotLaunchable(entry.title.clone()));
            return None;
        }

        let identity = entry.location.display().to_string();
        if session.run_log.contains(&identity) {
            let notice = format!(
                "Entry '{}' was already launched in this session! Skipping...",
                entry.title
            );
            session.diagnostics.log(&notice);
            self.notifier.set_status(&notice);
            return None;
        }
        session.run_log.push(identity);

        for raw in &entry.preloads {
            match Preload::parse(raw) {
                Preload::PlainCommand(path) => self.run_preload(session, entry, &path),
                Preload::EntryReference(title) => {
                    self.queue_reference(session, registry, entry, &title)
                }
            }
        }

        session
            .diagnostics
            .log(format!("Creating process for entry '{}'...", entry.title));
        let request = SpawnRequest::primary(&entry.location, &entry.arguments);
        match self.launcher.spawn(&request) {
            Ok(process) => {
                session.diagnostics.log("Process has been started.");
                session.launched.push(entry.title.clone());
                tracing::info!(entry = %entry.title, "main process started");
                Some(process)
            }
            Err(source) => {
                let err = RunnerError::Spawn {
                    program: entry.location.clone(),
                    source,
                };
                self.fail_branch(session, entry, err);
                None
            }
        }
    }

    fn run_preload(&self, session: &mut Session, entry: &Entry, path: &Path) {
        if path.as_os_str().is_empty() {
            session
                .diagnostics
                .log(format!("Ignoring empty preload in entry '{}'.", entry.title));
            return;
        }
        let key = path.display().to_string();
        session
            .diagnostics
            .log(format!("Starting preload '{key}'..."));

        if session.run_log.contains(&key) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| key.clone());
            let notice = format!(
                "'{name}' has already been called, {} tried to call it again. Skipping...",
                entry.title
            );
            session.diagnostics.log(&notice);
            self.notifier.set_status(&notice);
            return;
        }
        session.run_log.push(key.clone());

        match self.launcher.spawn(&SpawnRequest::preload(path)) {
            // Dropping the handle detaches the preload; it is never waited on.
            Ok(_detached) => session.diagnostics.log("Preload has been started."),
            Err(source) => {
                let err = RunnerError::Spawn {
                    program: path.to_path_buf(),
                    source,
                };
                session.diagnostics.log(format!(
                    "Error while creating process for preload '{key}'! Error:\n{err}"
                ));
                tracing::warn!(preload = %key, error = %err, "preload failed to start");
                self.notifier.warn(&format!(
                    "Unable to start preload '{key}' for entry '{}', continuing without it.",
                    entry.title
                ));
            }
        }
    }

    fn queue_reference(
        &self,
        session: &mut Session,
        registry: &Registry,
        caller: &Entry,
        title: &str,
    ) {
        let Some(callee) = registry.lookup(title) else {
            let message = format!("Entry '{title}' doesn't exist! Skipping...");
            session.diagnostics.log(&message);
            self.notifier.warn(&message);
            return;
        };

        if session
            .run_log
            .contains(&callee.location.display().to_string())
        {
            self.report_cycle(session, caller, callee);
            return;
        }

        session.queue.push_back(callee.title.clone());
        session
            .diagnostics
            .log(format!("Queued next entry '{}'", callee.title));
    }

    fn report_cycle(&self, session: &mut Session, caller: &Entry, callee: &Entry) {
        self.notifier.warn(&format!(
            "Found recursive call of entry '{}' inside entry '{}'! More details in '{}'",
            callee.title, caller.title, self.log_location
        ));
        tracing::warn!(caller = %caller.title, callee = %callee.title, "reference cycle");

        let diag = &mut session.diagnostics;
        diag.log(format!(
            "Found recursive call of '{}' inside '{}'! Call order:",
            callee.title, caller.title
        ));
        diag.raw("\n[RECURSIVE CALL ORDER (start)]");
        let mut indent = 1;
        for identity in &session.run_log {
            diag.raw(format!("\t{}> {identity}", "-".repeat(indent)));
            indent += 1;
        }
        diag.raw("\t[WARNING OCCURRENCE]");
        diag.raw(format!(
            "\t{}> {} >>> called by entry '{}', exists in entry '{}'",
            "-".repeat(indent),
            callee.location.display(),
            caller.title,
            callee.title
        ));
        diag.raw(format!(
            "\t{}> {} >>> called by entry '{}', exists in entry '{}'",
            "-".repeat(indent + 1),
            caller.location.display(),
            callee.title,
            caller.title
        ));
        diag.raw("[RECURSIVE CALL ORDER (end)]");

        session.cycles.push(CycleReport {
            caller: caller.title.clone(),
            callee: callee.title.clone(),
        });
        self.flush_early(session);
    }

    fn fail_branch(&self, session: &mut Session, entry: &Entry, err: RunnerError) {
        session.diagnostics.log(format!(
            "Fatal error while creating process for entry '{}'! Error:\n{err}",
            entry.title
        ));
        tracing::error!(entry = %entry.title, error = %err, "entry failed to start");
        self.flush_early(session);
        self.notifier.warn(&format!(
            "Unable to start entry '{}', skipping! It may require elevated permissions.\nMore details in '{}'.",
            entry.title, self.log_location
        ));
    }

    /// Poll the first main process until it exits (or shutdown is requested).
    async fn supervise(
        &mut self,
        session: &mut Session,
        title: &str,
        mut process: Box<dyn RunningProcess>,
        started: Instant,
    ) -> Duration {
        session.transition(LaunchState::Supervising);
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // consume the first immediate tick

        loop {
            match process.has_exited() {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => {
                    session
                        .diagnostics
                        .log(format!("Unable to check process for '{title}': {err}"));
                    tracing::warn!(entry = %title, error = %err, "process poll failed");
                    break;
                }
            }
            poll_tracked(&mut session.tracked);

            let elapsed = started.elapsed().as_secs_f64();
            self.notifier
                .set_status(&format!("{title}: {}", format_duration(elapsed)));

            tokio::select! {
                _ = ticker.tick() => {}
                _ = wait_for_shutdown(&mut self.shutdown) => {
                    session.diagnostics.log(format!(
                        "Supervision cancelled; '{title}' was left running."
                    ));
                    tracing::info!(entry = %title, "supervision cancelled");
                    break;
                }
            }
        }

        poll_tracked(&mut session.tracked);
        let duration = started.elapsed();
        session.diagnostics.log("Timer has been stopped.");
        duration
    }

    /// Record stats, refresh rows, flush diagnostics, publish final status.
    fn finish(
        &self,
        session: &mut Session,
        registry: &mut Registry,
        title: &str,
        duration: Duration,
    ) {
        session.transition(LaunchState::Completed);
        let secs = duration.as_secs_f64();

        if let Some(entry) = registry.lookup_mut(title) {
            session.diagnostics.log(format!(
                "Changed playtime of '{}' from {} to {}",
                entry.title,
                entry.time_played,
                entry.time_played + secs
            ));
            entry.record_completion(secs);
            self.notifier.refresh_row(entry);
        }

        let now = Instant::now();
        for tracked in session.tracked.drain(..) {
            let played = tracked
                .ended
                .unwrap_or(now)
                .saturating_duration_since(tracked.started)
                .as_secs_f64();
            if let Some(entry) = registry.lookup_mut(&tracked.title) {
                session.diagnostics.log(format!(
                    "Changed playtime of '{}' from {} to {}",
                    entry.title,
                    entry.time_played,
                    entry.time_played + played
                ));
                entry.record_completion(played);
                self.notifier.refresh_row(entry);
            }
        }

        if let Err(err) = session.diagnostics.flush_on_completion(self.sink.as_ref()) {
            tracing::warn!(error = %err, "unable to write diagnostics log");
        }
        tracing::info!(entry = %title, secs, "launch completed");
        self.notifier.set_status(&format!(
            "Entry '{title}' ran for {}",
            format_duration(secs)
        ));
    }

    fn flush_early(&self, session: &mut Session) {
        if let Err(err) = session.diagnostics.flush_early(self.sink.as_ref()) {
            tracing::warn!(error = %err, "unable to write diagnostics log");
        }
    }
}

/// Mark queued main processes that have exited since the last poll.
fn poll_tracked(tracked: &mut [Tracked]) {
    let now = Instant::now();
    for t in tracked.iter_mut().filter(|t| t.ended.is_none()) {
        match t.process.has_exited() {
            Ok(false) => {}
            Ok(true) | Err(_) => t.ended = Some(now),
        }
    }
}

/// Resolves when a shutdown message arrives; never resolves without a
/// receiver or after every sender is gone.
async fn wait_for_shutdown(shutdown: &mut Option<broadcast::Receiver<()>>) {
    match shutdown {
        Some(rx) => match rx.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        },
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::diagnostics::MemorySink;
    use crate::notify::{ChannelNotifier, UiEvent};
    use crate::process::ProcessRole;

    /// Process that reports exit after a fixed number of polls.
    struct FakeProcess {
        polls_left: usize,
    }

    impl RunningProcess for FakeProcess {
        fn has_exited(&mut self) -> io::Result<bool> {
            if self.polls_left == 0 {
                return Ok(true);
            }
            self.polls_left -= 1;
            Ok(false)
        }
    }

    #[derive(Clone, Default)]
    struct FakeLauncher {
        spawned: Arc<Mutex<Vec<SpawnRequest>>>,
        failing: Vec<PathBuf>,
        polls: HashMap<PathBuf, usize>,
    }

    impl FakeLauncher {
        fn failing(mut self, program: &str) -> Self {
            self.failing.push(PathBuf::from(program));
            self
        }

        fn lives_for(mut self, program: &str, polls: usize) -> Self {
            self.polls.insert(PathBuf::from(program), polls);
            self
        }

        fn spawned(&self) -> Vec<SpawnRequest> {
            self.spawned.lock().unwrap().clone()
        }

        fn spawned_programs(&self, role: ProcessRole) -> Vec<String> {
            self.spawned()
                .into_iter()
                .filter(|r| r.role == role)
                .map(|r| r.program.display().to_string())
                .collect()
        }
    }

    impl ProcessLauncher for FakeLauncher {
        fn spawn(&self, request: &SpawnRequest) -> io::Result<Box<dyn RunningProcess>> {
            if self.failing.contains(&request.program) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
            }
            self.spawned.lock().unwrap().push(request.clone());
            let polls = self.polls.get(&request.program).copied().unwrap_or(0);
            Ok(Box::new(FakeProcess { polls_left: polls }))
        }
    }

    struct Harness {
        runner: Runner,
        events: UnboundedReceiver<UiEvent>,
        sink: MemorySink,
        launcher: FakeLauncher,
    }

    impl Harness {
        fn new(launcher: FakeLauncher) -> Self {
            let (notifier, events) = ChannelNotifier::new();
            let sink = MemorySink::default();
            let runner = Runner::new(
                Arc::new(launcher.clone()),
                Arc::new(notifier),
                Arc::new(sink.clone()),
            )
            .with_log_location("/home/test/.titan/titan.log");
            Self {
                runner,
                events,
                sink,
                launcher,
            }
        }

        fn with_shutdown(mut self, rx: broadcast::Receiver<()>) -> Self {
            self.runner = self.runner.with_shutdown(rx);
            self
        }

        fn drain(&mut self) -> Vec<UiEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                out.push(event);
            }
            out
        }
    }

    fn warnings(events: &[UiEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Warning(w) => Some(w.clone()),
                _ => None,
            })
            .collect()
    }

    fn statuses(events: &[UiEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Status(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn entry(title: &str, location: &str, preloads: &[&str]) -> Entry {
        Entry::new(title)
            .with_location(location)
            .with_preloads(preloads.iter().copied())
    }

    fn registry(entries: Vec<Entry>) -> Registry {
        let mut reg = Registry::new();
        for e in entries {
            reg.add(e).expect("unique titles");
        }
        reg
    }

    fn stats(reg: &Registry, title: &str) -> (u64, f64) {
        let e = reg.lookup(title).expect("entry");
        (e.times_opened, e.time_played)
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn single_launch_records_supervised_time() {
        let mut h = Harness::new(FakeLauncher::default().lives_for("/g/a/a", 4));
        let mut reg = registry(vec![entry("A", "/g/a/a", &[])]);

        let report = h.runner.launch(&mut reg, "A").await;

        assert_eq!(report.state, LaunchState::Completed);
        assert_eq!(report.duration, Some(Duration::from_secs(2)));
        let (opened, played) = stats(&reg, "A");
        assert_eq!(opened, 1);
        assert!((played - 2.0).abs() < 1e-6, "played = {played}");

        let events = h.drain();
        let statuses = statuses(&events);
        assert!(statuses.iter().any(|s| s == "A: 00:00:01"));
        assert_eq!(statuses.last().map(String::as_str), Some("Entry 'A' ran for 00:00:02"));
        assert!(events.iter().any(|e| matches!(
            e,
            UiEvent::RefreshRow { title, times_opened: 1, .. } if title == "A"
        )));
        assert_eq!(h.sink.batches().len(), 1, "flushed once on completion");
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn reference_is_launched_after_the_main_process() {
        let mut h = Harness::new(FakeLauncher::default().lives_for("/g/a/a", 2));
        let mut reg = registry(vec![
            entry("A", "/g/a/a", &["ent[B]"]),
            entry("B", "/g/b/b", &[]),
        ]);

        let report = h.runner.launch(&mut reg, "A").await;

        assert_eq!(report.run_log, vec!["/g/a/a", "/g/b/b"]);
        assert_eq!(report.launched, vec!["A", "B"]);
        assert_eq!(
            h.launcher.spawned_programs(ProcessRole::Primary),
            vec!["/g/a/a", "/g/b/b"]
        );
        assert_eq!(stats(&reg, "A").0, 1);
        assert_eq!(stats(&reg, "B").0, 1);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn two_entry_cycle_is_reported_not_relaunched() {
        let mut h = Harness::new(FakeLauncher::default());
        let mut reg = registry(vec![
            entry("A", "/g/a/a", &["ent[B]"]),
            entry("B", "/g/b/b", &["ent[A]"]),
        ]);

        let report = h.runner.launch(&mut reg, "A").await;

        assert_eq!(report.state, LaunchState::Completed);
        assert_eq!(
            h.launcher.spawned_programs(ProcessRole::Primary),
            vec!["/g/a/a", "/g/b/b"],
            "A must not start twice"
        );
        assert_eq!(
            report.cycles,
            vec![CycleReport {
                caller: "B".into(),
                callee: "A".into()
            }]
        );

        let warnings = warnings(&h.drain());
        assert!(warnings
            .iter()
            .any(|w| w.contains("'A'") && w.contains("'B'") && w.contains("titan.log")));

        let lines = h.sink.all_lines();
        let body = lines.concat();
        assert!(body.contains("Found recursive call of 'A' inside 'B'! Call order:"));
        assert!(body.contains("[RECURSIVE CALL ORDER (start)]\n"));
        assert!(body.contains("\t-> /g/a/a\n"));
        assert!(body.contains("\t--> /g/b/b\n"));
        assert!(body.contains(
            "\t---> /g/a/a >>> called by entry 'B', exists in entry 'A'\n"
        ));
        assert!(body.contains(
            "\t----> /g/b/b >>> called by entry 'A', exists in entry 'B'\n"
        ));
        assert_eq!(
            h.sink.batches().len(),
            1,
            "completion flush is suppressed after the cycle flush"
        );
        assert_eq!(stats(&reg, "A").0, 1);
        assert_eq!(stats(&reg, "B").0, 1);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn three_entry_cycle_is_caught_transitively() {
        let mut h = Harness::new(FakeLauncher::default());
        let mut reg = registry(vec![
            entry("A", "/g/a", &["ent[B]"]),
            entry("B", "/g/b", &["ent[C]"]),
            entry("C", "/g/c", &["ent[A]"]),
        ]);

        let report = h.runner.launch(&mut reg, "A").await;

        assert_eq!(report.launched, vec!["A", "B", "C"]);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].caller, "C");
        assert_eq!(report.cycles[0].callee, "A");
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn self_reference_is_a_cycle() {
        let mut h = Harness::new(FakeLauncher::default());
        let mut reg = registry(vec![entry("A", "/g/a", &["ENT[ A ]"])]);

        let report = h.runner.launch(&mut reg, "A").await;

        assert_eq!(report.launched, vec!["A"]);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(stats(&reg, "A").0, 1);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn preloads_start_before_main_in_their_directory() {
        let mut h = Harness::new(FakeLauncher::default());
        let mut reg = registry(vec![entry(
            "A",
            "/g/a/a",
            &["/tools/overlay/overlay", "  /tools/voice/voice  "],
        )]);
        reg.lookup_mut("A").expect("A").arguments = vec!["-fast".into(), "+map e1m1".into()];

        h.runner.launch(&mut reg, "A").await;

        let spawned = h.launcher.spawned();
        assert_eq!(spawned.len(), 3);
        assert_eq!(spawned[0].role, ProcessRole::Preload);
        assert_eq!(spawned[0].program, Path::new("/tools/overlay/overlay"));
        assert_eq!(spawned[0].working_dir.as_deref(), Some(Path::new("/tools/overlay")));
        assert_eq!(spawned[1].program, Path::new("/tools/voice/voice"));
        assert_eq!(spawned[2].role, ProcessRole::Primary);
        assert_eq!(spawned[2].args, vec!["-fast", "+map e1m1"]);
        assert_eq!(spawned[2].working_dir.as_deref(), Some(Path::new("/g/a")));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn shared_preload_runs_once_per_invocation() {
        let mut h = Harness::new(FakeLauncher::default());
        let mut reg = registry(vec![
            entry("A", "/g/a", &["/tools/obs", "ent[B]"]),
            entry("B", "/g/b", &["/tools/obs"]),
        ]);

        h.runner.launch(&mut reg, "A").await;

        assert_eq!(h.launcher.spawned_programs(ProcessRole::Preload), vec!["/tools/obs"]);
        let statuses = statuses(&h.drain());
        assert!(statuses
            .iter()
            .any(|s| s.contains("'obs' has already been called, B tried to call it again")));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn bracketed_path_is_a_plain_preload() {
        let mut h = Harness::new(FakeLauncher::default());
        let mut reg = registry(vec![entry("A", "/g/a", &["/tools[x86]/ent[B]/run"])]);

        h.runner.launch(&mut reg, "A").await;

        assert_eq!(
            h.launcher.spawned_programs(ProcessRole::Preload),
            vec!["/tools[x86]/ent[B]/run"]
        );
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn duplicate_reference_launches_once() {
        let mut h = Harness::new(FakeLauncher::default());
        let mut reg = registry(vec![
            entry("A", "/g/a", &["ent[B]", "ent[B]"]),
            entry("B", "/g/b", &[]),
        ]);

        let report = h.runner.launch(&mut reg, "A").await;

        assert_eq!(report.launched, vec!["A", "B"]);
        assert!(report.cycles.is_empty());
        assert_eq!(stats(&reg, "B").0, 1);
        let statuses = statuses(&h.drain());
        assert!(statuses
            .iter()
            .any(|s| s == "Entry 'B' was already launched in this session! Skipping..."));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn unknown_reference_warns_and_continues() {
        let mut h = Harness::new(FakeLauncher::default());
        let mut reg = registry(vec![entry("A", "/g/a", &["ent[Ghost]", "/tools/obs"])]);

        let report = h.runner.launch(&mut reg, "A").await;

        assert_eq!(report.state, LaunchState::Completed);
        assert_eq!(h.launcher.spawned().len(), 2);
        let warnings = warnings(&h.drain());
        assert_eq!(warnings, vec!["Entry 'Ghost' doesn't exist! Skipping...".to_string()]);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn failed_preload_is_not_fatal() {
        let mut h = Harness::new(FakeLauncher::default().failing("/tools/broken"));
        let mut reg = registry(vec![entry("A", "/g/a", &["/tools/broken"])]);

        let report = h.runner.launch(&mut reg, "A").await;

        assert_eq!(report.state, LaunchState::Completed);
        assert_eq!(report.launched, vec!["A"]);
        assert_eq!(stats(&reg, "A").0, 1);
        let warnings = warnings(&h.drain());
        assert!(warnings[0].contains("Unable to start preload '/tools/broken'"));
        assert!(h.sink.all_lines().concat().contains("Error while creating process for preload"));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn main_spawn_failure_aborts_without_stats() {
        let mut h = Harness::new(FakeLauncher::default().failing("/g/a"));
        let mut reg = registry(vec![
            entry("A", "/g/a", &["ent[B]"]),
            entry("B", "/g/b", &[]),
        ]);

        let report = h.runner.launch(&mut reg, "A").await;

        assert_eq!(report.state, LaunchState::Aborted);
        assert_eq!(report.duration, None);
        assert!(report.launched.is_empty());
        assert_eq!(stats(&reg, "A"), (0, 0.0));
        assert_eq!(stats(&reg, "B"), (0, 0.0), "queued entries are dropped");

        let warnings = warnings(&h.drain());
        assert!(warnings[0].starts_with("Unable to start entry 'A', skipping!"));
        assert!(warnings[0].contains("/home/test/.titan/titan.log"));
        assert!(h
            .sink
            .all_lines()
            .concat()
            .contains("Fatal error while creating process for entry 'A'!"));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn queued_spawn_failure_only_skips_that_branch() {
        let mut h = Harness::new(FakeLauncher::default().failing("/g/b"));
        let mut reg = registry(vec![
            entry("A", "/g/a", &["ent[B]", "ent[C]"]),
            entry("B", "/g/b", &[]),
            entry("C", "/g/c", &[]),
        ]);

        let report = h.runner.launch(&mut reg, "A").await;

        assert_eq!(report.state, LaunchState::Completed);
        assert_eq!(report.launched, vec!["A", "C"]);
        assert_eq!(stats(&reg, "B").0, 0);
        assert_eq!(stats(&reg, "C").0, 1);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn unconfigured_entry_is_not_launchable() {
        let mut h = Harness::new(FakeLauncher::default());
        let mut reg = registry(vec![Entry::new("New Game")]);

        let report = h.runner.launch(&mut reg, "New Game").await;

        assert_eq!(report.state, LaunchState::Aborted);
        assert!(h.launcher.spawned().is_empty());
        assert!(h
            .sink
            .all_lines()
            .concat()
            .contains("has no location configured"));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn missing_entry_aborts() {
        let mut h = Harness::new(FakeLauncher::default());
        let mut reg = Registry::new();

        let report = h.runner.launch(&mut reg, "Nope").await;

        assert_eq!(report.state, LaunchState::Aborted);
        assert_eq!(warnings(&h.drain()), vec!["Entry 'Nope' doesn't exist!".to_string()]);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn queued_entry_gets_its_own_elapsed_time() {
        let mut h = Harness::new(
            FakeLauncher::default()
                .lives_for("/g/a", 6)
                .lives_for("/g/b", 2),
        );
        let mut reg = registry(vec![
            entry("A", "/g/a", &["ent[B]"]),
            entry("B", "/g/b", &[]),
        ]);

        h.runner.launch(&mut reg, "A").await;

        let (_, played_a) = stats(&reg, "A");
        let (opened_b, played_b) = stats(&reg, "B");
        assert!((played_a - 3.0).abs() < 1e-6, "A played {played_a}");
        assert_eq!(opened_b, 1);
        assert!(played_b < played_a, "B exited first ({played_b} vs {played_a})");
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn shutdown_stops_supervision_and_keeps_elapsed_time() {
        let (tx, rx) = broadcast::channel(1);
        let mut h =
            Harness::new(FakeLauncher::default().lives_for("/g/a", usize::MAX)).with_shutdown(rx);
        let mut reg = registry(vec![entry("A", "/g/a", &[])]);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1200)).await;
            let _ = tx.send(());
        });
        let report = h.runner.launch(&mut reg, "A").await;

        assert_eq!(report.state, LaunchState::Completed);
        let (opened, played) = stats(&reg, "A");
        assert_eq!(opened, 1);
        assert!((played - 1.2).abs() < 1e-6, "played = {played}");
        assert!(h.sink.all_lines().concat().contains("was left running"));
    }
}
