// src/watch/dispatcher.rs

//! Turns change events into debounced task runs.
//!
//! One router task receives [`ChangeEvent`]s and pings a worker per bound
//! task name. Each worker owns a [`WatchState`] and guarantees:
//! - a burst of changes inside the debounce window produces one run;
//! - changes during a run collapse into a single re-run afterwards;
//! - runs of the same task never overlap.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};

use crate::errors::{BuildweaveError, Result};
use crate::graph::{ExecutionResult, TaskGraphExecutor};
use crate::types::TaskName;
use crate::watch::patterns::WatchBinding;
use crate::watch::state::WatchState;

/// Default coalescing window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Upper bound on one coalescing wait, in debounce windows. A steady stream
/// of changes still gets a run at least this often.
pub const MAX_WAIT_WINDOWS: u32 = 4;

/// A changed path, relative to the watch root with forward slashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: String,
}

impl ChangeEvent {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DispatcherOptions {
    /// Quiet period required after the last matching change before a run
    /// starts.
    pub debounce: Duration,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Binds glob patterns to tasks and runs them on matching changes.
pub struct WatchDispatcher {
    executor: Arc<TaskGraphExecutor>,
    bindings: Vec<WatchBinding>,
    options: DispatcherOptions,
}

impl fmt::Debug for WatchDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchDispatcher")
            .field("bindings", &self.bindings)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl WatchDispatcher {
    pub fn new(executor: Arc<TaskGraphExecutor>, options: DispatcherOptions) -> Self {
        Self {
            executor,
            bindings: Vec::new(),
            options,
        }
    }

    /// Bind `patterns` to `task`.
    pub fn bind<I, S>(&mut self, patterns: I, task: &str) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let binding = WatchBinding::new(&patterns, &[], task)
            .map_err(|e| BuildweaveError::ConfigError(format!("{e:#}")))?;
        self.add_binding(binding)
    }

    /// Register an already compiled binding.
    ///
    /// The target task must be registered with the executor.
    pub fn add_binding(&mut self, binding: WatchBinding) -> Result<()> {
        if !self.executor.registry().contains(binding.task()) {
            return Err(BuildweaveError::UnknownTask(binding.task().to_string()));
        }

        info!(
            task = %binding.task(),
            patterns = ?binding.patterns(),
            "watch bound"
        );
        self.bindings.push(binding);
        Ok(())
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Start routing `changes` to per-task workers.
    ///
    /// The dispatcher runs until the sending side of `changes` is dropped;
    /// workers then finish any run that is in flight or owed and exit.
    pub fn start(self, changes: mpsc::Receiver<ChangeEvent>) -> DispatcherHandle {
        let mut senders: HashMap<TaskName, mpsc::UnboundedSender<()>> = HashMap::new();
        let mut workers = Vec::new();

        for binding in &self.bindings {
            if senders.contains_key(binding.task()) {
                continue;
            }
            let (tx, rx) = mpsc::unbounded_channel();
            let task = binding.task().to_string();
            senders.insert(task.clone(), tx);
            workers.push(tokio::spawn(worker_loop(
                task,
                Arc::clone(&self.executor),
                rx,
                self.options.debounce,
            )));
        }

        let router = tokio::spawn(route_changes(self.bindings, senders, changes));

        DispatcherHandle { router, workers }
    }
}

/// Handle to a running dispatcher.
#[derive(Debug)]
pub struct DispatcherHandle {
    router: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl DispatcherHandle {
    /// Wait until the router and every worker have exited.
    pub async fn join(self) {
        if let Err(err) = self.router.await {
            warn!(error = %err, "watch router task ended abnormally");
        }
        for worker in self.workers {
            if let Err(err) = worker.await {
                warn!(error = %err, "watch worker task ended abnormally");
            }
        }
    }

    /// Stop routing and abort all workers, including in-flight runs.
    pub fn abort(&self) {
        self.router.abort();
        for worker in &self.workers {
            worker.abort();
        }
    }
}

async fn route_changes(
    bindings: Vec<WatchBinding>,
    senders: HashMap<TaskName, mpsc::UnboundedSender<()>>,
    mut changes: mpsc::Receiver<ChangeEvent>,
) {
    debug!(bindings = bindings.len(), "watch router started");

    while let Some(change) = changes.recv().await {
        for binding in bindings.iter().filter(|b| b.matches(&change.path)) {
            debug!(task = %binding.task(), path = %change.path, "watch match");
            if let Some(tx) = senders.get(binding.task()) {
                if tx.send(()).is_err() {
                    warn!(task = %binding.task(), "watch worker gone; dropping change");
                }
            }
        }
    }

    debug!("change channel closed; watch router exiting");
    // Dropping `senders` lets idle workers exit.
}

async fn worker_loop(
    task: TaskName,
    executor: Arc<TaskGraphExecutor>,
    mut pings: mpsc::UnboundedReceiver<()>,
    debounce: Duration,
) {
    let mut state = WatchState::Idle;
    let mut closed = false;

    loop {
        if !state.has_pending() {
            if closed || pings.recv().await.is_none() {
                break;
            }
            state = state.on_change();
        }

        if !closed {
            closed = !coalesce(&mut pings, debounce).await;
        }

        state = state.on_run_started();
        debug!(task = %task, ?state, "watch triggered run");

        let run = executor.run(&task);
        tokio::pin!(run);

        let outcome = loop {
            tokio::select! {
                outcome = &mut run => break outcome,
                ping = pings.recv(), if !closed => match ping {
                    Some(()) => {
                        if !state.has_pending() {
                            info!(task = %task, "change during run; re-run queued");
                        }
                        state = state.on_change();
                    }
                    None => closed = true,
                },
            }
        };

        match outcome {
            Ok(ExecutionResult::Success) => {
                info!(task = %task, "watch run succeeded");
            }
            Ok(ExecutionResult::Failure(failure)) => {
                warn!(
                    task = %task,
                    failed_leaf = %failure.task,
                    "watch run failed; still watching"
                );
            }
            Err(err) => {
                error!(task = %task, error = %err, "watch run could not start; still watching");
            }
        }

        state = state.on_run_finished();
    }

    debug!(task = %task, "watch worker exiting");
}

/// Absorb pings until `window` passes without one, or until
/// `MAX_WAIT_WINDOWS * window` has passed since coalescing began.
///
/// Returns `false` if the channel closed while waiting.
async fn coalesce(pings: &mut mpsc::UnboundedReceiver<()>, window: Duration) -> bool {
    let deadline = Instant::now() + window * MAX_WAIT_WINDOWS;
    let mut absorbed = 0usize;
    loop {
        let now = Instant::now();
        if now >= deadline {
            debug!(absorbed, "changes still arriving; running anyway");
            return true;
        }
        let quiet_until = (now + window).min(deadline);
        match timeout_at(quiet_until, pings.recv()).await {
            Ok(Some(())) => absorbed += 1,
            Ok(None) => return false,
            Err(_elapsed) => {
                if absorbed > 0 {
                    debug!(absorbed, "coalesced extra changes into one run");
                }
                return true;
            }
        }
    }
}
