// src/report.rs

//! Reporting collaborators.
//!
//! The executor forwards every leaf outcome to a [`Reporter`] and does no
//! formatting of its own. What happens next (console line, bell, a message
//! to a live-reload bridge) is entirely up to the reporter.

use std::fmt;
use std::io::Write;

use colored::Colorize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::types::{ExecutionResult, TaskName};

/// Receives `(task, result)` for every leaf execution.
pub trait Reporter: Send + Sync {
    fn report(&self, task: &str, result: &ExecutionResult);
}

/// Owned copy of a single report, as sent by [`ChannelReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: TaskName,
    pub result: ExecutionResult,
}

/// Prints one coloured status line per leaf to stdout.
///
/// Logs go to stderr through `tracing`; these lines go to stdout next to the
/// tools' own output.
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    bell_on_failure: bool,
}

impl ConsoleReporter {
    pub fn new(bell_on_failure: bool) -> Self {
        Self { bell_on_failure }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, task: &str, result: &ExecutionResult) {
        match result {
            ExecutionResult::Success => {
                info!(task = %task, "task succeeded");
                println!("{} {} {}", "[buildweave]".dimmed(), "ok".green(), task.cyan());
            }
            ExecutionResult::Failure(failure) => {
                error!(task = %task, cause = %failure.cause, "task failed");
                println!(
                    "{} {} {}: {}",
                    "[buildweave]".dimmed(),
                    "FAILED".red().bold(),
                    task.magenta(),
                    failure.cause
                );
                if self.bell_on_failure {
                    let mut out = std::io::stdout();
                    let _ = out.write_all(b"\x07");
                    let _ = out.flush();
                }
            }
        }
    }
}

/// Forwards reports onto an unbounded channel, fire-and-forget.
///
/// Useful for bridging build results to something that lives in its own
/// task, e.g. a live-reload notifier. A closed receiver is not an error.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<TaskReport>,
}

impl ChannelReporter {
    pub fn new(tx: mpsc::UnboundedSender<TaskReport>) -> Self {
        Self { tx }
    }

    /// Build a reporter together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TaskReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Reporter for ChannelReporter {
    fn report(&self, task: &str, result: &ExecutionResult) {
        let report = TaskReport {
            task: task.to_string(),
            result: result.clone(),
        };
        if self.tx.send(report).is_err() {
            debug!(task = %task, "report receiver dropped; discarding");
        }
    }
}

/// Sends each report to every inner reporter, in order.
#[derive(Default)]
pub struct FanoutReporter {
    inner: Vec<Box<dyn Reporter>>,
}

impl fmt::Debug for FanoutReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanoutReporter")
            .field("sinks", &self.inner.len())
            .finish()
    }
}

impl FanoutReporter {
    pub fn new() -> Self {
        Self { inner: Vec::new() }
    }

    pub fn with(mut self, reporter: impl Reporter + 'static) -> Self {
        self.inner.push(Box::new(reporter));
        self
    }
}

impl Reporter for FanoutReporter {
    fn report(&self, task: &str, result: &ExecutionResult) {
        for reporter in &self.inner {
            reporter.report(task, result);
        }
    }
}
