use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildweave::exec::leaf_fn;
use buildweave::graph::TaskDefinition;
use buildweave::report::{Reporter, TaskReport};
use buildweave::types::ExecutionResult;

#[derive(Debug, Default)]
struct ProbeState {
    /// "start:<name>" / "end:<name>" in the order they happened.
    log: Vec<String>,
    calls: HashMap<String, usize>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
    total_in_flight: usize,
    max_total_in_flight: usize,
}

/// Shared recorder for fake leaves.
///
/// Every leaf created through a probe records when it starts and ends, so
/// tests can assert on call counts, ordering and overlap.
#[derive(Debug, Default, Clone)]
pub struct Probe {
    state: Arc<Mutex<ProbeState>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaf that succeeds immediately.
    pub fn leaf(&self, name: &str) -> TaskDefinition {
        self.leaf_with(name, Duration::ZERO, None)
    }

    /// Leaf that sleeps for `delay`, then succeeds.
    pub fn slow_leaf(&self, name: &str, delay: Duration) -> TaskDefinition {
        self.leaf_with(name, delay, None)
    }

    /// Leaf that fails immediately with `cause`.
    pub fn failing_leaf(&self, name: &str, cause: &str) -> TaskDefinition {
        self.leaf_with(name, Duration::ZERO, Some(cause))
    }

    /// Leaf that sleeps for `delay`, then succeeds or fails with `cause`.
    pub fn leaf_with(&self, name: &str, delay: Duration, fail: Option<&str>) -> TaskDefinition {
        let probe = self.clone();
        let name = name.to_string();
        let fail = fail.map(str::to_string);

        TaskDefinition::Leaf(leaf_fn(move || {
            let probe = probe.clone();
            let name = name.clone();
            let fail = fail.clone();
            async move {
                probe.enter(&name);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                probe.exit(&name);
                match fail {
                    Some(cause) => Err(anyhow::anyhow!(cause)),
                    None => Ok(()),
                }
            }
        }))
    }

    fn enter(&self, name: &str) {
        let mut s = self.state.lock().unwrap();
        s.log.push(format!("start:{name}"));
        *s.calls.entry(name.to_string()).or_default() += 1;

        let current = {
            let n = s.in_flight.entry(name.to_string()).or_default();
            *n += 1;
            *n
        };
        let max = s.max_in_flight.entry(name.to_string()).or_default();
        *max = (*max).max(current);

        s.total_in_flight += 1;
        s.max_total_in_flight = s.max_total_in_flight.max(s.total_in_flight);
    }

    fn exit(&self, name: &str) {
        let mut s = self.state.lock().unwrap();
        s.log.push(format!("end:{name}"));
        if let Some(n) = s.in_flight.get_mut(name) {
            *n -= 1;
        }
        s.total_in_flight -= 1;
    }

    /// How many times the leaf `name` was invoked.
    pub fn calls(&self, name: &str) -> usize {
        self.state.lock().unwrap().calls.get(name).copied().unwrap_or(0)
    }

    /// Total invocations across all leaves.
    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    /// Leaf names in the order they started.
    pub fn started(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|e| e.strip_prefix("start:").map(str::to_string))
            .collect()
    }

    /// Highest number of simultaneous invocations of `name`.
    pub fn max_in_flight(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .max_in_flight
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of simultaneous invocations of any leaves.
    pub fn max_total_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_total_in_flight
    }
}

/// Reporter that keeps every report in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<TaskReport>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<TaskReport> {
        self.reports.lock().unwrap().clone()
    }

    /// Names of reported tasks, in report order.
    pub fn reported_tasks(&self) -> Vec<String> {
        self.reports().into_iter().map(|r| r.task).collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, task: &str, result: &ExecutionResult) {
        self.reports.lock().unwrap().push(TaskReport {
            task: task.to_string(),
            result: result.clone(),
        });
    }
}
