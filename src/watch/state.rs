// src/watch/state.rs

//! Pure per-task watch state machine.
//!
//! ```text
//! Idle --change--> Pending --run starts--> Running --done--> Idle
//!                     ^                       |
//!                     |                    change
//!                     |                       v
//!                     +-------done------ RunningWithPending
//! ```
//!
//! Any number of changes collapse into the single `Pending` /
//! `RunningWithPending` flag, which is what limits a burst to one re-run.
//! The async worker in [`dispatcher`](crate::watch::dispatcher) drives this
//! machine; it has no Tokio types so it can be tested directly.

/// Watch state of one bound task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchState {
    #[default]
    Idle,
    /// Changes seen, run not started yet (coalescing window).
    Pending,
    Running,
    /// Running, and at least one change arrived since the run started.
    RunningWithPending,
}

impl WatchState {
    /// A matching change was observed.
    pub fn on_change(self) -> Self {
        match self {
            WatchState::Idle | WatchState::Pending => WatchState::Pending,
            WatchState::Running | WatchState::RunningWithPending => {
                WatchState::RunningWithPending
            }
        }
    }

    /// The worker started a run. Only meaningful from `Pending`.
    pub fn on_run_started(self) -> Self {
        match self {
            WatchState::Pending => WatchState::Running,
            other => other,
        }
    }

    /// The in-flight run completed (successfully or not).
    pub fn on_run_finished(self) -> Self {
        match self {
            WatchState::Running => WatchState::Idle,
            WatchState::RunningWithPending => WatchState::Pending,
            other => other,
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, WatchState::Running | WatchState::RunningWithPending)
    }

    /// Whether a (re-)run is owed.
    pub fn has_pending(self) -> bool {
        matches!(self, WatchState::Pending | WatchState::RunningWithPending)
    }
}
