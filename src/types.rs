// src/types.rs

//! Small shared types used across the graph, watch and report layers.

use std::fmt;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Shape of a registered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Performs a transformation through an opaque [`LeafUnit`](crate::exec::LeafUnit).
    Leaf,
    /// Runs its children one after another, stopping at the first failure.
    Series,
    /// Runs all children concurrently and waits for every one of them.
    Parallel,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Leaf => "leaf",
            TaskKind::Series => "series",
            TaskKind::Parallel => "parallel",
        };
        f.write_str(s)
    }
}

/// Failure of a single leaf, carried up through every composite parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Name of the leaf that originally failed.
    pub task: TaskName,
    /// Human-readable cause (error chain of the leaf unit).
    pub cause: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task '{}' failed: {}", self.task, self.cause)
    }
}

/// Outcome of running a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success,
    Failure(TaskFailure),
}

impl ExecutionResult {
    pub fn failure(task: impl Into<TaskName>, cause: impl Into<String>) -> Self {
        ExecutionResult::Failure(TaskFailure {
            task: task.into(),
            cause: cause.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success)
    }

    /// The originating failure, if any.
    pub fn failure_ref(&self) -> Option<&TaskFailure> {
        match self {
            ExecutionResult::Success => None,
            ExecutionResult::Failure(f) => Some(f),
        }
    }
}
