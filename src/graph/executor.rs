// src/graph/executor.rs

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::errors::{BuildweaveError, Result};
use crate::exec::LeafUnit;
use crate::graph::definition::TaskDefinition;
use crate::graph::registry::TaskRegistry;
use crate::report::Reporter;
use crate::types::{ExecutionResult, TaskFailure};

type NodeFuture<'a> = Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + 'a>>;

/// Runs registered tasks to completion.
///
/// The registry is owned and never mutated after construction, so a single
/// executor can be shared (`Arc<TaskGraphExecutor>`) between the startup run
/// and every watch worker.
///
/// Semantics:
/// - **Leaf**: invoke the unit, await it, report `(task, result)`.
/// - **Series**: children in order; the first failure stops the series and
///   becomes its result.
/// - **Parallel**: all children concurrently, all awaited; if several fail
///   the first failure *in declared order* is returned.
pub struct TaskGraphExecutor {
    registry: TaskRegistry,
    reporter: Arc<dyn Reporter>,
    /// Caps how many leaf units execute at once. Composite tasks never hold
    /// a permit.
    limiter: Option<Semaphore>,
}

impl fmt::Debug for TaskGraphExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGraphExecutor")
            .field("tasks", &self.registry.len())
            .field("limited", &self.limiter.is_some())
            .finish_non_exhaustive()
    }
}

impl TaskGraphExecutor {
    pub fn new(registry: TaskRegistry, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            registry,
            reporter,
            limiter: None,
        }
    }

    /// Allow at most `max` leaf units to run concurrently. `0` means no cap.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.limiter = if max == 0 {
            None
        } else {
            Some(Semaphore::new(max))
        };
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Resolve and execute the named task.
    ///
    /// Configuration problems (`UnknownTask`, `CyclicGraph`) are detected
    /// before any leaf starts and returned as errors. Leaf failures are not
    /// errors: they come back as [`ExecutionResult::Failure`].
    pub async fn run(&self, name: &str) -> Result<ExecutionResult> {
        self.registry.resolve(name)?;

        info!(task = %name, "running task");
        let started = Instant::now();

        let result = self.run_node(name).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            ExecutionResult::Success => {
                info!(task = %name, elapsed_ms, "task finished successfully");
            }
            ExecutionResult::Failure(failure) => {
                warn!(
                    task = %name,
                    failed_leaf = %failure.task,
                    elapsed_ms,
                    "task finished with failure"
                );
            }
        }

        Ok(result)
    }

    fn run_node<'a>(&'a self, name: &'a str) -> NodeFuture<'a> {
        Box::pin(async move {
            let definition = self
                .registry
                .get(name)
                .ok_or_else(|| BuildweaveError::UnknownTask(name.to_string()))?;

            match definition {
                TaskDefinition::Leaf(unit) => self.run_leaf(name, unit.as_ref()).await,
                TaskDefinition::Series(children) => self.run_series(name, children).await,
                TaskDefinition::Parallel(children) => self.run_parallel(name, children).await,
            }
        })
    }

    async fn run_leaf(&self, name: &str, unit: &dyn LeafUnit) -> Result<ExecutionResult> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await.map_err(anyhow::Error::from)?),
            None => None,
        };

        debug!(task = %name, unit = %unit.describe(), "invoking leaf");
        let started = Instant::now();

        // A panicking leaf is a failed leaf, same as `BlockingLeaf`.
        let result = match AssertUnwindSafe(unit.invoke()).catch_unwind().await {
            Ok(Ok(())) => ExecutionResult::Success,
            Ok(Err(err)) => ExecutionResult::Failure(TaskFailure {
                task: name.to_string(),
                cause: format!("{err:#}"),
            }),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(task = %name, panic = %message, "leaf panicked");
                ExecutionResult::Failure(TaskFailure {
                    task: name.to_string(),
                    cause: format!("leaf panicked: {message}"),
                })
            }
        };

        debug!(
            task = %name,
            success = result.is_success(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "leaf finished"
        );

        self.reporter.report(name, &result);
        Ok(result)
    }

    async fn run_series(&self, name: &str, children: &[String]) -> Result<ExecutionResult> {
        for child in children {
            let result = self.run_node(child).await?;
            if let ExecutionResult::Failure(failure) = result {
                debug!(
                    task = %name,
                    child = %child,
                    failed_leaf = %failure.task,
                    "series stopped at failing child"
                );
                return Ok(ExecutionResult::Failure(failure));
            }
        }
        Ok(ExecutionResult::Success)
    }

    async fn run_parallel(&self, name: &str, children: &[String]) -> Result<ExecutionResult> {
        let results = join_all(children.iter().map(|child| self.run_node(child))).await;

        let mut first_failure: Option<TaskFailure> = None;
        for (child, result) in children.iter().zip(results) {
            if let ExecutionResult::Failure(failure) = result? {
                if first_failure.is_none() {
                    first_failure = Some(failure);
                } else {
                    debug!(
                        task = %name,
                        child = %child,
                        failed_leaf = %failure.task,
                        "additional parallel failure (not the reported one)"
                    );
                }
            }
        }

        Ok(match first_failure {
            Some(failure) => ExecutionResult::Failure(failure),
            None => ExecutionResult::Success,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
