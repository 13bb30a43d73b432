// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::types::TaskName;

/// Compiled glob patterns bound to one target task.
///
/// Patterns are evaluated against paths relative to the watch root, using
/// forward slashes (e.g. `"source/css/main.less"`). A single `*` does not
/// cross directory separators; use `**` for that.
#[derive(Clone)]
pub struct WatchBinding {
    task: TaskName,
    patterns: Vec<String>,
    exclude: Vec<String>,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("task", &self.task)
            .field("patterns", &self.patterns)
            .field("exclude", &self.exclude)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    /// Compile `patterns` (and optional `exclude` patterns) for `task`.
    pub fn new<N: Into<TaskName>>(
        patterns: &[String],
        exclude: &[String],
        task: N,
    ) -> Result<Self> {
        let task = task.into();

        if patterns.is_empty() {
            anyhow::bail!("watch binding for task '{task}' has no patterns");
        }

        let watch_set = compile_globs(patterns)
            .with_context(|| format!("building watch globset for task {task}"))?;

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                compile_globs(exclude)
                    .with_context(|| format!("building exclude globset for task {task}"))?,
            )
        };

        Ok(Self {
            task,
            patterns: patterns.to_vec(),
            exclude: exclude.to_vec(),
            watch_set,
            exclude_set,
        })
    }

    /// Name of the task this binding triggers.
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// Returns true if a change to `rel_path` should trigger this binding.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build a `GlobSet` from string patterns, with `/`-aware `*`.
pub fn compile_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
