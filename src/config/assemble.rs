// src/config/assemble.rs

//! Turn a validated [`ConfigFile`] into runtime objects.

use std::path::Path;

use crate::config::model::{ConfigFile, TaskSpec};
use crate::errors::{BuildweaveError, Result};
use crate::exec::ShellCommand;
use crate::graph::{TaskDefinition, TaskRegistry};
use crate::watch::WatchBinding;

/// Register every configured task.
///
/// Commands run from `root` (normally the config file's directory), or from
/// `root.join(cwd)` when the task sets `cwd`.
pub fn build_registry(cfg: &ConfigFile, root: &Path) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();

    for (name, spec) in cfg.tasks() {
        let definition = match spec {
            TaskSpec::Command { cmd, cwd } => {
                let dir = match cwd {
                    Some(cwd) => root.join(cwd),
                    None => root.to_path_buf(),
                };
                TaskDefinition::leaf(ShellCommand::new(cmd.clone()).with_cwd(dir))
            }
            TaskSpec::Series(children) => TaskDefinition::series(children.iter().cloned()),
            TaskSpec::Parallel(children) => TaskDefinition::parallel(children.iter().cloned()),
        };
        registry.register(name.clone(), definition)?;
    }

    registry.validate()?;
    Ok(registry)
}

/// Compile every `[[watch]]` entry.
pub fn build_bindings(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    cfg.watches()
        .iter()
        .map(|w| {
            WatchBinding::new(&w.patterns, &w.exclude, w.task.clone())
                .map_err(|e| BuildweaveError::ConfigError(format!("{e:#}")))
        })
        .collect()
}
