// src/config/validate.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{
    ConfigFile, RawConfigFile, RawWatchConfig, StepConfig, TaskSpec, WatchSpec,
};
use crate::errors::{BuildweaveError, Result};
use crate::types::TaskName;
use crate::watch::compile_globs;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildweaveError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        validate_global_config(&raw)?;

        let mut tasks = BTreeMap::new();
        for (name, task) in raw.task.iter() {
            let spec = task_spec(
                name,
                task.cmd.as_ref(),
                task.cwd.as_ref(),
                task.series.as_ref(),
                task.parallel.as_ref(),
                &raw,
                &mut tasks,
            )?;
            tasks.insert(name.clone(), spec);
        }

        let mut watch = Vec::with_capacity(raw.watch.len());
        for (index, entry) in raw.watch.iter().enumerate() {
            watch.push(watch_spec(index, entry, &raw, &mut tasks)?);
        }

        validate_task_references(&tasks)?;
        validate_watch_targets(&watch, &tasks)?;
        validate_graph(&tasks)?;
        validate_default_task(&raw, &tasks)?;

        let synthetic = tasks
            .keys()
            .filter(|name| !raw.task.contains_key(*name))
            .cloned()
            .collect();

        Ok(ConfigFile::new_unchecked(raw.config, tasks, watch, synthetic))
    }
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(BuildweaveError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.debounce_ms == 0 {
        return Err(BuildweaveError::ConfigError(
            "[config].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Turn one task's raw fields into a [`TaskSpec`], lifting inline groups
/// into synthetic tasks named `<name>[<index>]`.
fn task_spec(
    name: &str,
    cmd: Option<&String>,
    cwd: Option<&String>,
    series: Option<&Vec<StepConfig>>,
    parallel: Option<&Vec<StepConfig>>,
    raw: &RawConfigFile,
    tasks: &mut BTreeMap<TaskName, TaskSpec>,
) -> Result<TaskSpec> {
    if cwd.is_some() && cmd.is_none() {
        return Err(BuildweaveError::ConfigError(format!(
            "task '{name}' sets `cwd` but has no `cmd`"
        )));
    }

    match (cmd, series, parallel) {
        (Some(cmd), None, None) => {
            if cmd.trim().is_empty() {
                return Err(BuildweaveError::ConfigError(format!(
                    "task '{name}' has an empty `cmd`"
                )));
            }
            Ok(TaskSpec::Command {
                cmd: cmd.clone(),
                cwd: cwd.cloned(),
            })
        }
        (None, Some(steps), None) => Ok(TaskSpec::Series(flatten_steps(name, steps, raw, tasks)?)),
        (None, None, Some(steps)) => {
            Ok(TaskSpec::Parallel(flatten_steps(name, steps, raw, tasks)?))
        }
        _ => Err(BuildweaveError::ConfigError(format!(
            "task '{name}' must set exactly one of `cmd`, `series` or `parallel`"
        ))),
    }
}

fn flatten_steps(
    parent: &str,
    steps: &[StepConfig],
    raw: &RawConfigFile,
    tasks: &mut BTreeMap<TaskName, TaskSpec>,
) -> Result<Vec<TaskName>> {
    if steps.is_empty() {
        return Err(BuildweaveError::ConfigError(format!(
            "task '{parent}' has an empty `series`/`parallel` list"
        )));
    }

    let mut names = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        match step {
            StepConfig::Name(child) => names.push(child.clone()),
            StepConfig::Group(group) => {
                let synthetic = format!("{parent}[{index}]");
                register_group(
                    &synthetic,
                    group.series.as_ref(),
                    group.parallel.as_ref(),
                    raw,
                    tasks,
                )?;
                names.push(synthetic);
            }
        }
    }
    Ok(names)
}

fn register_group(
    name: &str,
    series: Option<&Vec<StepConfig>>,
    parallel: Option<&Vec<StepConfig>>,
    raw: &RawConfigFile,
    tasks: &mut BTreeMap<TaskName, TaskSpec>,
) -> Result<()> {
    if raw.task.contains_key(name) || tasks.contains_key(name) {
        return Err(BuildweaveError::ConfigError(format!(
            "inline group name '{name}' clashes with a declared task"
        )));
    }

    let spec = match (series, parallel) {
        (Some(steps), None) => TaskSpec::Series(flatten_steps(name, steps, raw, tasks)?),
        (None, Some(steps)) => TaskSpec::Parallel(flatten_steps(name, steps, raw, tasks)?),
        _ => {
            return Err(BuildweaveError::ConfigError(format!(
                "inline group '{name}' must set exactly one of `series` or `parallel`"
            )));
        }
    };

    tasks.insert(name.to_string(), spec);
    Ok(())
}

fn watch_spec(
    index: usize,
    entry: &RawWatchConfig,
    raw: &RawConfigFile,
    tasks: &mut BTreeMap<TaskName, TaskSpec>,
) -> Result<WatchSpec> {
    if entry.patterns.is_empty() {
        return Err(BuildweaveError::ConfigError(format!(
            "[[watch]] entry #{index} has no patterns"
        )));
    }

    compile_globs(&entry.patterns)
        .and_then(|_| compile_globs(&entry.exclude))
        .map_err(|e| BuildweaveError::ConfigError(format!("[[watch]] entry #{index}: {e:#}")))?;

    let task = match (&entry.task, &entry.series, &entry.parallel) {
        (Some(task), None, None) => task.clone(),
        (None, Some(_), None) | (None, None, Some(_)) => {
            let synthetic = format!("watch[{index}]");
            register_group(
                &synthetic,
                entry.series.as_ref(),
                entry.parallel.as_ref(),
                raw,
                tasks,
            )?;
            synthetic
        }
        _ => {
            return Err(BuildweaveError::ConfigError(format!(
                "[[watch]] entry #{index} must set exactly one of `task`, `series` or `parallel`"
            )));
        }
    };

    Ok(WatchSpec {
        patterns: entry.patterns.clone(),
        exclude: entry.exclude.clone(),
        task,
    })
}

fn validate_task_references(tasks: &BTreeMap<TaskName, TaskSpec>) -> Result<()> {
    for (name, spec) in tasks.iter() {
        for child in spec.children() {
            if child == name {
                return Err(BuildweaveError::ConfigError(format!(
                    "task '{name}' cannot list itself as a step"
                )));
            }
            if !tasks.contains_key(child) {
                return Err(BuildweaveError::ConfigError(format!(
                    "task '{name}' has unknown step '{child}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_watch_targets(watch: &[WatchSpec], tasks: &BTreeMap<TaskName, TaskSpec>) -> Result<()> {
    for (index, entry) in watch.iter().enumerate() {
        if !tasks.contains_key(&entry.task) {
            return Err(BuildweaveError::ConfigError(format!(
                "[[watch]] entry #{index} targets unknown task '{}'",
                entry.task
            )));
        }
    }
    Ok(())
}

fn validate_graph(tasks: &BTreeMap<TaskName, TaskSpec>) -> Result<()> {
    // Edge direction: parent -> step.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, spec) in tasks.iter() {
        for child in spec.children() {
            graph.add_edge(name.as_str(), child.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(BuildweaveError::CyclicGraph(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}

fn validate_default_task(raw: &RawConfigFile, tasks: &BTreeMap<TaskName, TaskSpec>) -> Result<()> {
    if let Some(default) = &raw.config.default_task {
        if !tasks.contains_key(default) {
            return Err(BuildweaveError::ConfigError(format!(
                "[config].default_task '{default}' is not a declared task"
            )));
        }
    }
    Ok(())
}
