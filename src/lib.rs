// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod graph;
pub mod logging;
pub mod report;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, TaskSpec, build_bindings, build_registry, load_and_validate};
use crate::graph::{ExecutionResult, TaskGraphExecutor};
use crate::report::ConsoleReporter;
use crate::watch::{ChangeEvent, DispatcherOptions, WatchDispatcher, spawn_watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - task registry + executor + console reporter
/// - the initial run of the target task
/// - (unless `--once`) the file watcher and watch dispatcher
/// - Ctrl-C handling
///
/// Returns the initial run's result in `--once` mode, and `Success` after a
/// watch session ends on Ctrl-C.
pub async fn run(args: CliArgs) -> Result<ExecutionResult> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {:?}", config_path))?;

    let target = args
        .task
        .clone()
        .unwrap_or_else(|| cfg.default_task().to_string());

    if args.list {
        print_task_list(&cfg);
        return Ok(ExecutionResult::Success);
    }

    if args.dry_run {
        print_dry_run(&cfg, &target);
        return Ok(ExecutionResult::Success);
    }

    let root = config_root_dir(&config_path);
    let max_concurrency = args.max_concurrency.unwrap_or(cfg.config.max_concurrency);

    let registry = build_registry(&cfg, &root)?;
    let reporter = Arc::new(ConsoleReporter::new(cfg.config.bell_on_failure));
    let executor =
        Arc::new(TaskGraphExecutor::new(registry, reporter).with_max_concurrency(max_concurrency));

    let initial = executor.run(&target).await?;

    if args.once {
        return Ok(initial);
    }

    if cfg.watches().is_empty() {
        info!("no [[watch]] entries configured; exiting after initial run");
        return Ok(initial);
    }

    let options = DispatcherOptions {
        debounce: Duration::from_millis(cfg.config.debounce_ms),
    };
    let mut dispatcher = WatchDispatcher::new(Arc::clone(&executor), options);
    for binding in build_bindings(&cfg)? {
        dispatcher.add_binding(binding)?;
    }

    let (changes_tx, changes_rx) = mpsc::channel::<ChangeEvent>(256);
    let watcher = spawn_watcher(&root, changes_tx)?;
    let handle = dispatcher.start(changes_rx);

    info!(root = ?watcher.root(), "watching for changes; press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C; stopping watch");
    }

    info!("shutdown requested");
    drop(watcher);
    handle.abort();

    Ok(ExecutionResult::Success)
}

/// Figure out the project root used for watching and as the default
/// working directory for commands.
///
/// - If the config path has a non-empty parent (e.g. "site/Buildweave.toml"),
///   we use that directory.
/// - If it's a bare filename, we fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_task_list(cfg: &ConfigFile) {
    for (name, spec) in cfg.declared_tasks() {
        match spec {
            TaskSpec::Command { cmd, .. } => println!("{name:<24} {cmd}"),
            TaskSpec::Series(children) => println!("{name:<24} series {children:?}"),
            TaskSpec::Parallel(children) => println!("{name:<24} parallel {children:?}"),
        }
    }
}

/// Dry-run output: the task tree under `target`, then every watch.
fn print_dry_run(cfg: &ConfigFile, target: &str) {
    println!("buildweave dry-run");
    println!("  config.debounce_ms = {}", cfg.config.debounce_ms);
    println!("  config.max_concurrency = {}", cfg.config.max_concurrency);
    println!();

    println!("task tree ({target}):");
    let mut lines = Vec::new();
    render_tree(cfg, target, 1, &mut Vec::new(), &mut lines);
    for line in lines {
        println!("{line}");
    }

    if !cfg.watches().is_empty() {
        println!();
        println!("watches ({}):", cfg.watches().len());
        for w in cfg.watches() {
            println!("  - {:?} -> {}", w.patterns, w.task);
            if !w.exclude.is_empty() {
                println!("      exclude: {:?}", w.exclude);
            }
        }
    }

    debug!("dry-run complete (no execution)");
}

/// Render `name` and its steps, indented by `depth`.
///
/// The config is validated as acyclic; `path` is only a guard.
pub fn render_tree(
    cfg: &ConfigFile,
    name: &str,
    depth: usize,
    path: &mut Vec<String>,
    out: &mut Vec<String>,
) {
    let indent = "  ".repeat(depth);
    let Some(spec) = cfg.tasks().get(name) else {
        out.push(format!("{indent}{name} (unknown)"));
        return;
    };
    if path.iter().any(|p| p == name) {
        out.push(format!("{indent}{name} (cycle)"));
        return;
    }

    match spec {
        TaskSpec::Command { cmd, .. } => out.push(format!("{indent}{name}: {cmd}")),
        TaskSpec::Series(children) | TaskSpec::Parallel(children) => {
            let kind = if matches!(spec, TaskSpec::Series(_)) {
                "series"
            } else {
                "parallel"
            };
            out.push(format!("{indent}{name} [{kind}]"));
            path.push(name.to_string());
            for child in children {
                render_tree(cfg, child, depth + 1, path, out);
            }
            path.pop();
        }
    }
}
