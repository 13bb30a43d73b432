use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use buildweave::errors::BuildweaveError;
use buildweave::exec::leaf_fn;
use buildweave::graph::{TaskDefinition, TaskGraphExecutor, TaskRegistry};
use buildweave::watch::{ChangeEvent, DispatcherOptions, WatchBinding, WatchDispatcher};
use buildweave_test_utils::probe::{Probe, RecordingReporter};
use buildweave_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const DEBOUNCE: Duration = Duration::from_millis(50);

fn dispatcher_for(registry: TaskRegistry) -> WatchDispatcher {
    dispatcher_reporting_to(registry, &RecordingReporter::new())
}

fn dispatcher_reporting_to(registry: TaskRegistry, reporter: &RecordingReporter) -> WatchDispatcher {
    let executor = TaskGraphExecutor::new(registry, Arc::new(reporter.clone()));
    WatchDispatcher::new(Arc::new(executor), DispatcherOptions { debounce: DEBOUNCE })
}

async fn send(tx: &mpsc::Sender<ChangeEvent>, path: &str) {
    tx.send(ChangeEvent::new(path))
        .await
        .expect("dispatcher dropped the change channel");
}

#[tokio::test]
async fn burst_of_changes_triggers_one_run() -> TestResult {
    init_tracing();
    let probe = Probe::new();
    let mut registry = TaskRegistry::new();
    registry.register("style", probe.slow_leaf("style", Duration::from_millis(20)))?;

    let mut dispatcher = dispatcher_for(registry);
    dispatcher.bind(["source/css/*.less"], "style")?;

    let (tx, rx) = mpsc::channel(64);
    let handle = dispatcher.start(rx);

    for _ in 0..5 {
        send(&tx, "source/css/main.less").await;
        sleep(Duration::from_millis(5)).await;
    }

    sleep(Duration::from_millis(200)).await;
    drop(tx);
    with_timeout(handle.join()).await;

    assert_eq!(probe.calls("style"), 1);
    Ok(())
}

#[tokio::test]
async fn changes_during_run_cause_exactly_one_rerun() -> TestResult {
    init_tracing();
    let probe = Probe::new();
    let mut registry = TaskRegistry::new();
    registry.register("build", probe.slow_leaf("build", Duration::from_millis(300)))?;

    let mut dispatcher = dispatcher_for(registry);
    dispatcher.bind(["src/**"], "build")?;

    let (tx, rx) = mpsc::channel(64);
    let handle = dispatcher.start(rx);

    send(&tx, "src/a.rs").await;
    // Debounce elapses and the first run starts.
    sleep(Duration::from_millis(120)).await;
    assert_eq!(probe.calls("build"), 1);

    for i in 0..6 {
        send(&tx, &format!("src/file{i}.rs")).await;
        sleep(Duration::from_millis(10)).await;
    }

    drop(tx);
    with_timeout(handle.join()).await;

    assert_eq!(probe.calls("build"), 2);
    assert_eq!(probe.max_in_flight("build"), 1, "runs must never overlap");
    Ok(())
}

#[tokio::test]
async fn unmatched_paths_run_nothing() -> TestResult {
    let probe = Probe::new();
    let mut registry = TaskRegistry::new();
    registry.register("js", probe.leaf("js"))?;

    let mut dispatcher = dispatcher_for(registry);
    dispatcher.add_binding(WatchBinding::new(
        &["source/**/*.js".to_string()],
        &["source/vendor/**".to_string()],
        "js",
    )?)?;

    let (tx, rx) = mpsc::channel(64);
    let handle = dispatcher.start(rx);

    send(&tx, "docs/readme.md").await;
    send(&tx, "source/vendor/jquery.js").await;
    sleep(Duration::from_millis(150)).await;
    drop(tx);
    with_timeout(handle.join()).await;

    assert_eq!(probe.calls("js"), 0);
    Ok(())
}

#[tokio::test]
async fn failing_run_keeps_watching() -> TestResult {
    init_tracing();
    let probe = Probe::new();
    let mut registry = TaskRegistry::new();
    registry.register("lint", probe.failing_leaf("lint", "3 problems"))?;

    let mut dispatcher = dispatcher_for(registry);
    dispatcher.bind(["**/*.js"], "lint")?;

    let (tx, rx) = mpsc::channel(64);
    let handle = dispatcher.start(rx);

    send(&tx, "app.js").await;
    sleep(Duration::from_millis(150)).await;
    send(&tx, "lib/util.js").await;
    sleep(Duration::from_millis(150)).await;

    drop(tx);
    with_timeout(handle.join()).await;

    assert_eq!(probe.calls("lint"), 2);
    Ok(())
}

#[tokio::test]
async fn bindings_sharing_a_task_share_one_worker() -> TestResult {
    let probe = Probe::new();
    let mut registry = TaskRegistry::new();
    registry.register("html", probe.slow_leaf("html", Duration::from_millis(20)))?;

    let mut dispatcher = dispatcher_for(registry);
    dispatcher.bind(["source/*.html"], "html")?;
    dispatcher.bind(["source/**"], "html")?;
    assert_eq!(dispatcher.bindings().len(), 2);

    let (tx, rx) = mpsc::channel(64);
    let handle = dispatcher.start(rx);

    send(&tx, "source/index.html").await;
    sleep(Duration::from_millis(150)).await;
    drop(tx);
    with_timeout(handle.join()).await;

    assert_eq!(probe.calls("html"), 1);
    Ok(())
}

#[tokio::test]
async fn different_tasks_run_independently() -> TestResult {
    let probe = Probe::new();
    let mut registry = TaskRegistry::new();
    registry.register("style", probe.slow_leaf("style", Duration::from_millis(100)))?;
    registry.register("reload", probe.slow_leaf("reload", Duration::from_millis(100)))?;

    let mut dispatcher = dispatcher_for(registry);
    dispatcher.bind(["source/css/*.less"], "style")?;
    dispatcher.bind(["source/**"], "reload")?;

    let (tx, rx) = mpsc::channel(64);
    let handle = dispatcher.start(rx);

    send(&tx, "source/css/main.less").await;
    sleep(Duration::from_millis(250)).await;
    drop(tx);
    with_timeout(handle.join()).await;

    assert_eq!(probe.calls("style"), 1);
    assert_eq!(probe.calls("reload"), 1);
    assert_eq!(probe.max_total_in_flight(), 2);
    Ok(())
}

#[tokio::test]
async fn composite_targets_are_watchable() -> TestResult {
    let probe = Probe::new();
    let mut registry = TaskRegistry::new();
    registry.register("style", TaskDefinition::series(["style:check", "style:build"]))?;
    registry.register("style:check", probe.leaf("style:check"))?;
    registry.register("style:build", probe.leaf("style:build"))?;

    let mut dispatcher = dispatcher_for(registry);
    dispatcher.bind(["source/css/*.less"], "style")?;

    let (tx, rx) = mpsc::channel(64);
    let handle = dispatcher.start(rx);

    send(&tx, "source/css/main.less").await;
    sleep(Duration::from_millis(150)).await;
    drop(tx);
    with_timeout(handle.join()).await;

    assert_eq!(probe.started(), vec!["style:check", "style:build"]);
    Ok(())
}

#[test]
fn binding_unknown_task_fails() {
    let mut dispatcher = dispatcher_for(TaskRegistry::new());

    let err = dispatcher.bind(["src/**"], "missing").unwrap_err();
    assert!(matches!(err, BuildweaveError::UnknownTask(ref n) if n == "missing"));
    assert!(dispatcher.bindings().is_empty());
}

#[test]
fn binding_bad_glob_is_a_config_error() -> TestResult {
    let probe = Probe::new();
    let mut registry = TaskRegistry::new();
    registry.register("x", probe.leaf("x"))?;
    let mut dispatcher = dispatcher_for(registry);

    let err = dispatcher.bind(["src/[oops"], "x").unwrap_err();
    assert!(matches!(err, BuildweaveError::ConfigError(_)));
    Ok(())
}

#[tokio::test]
async fn panicking_run_keeps_watching() -> TestResult {
    init_tracing();
    let reporter = RecordingReporter::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let mut registry = TaskRegistry::new();
    registry.register(
        "bundle",
        TaskDefinition::Leaf(leaf_fn(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    panic!("bundler crashed");
                }
                Ok(())
            }
        })),
    )?;

    let mut dispatcher = dispatcher_reporting_to(registry, &reporter);
    dispatcher.bind(["**/*.js"], "bundle")?;

    let (tx, rx) = mpsc::channel(64);
    let handle = dispatcher.start(rx);

    send(&tx, "a.js").await;
    sleep(Duration::from_millis(150)).await;
    send(&tx, "b.js").await;
    sleep(Duration::from_millis(150)).await;

    drop(tx);
    with_timeout(handle.join()).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let results: Vec<bool> = reporter
        .reports()
        .iter()
        .map(|r| r.result.is_success())
        .collect();
    assert_eq!(results, vec![false, true]);
    Ok(())
}

#[tokio::test]
async fn steady_changes_still_get_runs() -> TestResult {
    init_tracing();
    let probe = Probe::new();
    let mut registry = TaskRegistry::new();
    registry.register("gen", probe.leaf("gen"))?;

    let mut dispatcher = dispatcher_for(registry);
    dispatcher.bind(["out/**"], "gen")?;

    let (tx, rx) = mpsc::channel(64);
    let handle = dispatcher.start(rx);

    // Faster than the debounce window, for well over the max wait.
    for i in 0..40 {
        send(&tx, &format!("out/chunk{i}.bin")).await;
        sleep(Duration::from_millis(30)).await;
    }
    let runs_while_busy = probe.calls("gen");

    drop(tx);
    with_timeout(handle.join()).await;

    assert!(
        runs_while_busy >= 2,
        "expected runs during a steady stream, got {runs_while_busy}"
    );
    assert_eq!(probe.max_in_flight("gen"), 1);
    Ok(())
}
