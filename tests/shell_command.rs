#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use buildweave::config::{build_registry, load_and_validate};
use buildweave::exec::{LeafUnit, ShellCommand};
use buildweave::graph::{ExecutionResult, TaskGraphExecutor};
use buildweave_test_utils::probe::RecordingReporter;
use buildweave_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn successful_command_resolves_ok() -> TestResult {
    init_tracing();
    let cmd = ShellCommand::new("echo hello");
    with_timeout(cmd.invoke()).await?;
    assert_eq!(cmd.describe(), "echo hello");
    Ok(())
}

#[tokio::test]
async fn failing_command_carries_exit_code_and_stderr_tail() {
    init_tracing();
    let cmd = ShellCommand::new("echo 'bad things' >&2; exit 3");

    let err = with_timeout(cmd.invoke()).await.unwrap_err();
    let msg = format!("{err:#}");

    assert!(msg.contains("exited with code 3"), "{msg}");
    assert!(msg.contains("bad things"), "{msg}");
}

#[tokio::test]
async fn command_runs_in_its_working_directory() -> TestResult {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join("sub"))?;

    let cmd = ShellCommand::new("touch marker").with_cwd(dir.path().join("sub"));
    with_timeout(cmd.invoke()).await?;

    assert!(dir.path().join("sub").join("marker").exists());
    Ok(())
}

#[tokio::test]
async fn configured_pipeline_runs_end_to_end() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join("source"))?;
    std::fs::write(dir.path().join("source").join("main.less"), "a { }")?;

    let path = dir.path().join("Buildweave.toml");
    std::fs::write(
        &path,
        r#"
[task.clean]
cmd = "rm -rf build && mkdir -p build"

[task.style]
cmd = "cp source/main.less build/main.css"

[task.stamp]
cmd = "echo done > stamp.txt"
cwd = "build"

[task.default]
series = ["clean", { parallel = ["style", "stamp"] }]

[task.broken]
series = ["clean", "fail", "style"]

[task.fail]
cmd = "echo 'syntax error' >&2; exit 2"
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    let registry = build_registry(&cfg, dir.path())?;
    let reporter = RecordingReporter::new();
    let executor = TaskGraphExecutor::new(registry, Arc::new(reporter.clone()));

    let result = with_timeout(executor.run("default")).await?;
    assert_eq!(result, ExecutionResult::Success);
    assert!(dir.path().join("build").join("main.css").exists());
    assert!(dir.path().join("build").join("stamp.txt").exists());

    let result = with_timeout(executor.run("broken")).await?;
    let failure = result.failure_ref().expect("broken must fail");
    assert_eq!(failure.task, "fail");
    assert!(failure.cause.contains("syntax error"), "{}", failure.cause);
    // `clean` wiped build/ and `style` never ran again.
    assert!(!dir.path().join("build").join("main.css").exists());
    Ok(())
}

#[tokio::test]
async fn background_process_does_not_hold_the_leaf_open() -> TestResult {
    init_tracing();
    let cmd = ShellCommand::new("echo serving; sleep 3 & exit 0");

    let started = Instant::now();
    tokio::time::timeout(Duration::from_secs(2), cmd.invoke()).await??;

    assert!(started.elapsed() < Duration::from_secs(2));
    Ok(())
}
