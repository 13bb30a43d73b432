use std::error::Error;

use buildweave::config::{
    ConfigFile, TaskSpec, build_bindings, build_registry, load_and_validate, parse_str,
};
use buildweave::errors::BuildweaveError;
use buildweave::graph::TaskKind;
use buildweave_test_utils::builders::{
    ConfigFileBuilder, TaskConfigBuilder, WatchConfigBuilder, parallel_group, series_group, step,
    steps,
};

type TestResult = Result<(), Box<dyn Error>>;

fn validate(toml: &str) -> Result<ConfigFile, BuildweaveError> {
    ConfigFile::try_from(parse_str(toml)?)
}

fn config_error(toml: &str) -> String {
    match validate(toml) {
        Err(BuildweaveError::ConfigError(msg)) => msg,
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

const PIPELINE: &str = r#"
[config]
debounce_ms = 150
max_concurrency = 4
default_task = "default"

[task.clean]
cmd = "rm -rf build"

[task."style:check"]
cmd = "lesshint source/css"

[task."style:build"]
cmd = "lessc source/css/main.less build/css/main.css"
cwd = "."

[task."js:build"]
cmd = "uglifyjs source/js/app.js -o build/js/app.js"

[task.default]
series = ["clean", { parallel = ["style:build", "js:build"] }]

[[watch]]
patterns = ["source/css/*.less"]
series = ["style:check", "style:build"]

[[watch]]
patterns = ["source/js/**/*.js"]
exclude = ["source/js/vendor/**"]
task = "js:build"
"#;

#[test]
fn parses_pipeline_and_lifts_inline_groups() -> TestResult {
    let cfg = validate(PIPELINE)?;

    assert_eq!(cfg.config.debounce_ms, 150);
    assert_eq!(cfg.config.max_concurrency, 4);
    assert_eq!(cfg.default_task(), "default");

    assert_eq!(
        cfg.tasks().get("default"),
        Some(&TaskSpec::Series(vec![
            "clean".to_string(),
            "default[1]".to_string()
        ]))
    );
    assert_eq!(
        cfg.tasks().get("default[1]"),
        Some(&TaskSpec::Parallel(vec![
            "style:build".to_string(),
            "js:build".to_string()
        ]))
    );
    assert_eq!(
        cfg.tasks().get("style:build"),
        Some(&TaskSpec::Command {
            cmd: "lessc source/css/main.less build/css/main.css".to_string(),
            cwd: Some(".".to_string()),
        })
    );

    let watches = cfg.watches();
    assert_eq!(watches.len(), 2);
    assert_eq!(watches[0].task, "watch[0]");
    assert_eq!(
        cfg.tasks().get("watch[0]"),
        Some(&TaskSpec::Series(vec![
            "style:check".to_string(),
            "style:build".to_string()
        ]))
    );
    assert_eq!(watches[1].task, "js:build");
    assert_eq!(watches[1].exclude, vec!["source/js/vendor/**".to_string()]);
    Ok(())
}

#[test]
fn defaults_apply_when_config_section_is_missing() -> TestResult {
    let cfg = validate("[task.default]\ncmd = \"true\"\n")?;

    assert_eq!(cfg.config.debounce_ms, 200);
    assert_eq!(cfg.config.max_concurrency, 0);
    assert!(!cfg.config.bell_on_failure);
    assert_eq!(cfg.default_task(), "default");
    assert!(cfg.watches().is_empty());
    Ok(())
}

#[test]
fn registry_and_bindings_are_assembled() -> TestResult {
    let cfg = validate(PIPELINE)?;
    let root = std::env::temp_dir();

    let registry = build_registry(&cfg, &root)?;
    assert_eq!(registry.len(), cfg.tasks().len());
    assert_eq!(registry.get("clean").map(|d| d.kind()), Some(TaskKind::Leaf));
    assert_eq!(registry.get("default[1]").map(|d| d.kind()), Some(TaskKind::Parallel));
    registry.resolve("default")?;

    let bindings = build_bindings(&cfg)?;
    assert_eq!(bindings.len(), 2);
    assert!(bindings[0].matches("source/css/main.less"));
    assert!(bindings[1].matches("source/js/app.js"));
    assert!(!bindings[1].matches("source/js/vendor/jquery.js"));
    Ok(())
}

#[test]
fn nested_inline_groups_get_nested_names() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::cmd("echo a").build())
        .with_task("b", TaskConfigBuilder::cmd("echo b").build())
        .with_task("c", TaskConfigBuilder::cmd("echo c").build())
        .with_task(
            "all",
            TaskConfigBuilder::parallel(vec![
                step("a"),
                series_group(vec![step("b"), parallel_group(steps(&["a", "c"]))]),
            ])
            .build(),
        )
        .build();

    assert_eq!(
        cfg.tasks().get("all"),
        Some(&TaskSpec::Parallel(vec!["a".to_string(), "all[1]".to_string()]))
    );
    assert_eq!(
        cfg.tasks().get("all[1]"),
        Some(&TaskSpec::Series(vec!["b".to_string(), "all[1][1]".to_string()]))
    );
    assert_eq!(
        cfg.tasks().get("all[1][1]"),
        Some(&TaskSpec::Parallel(vec!["a".to_string(), "c".to_string()]))
    );
    Ok(())
}

#[test]
fn cycle_is_reported_as_cyclic_graph() {
    let err = validate(
        r#"
[task.A]
series = ["B"]

[task.B]
parallel = ["A"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, BuildweaveError::CyclicGraph(_)));
}

#[test]
fn self_reference_is_rejected() {
    let msg = config_error("[task.A]\nseries = [\"A\"]\n");
    assert!(msg.contains("cannot list itself"), "{msg}");
}

#[test]
fn unknown_step_is_rejected() {
    let msg = config_error("[task.default]\nseries = [\"missing\"]\n");
    assert!(msg.contains("unknown step 'missing'"), "{msg}");
}

#[test]
fn task_shape_must_be_exactly_one_kind() {
    let msg = config_error(
        "[task.a]\ncmd = \"true\"\n\n[task.b]\ncmd = \"true\"\nseries = [\"a\"]\n",
    );
    assert!(msg.contains("exactly one of"), "{msg}");

    let msg = config_error("[task.b]\n");
    assert!(msg.contains("exactly one of"), "{msg}");
}

#[test]
fn empty_command_and_empty_lists_are_rejected() {
    let msg = config_error("[task.a]\ncmd = \"   \"\n");
    assert!(msg.contains("empty `cmd`"), "{msg}");

    let msg = config_error("[task.a]\nparallel = []\n");
    assert!(msg.contains("empty"), "{msg}");
}

#[test]
fn cwd_requires_cmd() {
    let msg = config_error("[task.x]\ncmd = \"true\"\n\n[task.a]\ncwd = \"sub\"\nseries = [\"x\"]\n");
    assert!(msg.contains("`cwd`"), "{msg}");
}

#[test]
fn config_without_tasks_is_rejected() {
    let msg = config_error("[config]\ndebounce_ms = 10\n");
    assert!(msg.contains("at least one"), "{msg}");
}

#[test]
fn zero_debounce_is_rejected() {
    let msg = config_error("[config]\ndebounce_ms = 0\n\n[task.a]\ncmd = \"true\"\n");
    assert!(msg.contains("debounce_ms"), "{msg}");
}

#[test]
fn unknown_default_task_is_rejected() {
    let msg = config_error("[config]\ndefault_task = \"nope\"\n\n[task.a]\ncmd = \"true\"\n");
    assert!(msg.contains("default_task 'nope'"), "{msg}");
}

#[test]
fn unknown_fields_are_rejected() {
    let err = validate("[task.a]\ncmd = \"true\"\nafter = [\"b\"]\n").unwrap_err();
    assert!(matches!(err, BuildweaveError::TomlError(_)));
}

#[test]
fn watch_entries_are_validated() {
    let msg = config_error("[task.a]\ncmd = \"true\"\n\n[[watch]]\npatterns = []\ntask = \"a\"\n");
    assert!(msg.contains("no patterns"), "{msg}");

    let msg = config_error("[task.a]\ncmd = \"true\"\n\n[[watch]]\npatterns = [\"src/**\"]\n");
    assert!(msg.contains("exactly one of"), "{msg}");

    let msg = config_error(
        "[task.a]\ncmd = \"true\"\n\n[[watch]]\npatterns = [\"src/**\"]\ntask = \"ghost\"\n",
    );
    assert!(msg.contains("unknown task 'ghost'"), "{msg}");

    let msg = config_error(
        "[task.a]\ncmd = \"true\"\n\n[[watch]]\npatterns = [\"src/[x\"]\ntask = \"a\"\n",
    );
    assert!(msg.contains("entry #0"), "{msg}");
}

#[test]
fn inline_group_name_cannot_shadow_declared_task() {
    let cfg = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::cmd("true").build())
        .with_task("x[0]", TaskConfigBuilder::cmd("true").build())
        .with_task(
            "x",
            TaskConfigBuilder::series(vec![parallel_group(steps(&["a"]))]).build(),
        )
        .try_build();

    match cfg {
        Err(BuildweaveError::ConfigError(msg)) => assert!(msg.contains("clashes"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn watch_builder_with_parallel_targets_synthetic_task() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_debounce_ms(25)
        .with_default_task("a")
        .with_task("a", TaskConfigBuilder::cmd("true").build())
        .with_task("b", TaskConfigBuilder::cmd("true").build())
        .with_watch(
            WatchConfigBuilder::new(&["src/**/*.rs"])
                .exclude("src/generated/**")
                .parallel(steps(&["a", "b"]))
                .build(),
        )
        .build();

    assert_eq!(cfg.config.debounce_ms, 25);
    assert_eq!(cfg.default_task(), "a");
    assert_eq!(cfg.watches()[0].task, "watch[0]");
    assert_eq!(
        cfg.tasks().get("watch[0]").map(|t| t.children().to_vec()),
        Some(vec!["a".to_string(), "b".to_string()])
    );
    Ok(())
}

#[test]
fn load_and_validate_reads_from_disk() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Buildweave.toml");
    std::fs::write(&path, PIPELINE)?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.watches().len(), 2);

    let missing = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(missing, BuildweaveError::IoError(_)));
    Ok(())
}

#[test]
fn declared_tasks_exclude_only_lifted_groups() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_task("a[b]", TaskConfigBuilder::cmd("true").build())
        .with_task("c", TaskConfigBuilder::cmd("true").build())
        .with_task(
            "x",
            TaskConfigBuilder::series(vec![parallel_group(steps(&["a[b]", "c"]))]).build(),
        )
        .with_watch(WatchConfigBuilder::new(&["src/**"]).series(steps(&["c"])).build())
        .build();

    let declared: Vec<&str> = cfg.declared_tasks().map(|(n, _)| n.as_str()).collect();
    assert_eq!(declared, vec!["a[b]", "c", "x"]);
    assert!(cfg.is_synthetic("x[0]"));
    assert!(cfg.is_synthetic("watch[0]"));
    assert!(!cfg.is_synthetic("a[b]"));
    Ok(())
}
