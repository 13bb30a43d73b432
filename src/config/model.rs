// src/config/model.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::types::TaskName;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// debounce_ms = 200
/// max_concurrency = 4
/// bell_on_failure = true
/// default_task = "default"
///
/// [task.clean]
/// cmd = "rm -rf build"
///
/// [task."style:build"]
/// cmd = "lessc source/css/main.less build/css/main.css"
///
/// [task.default]
/// series = ["clean", { parallel = ["style:build", "js:build"] }]
///
/// [[watch]]
/// patterns = ["source/css/*.less"]
/// series = ["style:check", "style:build"]
/// ```
///
/// Use `ConfigFile::try_from(raw)` (or [`load_and_validate`]) to get a
/// validated, flattened [`ConfigFile`].
///
/// [`load_and_validate`]: crate::config::load_and_validate
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, RawTaskConfig>,

    /// All `[[watch]]` entries.
    #[serde(default)]
    pub watch: Vec<RawWatchConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Coalescing window for watch triggers, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum number of leaf commands running at once; `0` means no cap.
    #[serde(default)]
    pub max_concurrency: usize,

    /// Ring the terminal bell when a leaf fails.
    #[serde(default)]
    pub bell_on_failure: bool,

    /// Task to run when none is named on the command line.
    #[serde(default)]
    pub default_task: Option<String>,
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_concurrency: 0,
            bell_on_failure: false,
            default_task: None,
        }
    }
}

/// `[task.<name>]` section: exactly one of `cmd`, `series`, `parallel`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawTaskConfig {
    /// Shell command for a leaf task.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Working directory for `cmd`, relative to the config file's directory.
    #[serde(default)]
    pub cwd: Option<String>,

    #[serde(default)]
    pub series: Option<Vec<StepConfig>>,

    #[serde(default)]
    pub parallel: Option<Vec<StepConfig>>,
}

/// One entry of a `series` / `parallel` list: a task name or an inline
/// anonymous group.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StepConfig {
    Name(String),
    Group(GroupConfig),
}

/// Inline `{ series = [...] }` or `{ parallel = [...] }`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    #[serde(default)]
    pub series: Option<Vec<StepConfig>>,

    #[serde(default)]
    pub parallel: Option<Vec<StepConfig>>,
}

/// `[[watch]]` entry: patterns plus exactly one of `task`, `series`,
/// `parallel`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawWatchConfig {
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub task: Option<String>,

    #[serde(default)]
    pub series: Option<Vec<StepConfig>>,

    #[serde(default)]
    pub parallel: Option<Vec<StepConfig>>,
}

/// Validated, flattened task shape.
///
/// Inline groups have been lifted into synthetic tasks, so children are
/// always plain names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSpec {
    Command { cmd: String, cwd: Option<String> },
    Series(Vec<TaskName>),
    Parallel(Vec<TaskName>),
}

impl TaskSpec {
    pub fn children(&self) -> &[TaskName] {
        match self {
            TaskSpec::Command { .. } => &[],
            TaskSpec::Series(children) | TaskSpec::Parallel(children) => children,
        }
    }
}

/// Validated watch entry targeting a single task name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    pub patterns: Vec<String>,
    pub exclude: Vec<String>,
    pub task: TaskName,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>`, which checks task
/// shapes, references, acyclicity and watch entries.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    tasks: BTreeMap<TaskName, TaskSpec>,
    watch: Vec<WatchSpec>,
    /// Names created for inline groups rather than declared by the user.
    synthetic: BTreeSet<TaskName>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        tasks: BTreeMap<TaskName, TaskSpec>,
        watch: Vec<WatchSpec>,
        synthetic: BTreeSet<TaskName>,
    ) -> Self {
        Self {
            config,
            tasks,
            watch,
            synthetic,
        }
    }

    /// All tasks, including synthetic ones created for inline groups.
    pub fn tasks(&self) -> &BTreeMap<TaskName, TaskSpec> {
        &self.tasks
    }

    /// Only the tasks declared as `[task.<name>]`.
    pub fn declared_tasks(&self) -> impl Iterator<Item = (&TaskName, &TaskSpec)> {
        self.tasks
            .iter()
            .filter(|(name, _)| !self.synthetic.contains(*name))
    }

    pub fn is_synthetic(&self, name: &str) -> bool {
        self.synthetic.contains(name)
    }

    pub fn watches(&self) -> &[WatchSpec] {
        &self.watch
    }

    /// Task to run when the CLI names none: `[config].default_task`, else
    /// `"default"`.
    pub fn default_task(&self) -> &str {
        self.config.default_task.as_deref().unwrap_or("default")
    }
}
