#![allow(dead_code)]

use buildweave::config::{
    ConfigFile, GroupConfig, RawConfigFile, RawTaskConfig, RawWatchConfig, StepConfig,
};
use buildweave::errors::BuildweaveError;

/// Builder for `ConfigFile` to simplify test setup.
#[derive(Debug, Default)]
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, name: &str, task: RawTaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_watch(mut self, watch: RawWatchConfig) -> Self {
        self.config.watch.push(watch);
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.config.config.max_concurrency = n;
        self
    }

    pub fn with_default_task(mut self, name: &str) -> Self {
        self.config.config.default_task = Some(name.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile, BuildweaveError> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// Builder for `[task.<name>]` entries.
#[derive(Debug, Default)]
pub struct TaskConfigBuilder {
    task: RawTaskConfig,
}

impl TaskConfigBuilder {
    pub fn cmd(cmd: &str) -> Self {
        Self {
            task: RawTaskConfig {
                cmd: Some(cmd.to_string()),
                ..RawTaskConfig::default()
            },
        }
    }

    pub fn series(steps: Vec<StepConfig>) -> Self {
        Self {
            task: RawTaskConfig {
                series: Some(steps),
                ..RawTaskConfig::default()
            },
        }
    }

    pub fn parallel(steps: Vec<StepConfig>) -> Self {
        Self {
            task: RawTaskConfig {
                parallel: Some(steps),
                ..RawTaskConfig::default()
            },
        }
    }

    pub fn cwd(mut self, dir: &str) -> Self {
        self.task.cwd = Some(dir.to_string());
        self
    }

    pub fn build(self) -> RawTaskConfig {
        self.task
    }
}

/// Builder for `[[watch]]` entries.
#[derive(Debug, Default)]
pub struct WatchConfigBuilder {
    watch: RawWatchConfig,
}

impl WatchConfigBuilder {
    pub fn new(patterns: &[&str]) -> Self {
        Self {
            watch: RawWatchConfig {
                patterns: patterns.iter().map(|p| p.to_string()).collect(),
                ..RawWatchConfig::default()
            },
        }
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn task(mut self, name: &str) -> Self {
        self.watch.task = Some(name.to_string());
        self
    }

    pub fn series(mut self, steps: Vec<StepConfig>) -> Self {
        self.watch.series = Some(steps);
        self
    }

    pub fn parallel(mut self, steps: Vec<StepConfig>) -> Self {
        self.watch.parallel = Some(steps);
        self
    }

    pub fn build(self) -> RawWatchConfig {
        self.watch
    }
}

/// Named step.
pub fn step(name: &str) -> StepConfig {
    StepConfig::Name(name.to_string())
}

/// Named steps.
pub fn steps(names: &[&str]) -> Vec<StepConfig> {
    names.iter().map(|n| step(n)).collect()
}

/// Inline `{ series = [...] }` group.
pub fn series_group(steps: Vec<StepConfig>) -> StepConfig {
    StepConfig::Group(GroupConfig {
        series: Some(steps),
        parallel: None,
    })
}

/// Inline `{ parallel = [...] }` group.
pub fn parallel_group(steps: Vec<StepConfig>) -> StepConfig {
    StepConfig::Group(GroupConfig {
        series: None,
        parallel: Some(steps),
    })
}
