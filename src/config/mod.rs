// src/config/mod.rs

//! Configuration loading and validation for buildweave.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate shapes, references and acyclicity (`validate.rs`).
//! - Build the task registry and watch bindings (`assemble.rs`).

pub mod assemble;
pub mod loader;
pub mod model;
pub mod validate;

pub use assemble::{build_bindings, build_registry};
pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path, parse_str};
pub use model::{
    ConfigFile, ConfigSection, GroupConfig, RawConfigFile, RawTaskConfig, RawWatchConfig,
    StepConfig, TaskSpec, WatchSpec,
};
