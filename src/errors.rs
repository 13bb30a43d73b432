// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! These are configuration/resolution errors. A leaf that runs and fails is
//! not an error at this level; it is reported as
//! [`ExecutionResult::Failure`](crate::graph::ExecutionResult).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildweaveError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task already registered: {0}")]
    DuplicateTask(String),

    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("Cycle detected in task graph: {0}")]
    CyclicGraph(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildweaveError>;
