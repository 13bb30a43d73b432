// src/graph/mod.rs

//! Task graph: definitions, registry and executor.
//!
//! - [`definition`] holds the leaf/series/parallel task shapes.
//! - [`registry`] stores definitions by name and checks subtrees for
//!   unknown references and cycles.
//! - [`executor`] runs a named task to completion and reports each leaf.

pub mod definition;
pub mod executor;
pub mod registry;

pub use definition::TaskDefinition;
pub use executor::TaskGraphExecutor;
pub use registry::TaskRegistry;
pub use crate::types::{ExecutionResult, TaskFailure, TaskKind};
