// src/exec/mod.rs

//! Leaf execution layer.
//!
//! - [`leaf`] defines the [`LeafUnit`] trait every leaf task owns, plus
//!   closure adaptors for async and blocking work.
//! - [`command`] provides [`ShellCommand`], the leaf used for tasks declared
//!   with `cmd = "..."` in the config file.

pub mod command;
pub mod leaf;

pub use command::ShellCommand;
pub use leaf::{
    BlockingLeaf, FnLeaf, LeafFuture, LeafUnit, SharedLeaf, leaf_blocking, leaf_fn,
};
