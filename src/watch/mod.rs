// src/watch/mod.rs

//! File watching and change dispatch.
//!
//! This module is responsible for:
//! - Compiling `patterns` / `exclude` globs per binding ([`patterns`]).
//! - Wiring up a cross-platform filesystem watcher with `notify`
//!   ([`watcher`]).
//! - Debouncing changes and running bound tasks without overlap
//!   ([`dispatcher`], driven by the pure machine in [`state`]).

pub mod dispatcher;
pub mod patterns;
pub mod state;
pub mod watcher;

pub use dispatcher::{
    ChangeEvent, DEFAULT_DEBOUNCE, DispatcherHandle, DispatcherOptions, MAX_WAIT_WINDOWS,
    WatchDispatcher,
};
pub use patterns::{WatchBinding, compile_globs};
pub use state::WatchState;
pub use watcher::{WatcherHandle, relative_str, spawn_watcher};
