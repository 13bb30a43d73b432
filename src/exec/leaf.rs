// src/exec/leaf.rs

//! The leaf unit abstraction and closure-based adaptors.
//!
//! Every leaf hands the executor a future, whether the underlying work is
//! asynchronous (process spawning, IO) or a plain synchronous function. The
//! executor awaits both the same way.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};

/// Boxed future returned by [`LeafUnit::invoke`].
pub type LeafFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Opaque, side-effecting unit of work owned by a leaf task.
///
/// Production code uses [`ShellCommand`](crate::exec::ShellCommand); tests
/// and library users can plug in closures through [`FnLeaf`] and
/// [`BlockingLeaf`].
pub trait LeafUnit: Send + Sync {
    /// Perform the transformation, resolving to `Ok(())` on success.
    fn invoke(&self) -> LeafFuture<'_>;

    /// Short description used in dry-run output and debug logs.
    fn describe(&self) -> String {
        "<opaque>".to_string()
    }
}

/// Shared handle to a leaf unit.
pub type SharedLeaf = Arc<dyn LeafUnit>;

/// Leaf built from an async closure.
pub struct FnLeaf<F> {
    f: F,
}

impl<F, Fut> FnLeaf<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnLeaf<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLeaf").finish_non_exhaustive()
    }
}

impl<F, Fut> LeafUnit for FnLeaf<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn invoke(&self) -> LeafFuture<'_> {
        Box::pin((self.f)())
    }

    fn describe(&self) -> String {
        "<async fn>".to_string()
    }
}

/// Leaf built from a synchronous closure.
///
/// The closure runs on Tokio's blocking pool so it never stalls the
/// runtime's worker threads.
pub struct BlockingLeaf<F> {
    f: Arc<F>,
}

impl<F> BlockingLeaf<F>
where
    F: Fn() -> Result<()> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F> fmt::Debug for BlockingLeaf<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingLeaf").finish_non_exhaustive()
    }
}

impl<F> LeafUnit for BlockingLeaf<F>
where
    F: Fn() -> Result<()> + Send + Sync + 'static,
{
    fn invoke(&self) -> LeafFuture<'_> {
        let f = Arc::clone(&self.f);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || f())
                .await
                .context("blocking leaf panicked or was aborted")?
        })
    }

    fn describe(&self) -> String {
        "<blocking fn>".to_string()
    }
}

/// Convenience: wrap an async closure into a [`SharedLeaf`].
pub fn leaf_fn<F, Fut>(f: F) -> SharedLeaf
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnLeaf::new(f))
}

/// Convenience: wrap a synchronous closure into a [`SharedLeaf`].
pub fn leaf_blocking<F>(f: F) -> SharedLeaf
where
    F: Fn() -> Result<()> + Send + Sync + 'static,
{
    Arc::new(BlockingLeaf::new(f))
}
