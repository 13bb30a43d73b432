// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::event::{AccessKind, AccessMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::watch::dispatcher::ChangeEvent;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching and, once the forwarding task drains, closes the
/// change channel.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Watch `root` recursively and forward every changed path, relative to
/// `root`, as a [`ChangeEvent`] on `changes_tx`.
///
/// Pure access events (open/read) are ignored; a close-after-write is kept
/// because some editors only produce that.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    changes_tx: mpsc::Sender<ChangeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("buildweave: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("buildweave: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    let async_root = root.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !is_content_event(&event.kind) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in event.paths {
                let Some(rel) = relative_str(&async_root, &path) else {
                    warn!(
                        "could not relativize path {:?} against root {:?}",
                        path, async_root
                    );
                    continue;
                };

                if changes_tx.send(ChangeEvent::new(rel)).await.is_err() {
                    debug!("change receiver dropped; watcher forwarding stops");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        root,
    })
}

fn is_content_event(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    }
}

/// Convert `path` into a `/`-separated string relative to `root`.
///
/// Falls back to comparing canonicalized paths, which helps on platforms
/// that report the same directory through different prefixes (symlinks,
/// `/private/var` on macOS). Deleted files cannot be canonicalized, so the
/// fallback only applies to paths that still exist.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let to_slash = |rel: &Path| rel.to_string_lossy().replace('\\', "/");

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok()?;
    path_canon.strip_prefix(&root_canon).ok().map(to_slash)
}
