// src/exec/command.rs

//! Shell-command leaf unit.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::exec::leaf::{LeafFuture, LeafUnit};

/// How many trailing stderr lines are attached to a failure cause.
const STDERR_TAIL_LINES: usize = 10;

/// How long output readers may keep running after the shell has exited.
const READER_GRACE: Duration = Duration::from_millis(250);

/// A leaf that runs a command through the platform shell.
///
/// - stdout lines are logged at `info` so build tools stay visible.
/// - stderr lines are logged at `debug`; the last few are kept and attached
///   to the failure cause when the command exits non-zero.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    cmd: String,
    cwd: Option<PathBuf>,
}

impl ShellCommand {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: None,
        }
    }

    /// Run the command from `cwd` instead of the process working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    async fn run(&self) -> Result<()> {
        debug!(cmd = %self.cmd, cwd = ?self.cwd, "starting shell command");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning `{}`", self.cmd))?;

        let stdout_task = child.stdout.take().map(|stdout| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!("stdout: {}", line);
                }
            })
        });

        let tail: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::new()));
        let stderr_task = child.stderr.take().map(|stderr| {
            let tail = Arc::clone(&tail);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("stderr: {}", line);
                    if let Ok(mut guard) = tail.lock() {
                        if guard.len() == STDERR_TAIL_LINES {
                            guard.pop_front();
                        }
                        guard.push_back(line);
                    }
                }
            })
        });

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for `{}`", self.cmd))?;

        // Background grandchildren may hold the pipes open after the shell
        // exits; give the readers a short grace period, then drop them.
        for handle in [stdout_task, stderr_task].into_iter().flatten() {
            drain_reader(handle, &self.cmd).await;
        }

        if status.success() {
            return Ok(());
        }

        let code = status.code().unwrap_or(-1);
        let stderr_tail = tail
            .lock()
            .map(|guard| guard.iter().cloned().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default();

        if stderr_tail.is_empty() {
            bail!("`{}` exited with code {}", self.cmd, code);
        }
        bail!("`{}` exited with code {}:\n{}", self.cmd, code, stderr_tail);
    }
}

async fn drain_reader(mut handle: JoinHandle<()>, cmd: &str) {
    if tokio::time::timeout(READER_GRACE, &mut handle).await.is_err() {
        debug!(cmd = %cmd, "output still open after exit (background process?); detaching reader");
        handle.abort();
    }
}

impl LeafUnit for ShellCommand {
    fn invoke(&self) -> LeafFuture<'_> {
        Box::pin(self.run())
    }

    fn describe(&self) -> String {
        match &self.cwd {
            Some(dir) => format!("{} (in {})", self.cmd, dir.display()),
            None => self.cmd.clone(),
        }
    }
}
