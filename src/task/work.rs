// src/task/work.rs

//! Opaque units of work attached to tasks.
//!
//! The scheduler never looks inside a [`Work`]; it only awaits the future
//! returned by [`Work::perform`] and inspects the result.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::types::TaskName;

/// Future returned by [`Work::perform`].
pub type WorkFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// The body of a task.
pub trait Work: Send + Sync {
    /// Start the work. The returned future is driven on a pool worker.
    fn perform(&self) -> WorkFuture;

    /// Short human-readable description, used by dry-run output.
    fn describe(&self) -> String {
        "<work>".to_string()
    }
}

impl fmt::Debug for dyn Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Work({})", self.describe())
    }
}

/// Wrap a blocking closure as a [`Work`].
///
/// The closure runs on tokio's blocking pool; a panic inside it is turned
/// into an error instead of tearing down the worker.
pub fn from_fn<F>(f: F) -> Arc<dyn Work>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnWork(Arc::new(f)))
}

struct FnWork<F>(Arc<F>);

impl<F> Work for FnWork<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn perform(&self) -> WorkFuture {
        let f = Arc::clone(&self.0);
        Box::pin(async move {
            match tokio::task::spawn_blocking(move || (*f)()).await {
                Ok(result) => result,
                Err(err) if err.is_panic() => {
                    let payload = err.into_panic();
                    Err(anyhow!("work panicked: {}", panic_message(payload.as_ref())))
                }
                Err(err) => Err(err).context("blocking work was cancelled"),
            }
        })
    }

    fn describe(&self) -> String {
        "<closure>".to_string()
    }
}

/// Best-effort extraction of a panic payload message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs a shell command; a non-zero exit status is a failure.
#[derive(Debug, Clone)]
pub struct ShellWork {
    task: TaskName,
    cmd: String,
}

impl ShellWork {
    pub fn new(task: impl Into<TaskName>, cmd: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            cmd: cmd.into(),
        }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl Work for ShellWork {
    fn perform(&self) -> WorkFuture {
        Box::pin(run_shell(self.task.clone(), self.cmd.clone()))
    }

    fn describe(&self) -> String {
        self.cmd.clone()
    }
}

async fn run_shell(task: TaskName, cmd: String) -> anyhow::Result<()> {
    debug!(task = %task, cmd = %cmd, "spawning shell command");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&cmd);
        c
    };

    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for task '{task}'"))?;

    let stdout = child.stdout.take().map(|out| {
        let task = task.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(out).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(task = %task, "{}", line);
            }
        })
    });

    // Always drain stderr so the pipe never fills up.
    let stderr = child.stderr.take().map(|err| {
        let task = task.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %task, "stderr: {}", line);
            }
        })
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{task}'"))?;

    for reader in [stdout, stderr].into_iter().flatten() {
        if let Err(e) = reader.await {
            debug!(task = %task, error = %e, "output reader task failed");
        }
    }

    if !status.success() {
        match status.code() {
            Some(code) => bail!("command `{cmd}` exited with status {code}"),
            None => bail!("command `{cmd}` was terminated by a signal"),
        }
    }

    Ok(())
}
