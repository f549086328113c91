// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process supervision.
//!
//! One event loop per child over (child-exit, wall-clock timer, cancel
//! poll). Arguments are always passed as an array — no shell anywhere.
//! Termination is SIGTERM, a grace period, then SIGKILL; the child is
//! reaped on every path.

use crate::WorkerError;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use sc_core::RunId;
use sc_queue::CancelPlane;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// Cap on captured stdout/stderr per stream.
pub const CAPTURE_LIMIT: usize = 256 * 1024;

/// A fully specified child invocation.
#[derive(Debug, Clone)]
pub struct ChildSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// The complete child environment. Nothing else is inherited except
    /// PATH/HOME/TMPDIR, which child runtimes cannot live without.
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
    pub kill_grace: Duration,
    pub cancel_poll: Duration,
}

impl ChildSpec {
    pub fn new(program: impl Into<String>, cwd: PathBuf) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd,
            env: Vec::new(),
            timeout: Duration::from_secs(600),
            kill_grace: Duration::from_secs(10),
            cancel_poll: Duration::from_secs(1),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I: IntoIterator<Item = String>>(mut self, args: I) -> Self {
        self.args.extend(args);
        self
    }

    pub fn env_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.env.extend(pairs);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// How the supervised child ended.
#[derive(Debug)]
pub enum SuperviseEnd {
    Exited { exit_code: i32, stdout: String, stderr: String, elapsed: Duration },
    TimedOut { stdout: String, stderr: String, elapsed: Duration },
    Cancelled { stdout: String, stderr: String, elapsed: Duration },
}

impl SuperviseEnd {
    pub fn stdout(&self) -> &str {
        match self {
            SuperviseEnd::Exited { stdout, .. }
            | SuperviseEnd::TimedOut { stdout, .. }
            | SuperviseEnd::Cancelled { stdout, .. } => stdout,
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            SuperviseEnd::Exited { stderr, .. }
            | SuperviseEnd::TimedOut { stderr, .. }
            | SuperviseEnd::Cancelled { stderr, .. } => stderr,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            SuperviseEnd::Exited { elapsed, .. }
            | SuperviseEnd::TimedOut { elapsed, .. }
            | SuperviseEnd::Cancelled { elapsed, .. } => *elapsed,
        }
    }
}

/// Run a child to completion under timeout and cancellation.
///
/// The cancel plane is polled immediately and then every `cancel_poll`.
pub async fn supervise<P: CancelPlane + ?Sized>(
    spec: ChildSpec,
    run_id: RunId,
    cancel: &P,
) -> Result<SuperviseEnd, WorkerError> {
    // Observe a cancel that landed while the job was queued.
    if cancel.is_cancelled(run_id).await? {
        return Ok(SuperviseEnd::Cancelled {
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
        });
    }

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .env_clear()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for passthrough in ["PATH", "HOME", "TMPDIR"] {
        if let Ok(value) = std::env::var(passthrough) {
            command.env(passthrough, value);
        }
    }
    for (key, value) in &spec.env {
        command.env(key, value);
    }

    let started = Instant::now();
    let mut child = command
        .spawn()
        .map_err(|e| WorkerError::Spawn(format!("{}: {e}", spec.program)))?;
    tracing::debug!(run_id = %run_id, program = %spec.program, "child spawned");

    let stdout_task = capture(child.stdout.take());
    let stderr_task = capture(child.stderr.take());

    let mut poll = tokio::time::interval(spec.cancel_poll);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let deadline = tokio::time::sleep(spec.timeout);
    tokio::pin!(deadline);

    let end = loop {
        tokio::select! {
            status = child.wait() => {
                let status = status?;
                break Outcome::Exited(status.code().unwrap_or(-1));
            }
            _ = &mut deadline => {
                terminate(&mut child, spec.kill_grace).await;
                break Outcome::TimedOut;
            }
            _ = poll.tick() => {
                match cancel.is_cancelled(run_id).await {
                    Ok(true) => {
                        terminate(&mut child, spec.kill_grace).await;
                        break Outcome::Cancelled;
                    }
                    Ok(false) => {}
                    // A blip in the cancel plane must not kill the run.
                    Err(e) => tracing::warn!(run_id = %run_id, error = %e, "cancel poll failed"),
                }
            }
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    let elapsed = started.elapsed();
    Ok(match end {
        Outcome::Exited(exit_code) => {
            SuperviseEnd::Exited { exit_code, stdout, stderr, elapsed }
        }
        Outcome::TimedOut => SuperviseEnd::TimedOut { stdout, stderr, elapsed },
        Outcome::Cancelled => SuperviseEnd::Cancelled { stdout, stderr, elapsed },
    })
}

enum Outcome {
    Exited(i32),
    TimedOut,
    Cancelled,
}

/// Capture one stdio stream up to [`CAPTURE_LIMIT`] bytes.
fn capture<R>(stream: Option<R>) -> tokio::task::JoinHandle<String>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut stream) = stream else { return String::new() };
        let mut collected: Vec<u8> = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if collected.len() < CAPTURE_LIMIT {
                        let room = CAPTURE_LIMIT - collected.len();
                        collected.extend_from_slice(&buf[..n.min(room)]);
                    }
                    // Keep draining past the cap so the child never blocks
                    // on a full pipe.
                }
            }
        }
        String::from_utf8_lossy(&collected).into_owned()
    })
}

/// SIGTERM, wait out the grace period, then SIGKILL. Always reaps.
async fn terminate(child: &mut Child, grace: Duration) {
    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::debug!(pid, error = %e, "SIGTERM failed (already gone?)");
        }
        if tokio::time::timeout(grace, child.wait()).await.is_ok() {
            return;
        }
        tracing::warn!(pid, "child ignored SIGTERM, sending SIGKILL");
    }
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "SIGKILL failed (already reaped?)");
    }
    let _ = child.wait().await;
}

#[cfg(test)]
#[path = "supervise_tests.rs"]
mod tests;
