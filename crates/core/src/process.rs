//! External player process lifecycle: spawn, exit watch, termination.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

use crate::error::{PlayerError, Result};

/// Grace period between the polite termination signal and the forced kill.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// How the supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitSummary {
	/// Exit code, `None` when killed by a signal.
	pub code: Option<i32>,
}

/// Handle to one spawned player process.
///
/// The child itself lives inside a watcher task; the handle can only request
/// termination and observe the exit, which is reported exactly once even when
/// termination was requested locally.
#[derive(Debug)]
pub struct ProcessHandle {
	pid: u32,
	kill_tx: mpsc::UnboundedSender<()>,
	exit_rx: watch::Receiver<Option<ExitSummary>>,
}

impl ProcessHandle {
	pub fn pid(&self) -> u32 {
		self.pid
	}

	/// Requests graceful-then-forced termination.
	///
	/// Idempotent and safe on an already-exited process.
	pub fn terminate(&self) {
		let _ = self.kill_tx.send(());
	}

	/// Whether the process has already exited.
	pub fn has_exited(&self) -> bool {
		self.exit_rx.borrow().is_some()
	}

	/// A watch that resolves to the exit summary exactly once.
	pub fn exit_watch(&self) -> watch::Receiver<Option<ExitSummary>> {
		self.exit_rx.clone()
	}

	/// Waits for the process to exit, bounded by `limit`.
	pub async fn wait_exited(&self, limit: Duration) -> Option<ExitSummary> {
		let mut rx = self.exit_rx.clone();
		let _ = tokio::time::timeout(limit, rx.wait_for(Option::is_some)).await;
		*self.exit_rx.borrow()
	}
}

/// Spawns the player binary with `args`.
///
/// Diagnostic output is piped line-by-line into tracing; spawn failure is
/// fatal to the start attempt and surfaced synchronously.
pub fn launch(binary: &Path, args: &[String]) -> Result<ProcessHandle> {
	debug!(target = "omx.process", binary = %binary.display(), ?args, "spawning player");

	let mut command = Command::new(binary);
	command.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
	#[cfg(unix)]
	command.process_group(0);

	let mut child = command
		.spawn()
		.map_err(|e| PlayerError::SpawnFailed(format!("{}: {}", binary.display(), e)))?;
	let pid = child
		.id()
		.ok_or_else(|| PlayerError::SpawnFailed(format!("{}: exited before a pid was observed", binary.display())))?;

	if let Some(stdout) = child.stdout.take() {
		spawn_line_pipe(stdout, pid, "stdout");
	}
	if let Some(stderr) = child.stderr.take() {
		spawn_line_pipe(stderr, pid, "stderr");
	}

	let (kill_tx, kill_rx) = mpsc::unbounded_channel();
	let (exit_tx, exit_rx) = watch::channel(None);
	tokio::spawn(watch_child(child, pid, kill_rx, exit_tx));

	Ok(ProcessHandle { pid, kill_tx, exit_rx })
}

/// Owns the child until exit: reports the exit exactly once and services
/// termination requests with a TERM-then-force escalation.
async fn watch_child(mut child: Child, pid: u32, mut kill_rx: mpsc::UnboundedReceiver<()>, exit_tx: watch::Sender<Option<ExitSummary>>) {
	let grace = tokio::time::sleep(Duration::ZERO);
	tokio::pin!(grace);
	let mut term_sent = false;
	let mut forced = false;

	loop {
		tokio::select! {
			status = child.wait() => {
				let code = status.as_ref().ok().and_then(|s| s.code());
				debug!(target = "omx.process", pid, ?code, forced, "player exited");
				let _ = exit_tx.send(Some(ExitSummary { code }));
				break;
			}
			Some(()) = kill_rx.recv(), if !term_sent => {
				term_sent = true;
				send_term(pid);
				grace.as_mut().reset(tokio::time::Instant::now() + KILL_GRACE);
			}
			() = &mut grace, if term_sent && !forced => {
				forced = true;
				warn!(target = "omx.process", pid, "grace period elapsed; force-killing player");
				if let Err(e) = child.start_kill() {
					warn!(target = "omx.process", pid, error = %e, "force kill failed");
				}
			}
		}
	}
}

#[cfg(unix)]
fn send_term(pid: u32) {
	trace!(target = "omx.process", pid, "sending SIGTERM");
	let result = std::process::Command::new("kill").args(["-TERM", &pid.to_string()]).status();
	if let Err(e) = result {
		warn!(target = "omx.process", pid, error = %e, "SIGTERM delivery failed");
	}
}

#[cfg(not(unix))]
fn send_term(_pid: u32) {}

fn spawn_line_pipe(pipe: impl AsyncRead + Unpin + Send + 'static, pid: u32, stream: &'static str) {
	tokio::spawn(async move {
		let mut lines = BufReader::new(pipe).lines();
		while let Ok(Some(line)) = lines.next_line().await {
			debug!(target = "omx.player", pid, stream, "{line}");
		}
	});
}
