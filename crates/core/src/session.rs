//! Session orchestration: the top-level state machine.
//!
//! One [`Player`] supervises at most one live session at a time. `start()`
//! walks `Idle → Launching → Attaching → Attached`; `stop()`, a crash, or a
//! fatal attach error converge on `Stopping → Idle`. Teardown always stops
//! polling before closing the channel, and closes the channel before killing
//! the process, so a poll cycle never observes a half-closed channel.
//!
//! Every background continuation carries the epoch of the session that
//! spawned it and re-checks it before acting, so a stale callback from an
//! abandoned attach attempt can never resurrect a torn-down session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use omx_protocol::{Notification, OBJECT_PATH, PROPERTIES_INTERFACE, PROPERTY_GET, PROPERTY_GET_SIGNATURE, PlayerCommand};
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{Connection, resolve_address};
use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::events::NotificationHub;
use crate::invoke::InvocationQueue;
use crate::poll::{PropertyChange, change_map, poll_once};
use crate::process::{self, ProcessHandle};
use crate::snapshot::PropertySnapshot;

/// Upper bound on waiting for a terminated process to actually exit.
const TERMINATE_WAIT: Duration = Duration::from_secs(5);

/// Lifecycle states of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Idle,
	Launching,
	Attaching,
	Attached,
	Stopping,
}

/// Supervisor for one external media player.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct Player {
	inner: Arc<Inner>,
}

struct Inner {
	config: PlayerConfig,
	hub: NotificationHub,
	queue: InvocationQueue,
	snapshot: StdMutex<PropertySnapshot>,
	/// Property writes issued while detached, applied at next attach.
	pending_writes: StdMutex<BTreeMap<String, Value>>,
	/// Serializes start/stop/teardown; background tasks take it too.
	lifecycle: Mutex<Lifecycle>,
	state: StdMutex<SessionState>,
	/// Bumped on every teardown and on stop() entry; stale continuations
	/// compare against it and bail.
	epoch: AtomicU64,
	session_seq: AtomicU64,
	live_processes: AtomicUsize,
}

#[derive(Default)]
struct Lifecycle {
	handle: Option<ProcessHandle>,
	media: Option<PathBuf>,
	poll_task: Option<JoinHandle<()>>,
}

impl Player {
	pub fn new(config: PlayerConfig) -> Self {
		Self {
			inner: Arc::new(Inner {
				config,
				hub: NotificationHub::new(),
				queue: InvocationQueue::new(),
				snapshot: StdMutex::new(PropertySnapshot::new()),
				pending_writes: StdMutex::new(BTreeMap::new()),
				lifecycle: Mutex::new(Lifecycle::default()),
				state: StdMutex::new(SessionState::Idle),
				epoch: AtomicU64::new(0),
				session_seq: AtomicU64::new(0),
				live_processes: AtomicUsize::new(0),
			}),
		}
	}

	/// Registers a notification subscriber.
	pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Notification> {
		self.inner.hub.subscribe()
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SessionState {
		*self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Number of live supervised processes. Never exceeds one.
	pub fn live_process_count(&self) -> usize {
		self.inner.live_processes.load(Ordering::SeqCst)
	}

	/// Whether a control channel is currently attached.
	pub async fn is_attached(&self) -> bool {
		self.inner.queue.is_attached().await
	}

	/// Starts playing `media`, tearing down any previous session first.
	///
	/// Resolves with the player's identity string once the control channel is
	/// confirmed responsive; any structural failure tears the session back
	/// down and is returned here.
	pub async fn start(&self, media: impl AsRef<Path>) -> Result<String> {
		let media = media.as_ref().to_path_buf();
		let mut lifecycle = self.inner.lifecycle.lock().await;
		self.teardown(&mut lifecycle).await;

		let epoch = self.inner.epoch.load(Ordering::SeqCst);
		let seq = self.inner.session_seq.fetch_add(1, Ordering::SeqCst) + 1;
		let destination = PlayerConfig::destination_id(seq);

		self.set_state(SessionState::Launching);
		info!(target = "omx.session", media = %media.display(), %destination, "starting session");

		match self.launch_and_attach(&mut lifecycle, &media, &destination, epoch).await {
			Ok(identity) => Ok(identity),
			Err(e) => {
				warn!(target = "omx.session", error = %e, "start failed; tearing down");
				self.teardown(&mut lifecycle).await;
				Err(e)
			}
		}
	}

	/// Tears the current session down. Idempotent; a second call is a no-op
	/// with no duplicate side effects or notifications.
	pub async fn stop(&self) {
		// Bumped before taking the lock so an in-flight attach loop abandons
		// its attempt instead of finishing against a dead session.
		self.inner.epoch.fetch_add(1, Ordering::SeqCst);
		let mut lifecycle = self.inner.lifecycle.lock().await;
		self.teardown(&mut lifecycle).await;
	}

	async fn launch_and_attach(&self, lifecycle: &mut Lifecycle, media: &Path, destination: &str, epoch: u64) -> Result<String> {
		let inner = &self.inner;
		let binary = inner
			.config
			.resolve_binary()
			.ok_or_else(|| PlayerError::SpawnFailed(format!("{} not found on the search path", inner.config.binary.display())))?;
		let args = inner.config.launch_args(media, destination);

		let handle = process::launch(&binary, &args)?;
		inner.live_processes.fetch_add(1, Ordering::SeqCst);
		inner.hub.emit(Notification::ProcessLaunched { pid: handle.pid() });
		lifecycle.media = Some(media.to_path_buf());
		let handle = lifecycle.handle.insert(handle);

		self.set_state(SessionState::Attaching);
		let (connection, identity) = self.attach_channel(handle, destination, epoch).await?;

		inner.queue.attach(connection).await;
		inner.hub.emit(Notification::ChannelOpened);
		self.set_state(SessionState::Attached);

		self.flush_pending_writes().await;

		// one-time poll over the full superset, then live properties only
		let mut names = inner.config.cold_properties.clone();
		names.extend(inner.config.live_properties.iter().cloned());
		let changes = poll_once(&inner.queue, &names, &inner.snapshot).await;
		self.emit_changes(&changes);

		lifecycle.poll_task = Some(self.spawn_poll_task(epoch));
		self.spawn_exit_watcher(handle, epoch);

		inner.hub.emit(Notification::PlayingStarted { identity: identity.clone() });
		info!(target = "omx.session", %identity, "session attached");
		Ok(identity)
	}

	/// Resolve + open + trial read, retried within the attach budget.
	///
	/// The trial read confirms the remote side actually answers; the channel
	/// socket existing is not enough while the player is still initializing.
	/// Each attempt is bounded by the call timeout, so a connected-but-silent
	/// channel consumes budget like a failed one instead of hanging here.
	async fn attach_channel(&self, handle: &ProcessHandle, destination: &str, epoch: u64) -> Result<(Connection, String)> {
		let config = &self.inner.config;
		let mut last_error = String::from("no attempts made");

		for attempt in 0..config.attach_retry_limit {
			if attempt > 0 {
				tokio::time::sleep(config.attach_retry_delay).await;
			}
			if self.inner.epoch.load(Ordering::SeqCst) != epoch {
				return Err(PlayerError::AttachTimeout("attach abandoned by stop()".into()));
			}
			if handle.has_exited() {
				return Err(PlayerError::SpawnFailed(format!(
					"player (pid {}) exited before its control channel came up",
					handle.pid()
				)));
			}

			match tokio::time::timeout(config.call_timeout, self.attach_once(destination)).await {
				Ok(Ok((connection, identity))) => {
					if self.inner.epoch.load(Ordering::SeqCst) != epoch {
						return Err(PlayerError::AttachTimeout("attach abandoned by stop()".into()));
					}
					debug!(target = "omx.session", attempt, %identity, "trial call answered");
					return Ok((connection, identity));
				}
				Ok(Err(e)) => {
					last_error = e.to_string();
				}
				Err(_) => {
					last_error = format!("attempt took longer than {:?}", config.call_timeout);
				}
			}
		}

		Err(PlayerError::AttachTimeout(format!(
			"{} attempts exhausted; last error: {last_error}",
			config.attach_retry_limit
		)))
	}

	async fn attach_once(&self, destination: &str) -> Result<(Connection, String)> {
		let config = &self.inner.config;
		let address = resolve_address(&config.address_hints)?;
		let mut connection = Connection::open(&address, destination, config.call_timeout).await?;
		let value = connection
			.exchange(PROPERTIES_INTERFACE, PROPERTY_GET, PROPERTY_GET_SIGNATURE, vec![json!("Identity")])
			.await?;
		let identity = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
		Ok((connection, identity))
	}

	/// Full teardown, in fixed order: poll timer, channel, process, snapshot.
	///
	/// Emits exactly one `Stopped` per session; a call with nothing live does
	/// nothing.
	async fn teardown(&self, lifecycle: &mut Lifecycle) {
		if self.state() == SessionState::Idle && lifecycle.handle.is_none() {
			return;
		}
		self.set_state(SessionState::Stopping);
		self.inner.epoch.fetch_add(1, Ordering::SeqCst);

		if let Some(task) = lifecycle.poll_task.take() {
			task.abort();
			let _ = task.await;
		}

		if self.inner.queue.detach().await.is_some() {
			self.inner.hub.emit(Notification::ChannelClosed);
		}

		if let Some(handle) = lifecycle.handle.take() {
			if handle.has_exited() {
				debug!(target = "omx.session", pid = handle.pid(), "player already exited");
			} else {
				handle.terminate();
				if handle.wait_exited(TERMINATE_WAIT).await.is_some() {
					self.inner.hub.emit(Notification::ProcessKilled);
				} else {
					warn!(target = "omx.session", pid = handle.pid(), "player still running after the kill wait");
				}
			}
			self.inner.live_processes.fetch_sub(1, Ordering::SeqCst);
		}

		self.inner
			.snapshot
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.reset_to_baseline();
		lifecycle.media = None;

		self.inner.hub.emit(Notification::Stopped);
		self.set_state(SessionState::Idle);
		info!(target = "omx.session", "session stopped");
	}

	fn spawn_poll_task(&self, epoch: u64) -> JoinHandle<()> {
		let player = self.clone();
		tokio::spawn(async move {
			let interval = player.inner.config.poll_interval;
			let names = player.inner.config.live_properties.clone();
			loop {
				// next cycle is armed only after the previous one completed
				tokio::time::sleep(interval).await;
				if player.inner.epoch.load(Ordering::SeqCst) != epoch {
					break;
				}
				let changes = poll_once(&player.inner.queue, &names, &player.inner.snapshot).await;
				if player.inner.epoch.load(Ordering::SeqCst) != epoch {
					break;
				}
				player.emit_changes(&changes);
			}
		})
	}

	fn spawn_exit_watcher(&self, handle: &ProcessHandle, epoch: u64) {
		let mut exit_rx = handle.exit_watch();
		let pid = handle.pid();
		let player = self.clone();
		tokio::spawn(async move {
			if exit_rx.wait_for(Option::is_some).await.is_err() {
				return;
			}
			if player.inner.epoch.load(Ordering::SeqCst) != epoch {
				// teardown killed it on purpose; nothing to report
				return;
			}
			let code = exit_rx.borrow().and_then(|summary| summary.code);
			info!(target = "omx.session", pid, ?code, "player exited unexpectedly; tearing down");
			let mut lifecycle = player.inner.lifecycle.lock().await;
			if player.inner.epoch.load(Ordering::SeqCst) != epoch {
				return;
			}
			player.teardown(&mut lifecycle).await;
		});
	}

	async fn flush_pending_writes(&self) {
		let pending: Vec<(String, Value)> = {
			let mut writes = self.inner.pending_writes.lock().unwrap_or_else(PoisonError::into_inner);
			std::mem::take(&mut *writes).into_iter().collect()
		};
		for (name, value) in pending {
			debug!(target = "omx.session", property = %name, "propagating buffered write");
			if let Err(e) = self.inner.queue.set_property(&name, value).await {
				warn!(target = "omx.session", property = %name, error = %e, "buffered write failed");
			}
		}
	}

	fn emit_changes(&self, changes: &[PropertyChange]) {
		if changes.is_empty() {
			return;
		}
		for change in changes {
			self.inner.hub.emit(Notification::PropertyChanged {
				name: change.name.clone(),
				old: change.old.clone(),
				new: change.new.clone(),
			});
		}
		self.inner.hub.emit(Notification::PropertiesChanged {
			changed: change_map(changes),
		});
	}

	fn set_state(&self, state: SessionState) {
		*self.inner.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
	}

	// --- control surface -------------------------------------------------

	/// Issues one transport verb from the capability table.
	pub async fn command(&self, command: PlayerCommand, args: Vec<Value>) -> Result<Value> {
		self.inner.queue.command(command, args).await
	}

	pub async fn play(&self) -> Result<Value> {
		self.command(PlayerCommand::Play, vec![]).await
	}

	pub async fn pause(&self) -> Result<Value> {
		self.command(PlayerCommand::Pause, vec![]).await
	}

	pub async fn play_pause(&self) -> Result<Value> {
		self.command(PlayerCommand::PlayPause, vec![]).await
	}

	/// Stops playback inside the player without tearing the session down.
	pub async fn stop_playback(&self) -> Result<Value> {
		self.command(PlayerCommand::Stop, vec![]).await
	}

	pub async fn next(&self) -> Result<Value> {
		self.command(PlayerCommand::Next, vec![]).await
	}

	pub async fn previous(&self) -> Result<Value> {
		self.command(PlayerCommand::Previous, vec![]).await
	}

	pub async fn mute(&self) -> Result<Value> {
		self.command(PlayerCommand::Mute, vec![]).await
	}

	pub async fn unmute(&self) -> Result<Value> {
		self.command(PlayerCommand::Unmute, vec![]).await
	}

	pub async fn hide_video(&self) -> Result<Value> {
		self.command(PlayerCommand::HideVideo, vec![]).await
	}

	pub async fn show_video(&self) -> Result<Value> {
		self.command(PlayerCommand::UnHideVideo, vec![]).await
	}

	pub async fn hide_subtitles(&self) -> Result<Value> {
		self.command(PlayerCommand::HideSubtitles, vec![]).await
	}

	pub async fn show_subtitles(&self) -> Result<Value> {
		self.command(PlayerCommand::ShowSubtitles, vec![]).await
	}

	/// Asks the player to quit; the exit watcher then tears the session down.
	pub async fn quit(&self) -> Result<Value> {
		self.command(PlayerCommand::Quit, vec![]).await
	}

	/// Seeks by a relative offset in microseconds.
	pub async fn seek(&self, offset_us: i64) -> Result<Value> {
		self.command(PlayerCommand::Seek, vec![json!(offset_us)]).await
	}

	/// Jumps to an absolute position in microseconds.
	pub async fn set_position(&self, position_us: i64) -> Result<Value> {
		self.command(PlayerCommand::SetPosition, vec![json!(OBJECT_PATH), json!(position_us)]).await
	}

	/// Moves/resizes the video rectangle, `"x1 y1 x2 y2"`.
	pub async fn set_video_pos(&self, rect: &str) -> Result<Value> {
		self.command(PlayerCommand::VideoPos, vec![json!(OBJECT_PATH), json!(rect)]).await
	}

	pub async fn select_subtitle(&self, index: i32) -> Result<Value> {
		self.command(PlayerCommand::SelectSubtitle, vec![json!(index)]).await
	}

	pub async fn select_audio(&self, index: i32) -> Result<Value> {
		self.command(PlayerCommand::SelectAudio, vec![json!(index)]).await
	}

	/// Sends a generic numeric action code.
	pub async fn action(&self, code: i32) -> Result<Value> {
		self.command(PlayerCommand::Action, vec![json!(code)]).await
	}

	/// Reads a property from the live channel.
	pub async fn get_property(&self, name: &str) -> Result<Value> {
		self.inner.queue.get_property(name).await
	}

	/// Writes a property.
	///
	/// While detached the write is buffered into the snapshot and propagated
	/// at the next attach instead of failing, so a caller may pre-set volume
	/// before any process exists.
	pub async fn set_property(&self, name: &str, value: Value) -> Result<()> {
		if self.inner.queue.is_attached().await {
			self.inner.queue.set_property(name, value).await.map(|_| ())
		} else {
			debug!(target = "omx.session", property = %name, "buffering write until attach");
			self.inner
				.snapshot
				.lock()
				.unwrap_or_else(PoisonError::into_inner)
				.set(name, value.clone());
			self.inner
				.pending_writes
				.lock()
				.unwrap_or_else(PoisonError::into_inner)
				.insert(name.to_string(), value);
			// an attach between the check and the insert has already drained
			// the buffer; this write must go through the live channel instead
			if self.inner.queue.is_attached().await {
				let taken = self
					.inner
					.pending_writes
					.lock()
					.unwrap_or_else(PoisonError::into_inner)
					.remove(name);
				if let Some(value) = taken {
					return self.inner.queue.set_property(name, value).await.map(|_| ());
				}
			}
			Ok(())
		}
	}

	/// Last-known value from the snapshot, without touching the channel.
	pub fn cached_property(&self, name: &str) -> Option<Value> {
		self.inner
			.snapshot
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(name)
			.cloned()
	}

	pub async fn set_volume(&self, volume: i64) -> Result<()> {
		self.set_property("Volume", json!(volume)).await
	}

	pub async fn volume(&self) -> Result<i64> {
		as_i64("Volume", self.get_property("Volume").await?)
	}

	/// Playback position in microseconds.
	pub async fn position(&self) -> Result<i64> {
		as_i64("Position", self.get_property("Position").await?)
	}

	/// Media duration in microseconds.
	pub async fn duration(&self) -> Result<i64> {
		as_i64("Duration", self.get_property("Duration").await?)
	}

	/// `"Playing"`, `"Paused"`, or `"Stopped"`.
	pub async fn playback_status(&self) -> Result<String> {
		let value = self.get_property("PlaybackStatus").await?;
		value
			.as_str()
			.map(str::to_string)
			.ok_or_else(|| PlayerError::RemoteCallFailed(format!("PlaybackStatus: unexpected value {value}")))
	}
}

fn as_i64(name: &str, value: Value) -> Result<i64> {
	value
		.as_i64()
		.ok_or_else(|| PlayerError::RemoteCallFailed(format!("{name}: unexpected value {value}")))
}
