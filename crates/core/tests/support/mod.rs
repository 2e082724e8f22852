//! Scripted fake player: a real spawned process plus an in-test channel
//! server, so lifecycle tests exercise the full launch/attach/teardown path.

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use omx::PlayerConfig;
use omx_protocol::{Notification, Request, Response};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::mpsc::UnboundedReceiver;

pub struct FakePlayer {
	_dir: tempfile::TempDir,
	pub binary: PathBuf,
	pub discovery: PathBuf,
	pub args_file: PathBuf,
	pub properties: Arc<Mutex<HashMap<String, Value>>>,
	pub requests: Arc<Mutex<Vec<Request>>>,
	silent: Arc<AtomicBool>,
}

impl FakePlayer {
	/// Starts the channel server, writes the discovery file, and drops a
	/// fake player script that records its arguments and then sleeps.
	pub async fn spawn() -> Self {
		Self::spawn_with_script("exec sleep 30").await
	}

	/// Same as [`spawn`](Self::spawn), but the fake player ignores the polite
	/// termination signal so teardown must escalate to the forced kill.
	pub async fn spawn_ignoring_term() -> Self {
		Self::spawn_with_script("trap '' TERM\nsleep 30").await
	}

	async fn spawn_with_script(tail: &str) -> Self {
		let dir = tempfile::tempdir().expect("tempdir");
		let socket = dir.path().join("player.sock");
		let discovery = dir.path().join("discovery");
		let args_file = dir.path().join("args.txt");
		let binary = dir.path().join("fake-player.sh");

		std::fs::write(
			&binary,
			format!("#!/bin/sh\necho \"$@\" > '{}'\n{tail}\n", args_file.display()),
		)
		.expect("write fake player script");
		std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).expect("chmod fake player");

		let mut initial = HashMap::new();
		initial.insert("Identity".to_string(), json!("omxplayer"));
		initial.insert("Duration".to_string(), json!(120_000_000_i64));
		initial.insert("PlaybackStatus".to_string(), json!("Playing"));
		initial.insert("Position".to_string(), json!(0));
		initial.insert("Volume".to_string(), json!(100));
		initial.insert("CanControl".to_string(), json!(true));
		initial.insert("CanPause".to_string(), json!(true));
		initial.insert("CanPlay".to_string(), json!(true));
		initial.insert("CanSeek".to_string(), json!(true));
		let properties = Arc::new(Mutex::new(initial));
		let requests = Arc::new(Mutex::new(Vec::new()));

		let listener = UnixListener::bind(&socket).expect("bind fake channel socket");
		std::fs::write(&discovery, socket.display().to_string()).expect("write discovery file");

		let silent = Arc::new(AtomicBool::new(false));
		let props = Arc::clone(&properties);
		let reqs = Arc::clone(&requests);
		let muted = Arc::clone(&silent);
		tokio::spawn(async move {
			loop {
				let Ok((stream, _)) = listener.accept().await else { break };
				let props = Arc::clone(&props);
				let reqs = Arc::clone(&reqs);
				let muted = Arc::clone(&muted);
				tokio::spawn(async move {
					let (read_half, mut write_half) = stream.into_split();
					let mut lines = BufReader::new(read_half).lines();
					while let Ok(Some(line)) = lines.next_line().await {
						let Ok(request) = serde_json::from_str::<Request>(&line) else { break };
						let response = respond(&props, &request);
						reqs.lock().unwrap().push(request);
						if muted.load(Ordering::SeqCst) {
							continue;
						}
						let mut frame = serde_json::to_string(&response).unwrap();
						frame.push('\n');
						if write_half.write_all(frame.as_bytes()).await.is_err() {
							break;
						}
					}
				});
			}
		});

		Self {
			_dir: dir,
			binary,
			discovery,
			args_file,
			properties,
			requests,
			silent,
		}
	}

	/// Makes the channel server swallow every request from now on: it keeps
	/// reading but never replies, like a live but unresponsive player.
	pub fn go_silent(&self) {
		self.silent.store(true, Ordering::SeqCst);
	}

	/// Config pointing the supervisor at this fake player.
	pub fn config(&self) -> PlayerConfig {
		PlayerConfig::default()
			.with_binary(&self.binary)
			.with_address_hint(&self.discovery)
			.with_attach_budget(100, Duration::from_millis(10))
			.with_poll_interval(Duration::from_millis(50))
	}

	pub fn set_remote(&self, name: &str, value: Value) {
		self.properties.lock().unwrap().insert(name.to_string(), value);
	}

	pub fn remote(&self, name: &str) -> Option<Value> {
		self.properties.lock().unwrap().get(name).cloned()
	}

	pub fn sent_requests(&self) -> Vec<Request> {
		self.requests.lock().unwrap().clone()
	}

	/// Arguments the spawned script was launched with.
	pub async fn recorded_args(&self) -> String {
		for _ in 0..100 {
			if let Ok(contents) = std::fs::read_to_string(&self.args_file) {
				if !contents.trim().is_empty() {
					return contents;
				}
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		panic!("fake player never recorded its arguments");
	}
}

fn respond(props: &Mutex<HashMap<String, Value>>, request: &Request) -> Response {
	match request.member.as_str() {
		"Get" => {
			let name = request.args[0].as_str().unwrap_or_default();
			match props.lock().unwrap().get(name) {
				Some(value) => Response::ok(value.clone()),
				None => Response::err(format!("no such property: {name}")),
			}
		}
		"Set" => {
			let name = request.args[0].as_str().unwrap_or_default().to_string();
			props.lock().unwrap().insert(name, request.args[1].clone());
			Response::ok(json!(null))
		}
		_ => Response::ok(json!(null)),
	}
}

/// Receives the next notification, failing the test after five seconds.
pub async fn next_event(events: &mut UnboundedReceiver<Notification>) -> Notification {
	tokio::time::timeout(Duration::from_secs(5), events.recv())
		.await
		.expect("timed out waiting for a notification")
		.expect("notification channel closed")
}

/// Receives notifications until `predicate` matches, returning the match.
pub async fn event_matching(events: &mut UnboundedReceiver<Notification>, predicate: impl Fn(&Notification) -> bool) -> Notification {
	loop {
		let event = next_event(events).await;
		if predicate(&event) {
			return event;
		}
	}
}
