//! In-memory transport for testing the supervisor without a real player.
//!
//! ```ignore
//! let (transport, controller) = FakeTransport::scripted(|request| match request.member.as_str() {
//!     "Get" => Response::ok(json!(50)),
//!     _ => Response::ok(json!(null)),
//! });
//! let connection = Connection::from_transport(Box::new(transport), "dest");
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use omx_protocol::{Request, Response};

use super::transport::Transport;

type Script = dyn Fn(&Request) -> Response + Send + Sync;

/// Transport answering each request from a scripted handler.
pub struct FakeTransport {
	script: Arc<Script>,
	pending: VecDeque<Response>,
	shared: Arc<Shared>,
	/// Artificial latency between send and recv, for overlap detection.
	pub latency: Duration,
}

struct Shared {
	sent: Mutex<Vec<Request>>,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}

/// Inspection handle paired with a [`FakeTransport`].
#[derive(Clone)]
pub struct FakeController {
	shared: Arc<Shared>,
}

impl FakeTransport {
	/// Builds a transport whose replies come from `script`, plus a controller
	/// for inspecting what was sent.
	pub fn scripted<F>(script: F) -> (Self, FakeController)
	where
		F: Fn(&Request) -> Response + Send + Sync + 'static,
	{
		let shared = Arc::new(Shared {
			sent: Mutex::new(Vec::new()),
			in_flight: AtomicUsize::new(0),
			max_in_flight: AtomicUsize::new(0),
		});
		let transport = Self {
			script: Arc::new(script),
			pending: VecDeque::new(),
			shared: Arc::clone(&shared),
			latency: Duration::ZERO,
		};
		(transport, FakeController { shared })
	}
}

#[async_trait]
impl Transport for FakeTransport {
	async fn send(&mut self, request: &Request) -> io::Result<()> {
		let now = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.shared.max_in_flight.fetch_max(now, Ordering::SeqCst);
		self.shared
			.sent
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(request.clone());
		self.pending.push_back((self.script)(request));
		Ok(())
	}

	async fn recv(&mut self) -> io::Result<Response> {
		if !self.latency.is_zero() {
			tokio::time::sleep(self.latency).await;
		}
		let response = self
			.pending
			.pop_front()
			.ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no request in flight"))?;
		self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
		Ok(response)
	}
}

impl FakeController {
	/// Every request sent so far, in order.
	pub fn sent(&self) -> Vec<Request> {
		self.shared.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
	}

	/// Largest number of requests that were ever awaiting a reply at once.
	pub fn max_in_flight(&self) -> usize {
		self.shared.max_in_flight.load(Ordering::SeqCst)
	}
}
