//! One open control channel to a running player.

use std::io;
use std::time::Duration;

use omx_protocol::{OBJECT_PATH, Request, Response};
use serde_json::Value;
use tracing::trace;

use super::transport::{Transport, UnixTransport};
use crate::error::{PlayerError, Result};

/// Exchange bound used when no timeout is configured.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// An open channel bound to one session's destination identifier.
///
/// At most one connection exists at a time; the session orchestrator closes
/// the old one before opening a new one. The connection itself performs a
/// single blocking exchange; at-most-one-in-flight is enforced by the
/// invocation queue that owns it.
pub struct Connection {
	transport: Box<dyn Transport>,
	destination: String,
	call_timeout: Duration,
	/// Set after a transport failure or timeout. Responses correlate with
	/// requests purely by order, so a late reply would answer the wrong call;
	/// the connection refuses further exchanges instead.
	broken: bool,
}

impl Connection {
	/// Opens a Unix-socket channel at `address`, addressed to `destination`.
	pub async fn open(address: &str, destination: &str, call_timeout: Duration) -> Result<Self> {
		let transport = UnixTransport::connect(address).await?;
		Ok(Self::from_transport(Box::new(transport), destination).with_call_timeout(call_timeout))
	}

	/// Wraps an already-open transport. Used with the fake transport in tests.
	pub fn from_transport(transport: Box<dyn Transport>, destination: &str) -> Self {
		Self {
			transport,
			destination: destination.to_string(),
			call_timeout: DEFAULT_CALL_TIMEOUT,
			broken: false,
		}
	}

	/// Sets the per-exchange timeout.
	pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
		self.call_timeout = call_timeout;
		self
	}

	/// Destination identifier this connection is addressed to.
	pub fn destination(&self) -> &str {
		&self.destination
	}

	/// Performs one request/response exchange, bounded by the call timeout.
	///
	/// A reply carrying an error becomes [`PlayerError::RemoteCallFailed`];
	/// transport failures and timeouts surface as [`PlayerError::Channel`]
	/// and leave the connection broken.
	pub async fn exchange(&mut self, interface: &str, member: &str, signature: &str, args: Vec<Value>) -> Result<Value> {
		if self.broken {
			return Err(PlayerError::Channel(io::Error::new(
				io::ErrorKind::BrokenPipe,
				"channel broken by an earlier failure",
			)));
		}
		let request = Request {
			destination: self.destination.clone(),
			path: OBJECT_PATH.to_string(),
			interface: interface.to_string(),
			member: member.to_string(),
			signature: signature.to_string(),
			args,
		};
		let limit = self.call_timeout;
		let Response { value, error } = match tokio::time::timeout(limit, self.exchange_raw(&request)).await {
			Ok(Ok(response)) => response,
			Ok(Err(e)) => {
				self.broken = true;
				return Err(PlayerError::Channel(e));
			}
			Err(_) => {
				self.broken = true;
				return Err(PlayerError::Channel(io::Error::new(
					io::ErrorKind::TimedOut,
					format!("{member}: no reply within {limit:?}"),
				)));
			}
		};
		if let Some(message) = error {
			trace!(target = "omx.channel", %member, %message, "remote call errored");
			return Err(PlayerError::RemoteCallFailed(format!("{member}: {message}")));
		}
		Ok(value.unwrap_or(Value::Null))
	}

	async fn exchange_raw(&mut self, request: &Request) -> io::Result<Response> {
		self.transport.send(request).await?;
		self.transport.recv().await
	}
}
