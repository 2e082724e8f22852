//! Serialized outbound control-channel invocations.

use omx_protocol::{PLAYER_INTERFACE, PROPERTIES_INTERFACE, PROPERTY_GET, PROPERTY_GET_SIGNATURE, PROPERTY_SET, PROPERTY_SET_SIGNATURE, PlayerCommand};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::channel::Connection;
use crate::error::{PlayerError, Result};

/// Width-one gate in front of the control channel.
///
/// The channel correlates responses with requests purely by order, so it can
/// never see interleaved requests. The gate is a mutex held across the full
/// request/response exchange: concurrent callers queue in arrival order, and
/// the guard drops before any error is reported, so a failed call cannot
/// wedge the callers behind it.
///
/// The queue is also the sole owner of the connection; `invoke` on a detached
/// queue fails immediately with [`PlayerError::NotAttached`] without queueing.
#[derive(Default)]
pub struct InvocationQueue {
	gate: Mutex<Option<Connection>>,
}

impl InvocationQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Installs `connection`, returning any previously attached one.
	pub async fn attach(&self, connection: Connection) -> Option<Connection> {
		self.gate.lock().await.replace(connection)
	}

	/// Removes and returns the attached connection, if any.
	pub async fn detach(&self) -> Option<Connection> {
		self.gate.lock().await.take()
	}

	/// Whether a connection is currently attached.
	pub async fn is_attached(&self) -> bool {
		self.gate.lock().await.is_some()
	}

	/// Performs one serialized call on the control channel.
	pub async fn invoke(&self, interface: &str, member: &str, signature: &str, args: Vec<Value>) -> Result<Value> {
		let mut gate = self.gate.lock().await;
		let connection = gate.as_mut().ok_or(PlayerError::NotAttached)?;
		connection.exchange(interface, member, signature, args).await
	}

	/// Reads one property by name.
	pub async fn get_property(&self, name: &str) -> Result<Value> {
		self.invoke(PROPERTIES_INTERFACE, PROPERTY_GET, PROPERTY_GET_SIGNATURE, vec![json!(name)]).await
	}

	/// Writes one property by name.
	pub async fn set_property(&self, name: &str, value: Value) -> Result<Value> {
		self.invoke(PROPERTIES_INTERFACE, PROPERTY_SET, PROPERTY_SET_SIGNATURE, vec![json!(name), value]).await
	}

	/// Issues one transport verb from the capability table.
	pub async fn command(&self, command: PlayerCommand, args: Vec<Value>) -> Result<Value> {
		self.invoke(PLAYER_INTERFACE, command.member(), command.signature(), args).await
	}
}
