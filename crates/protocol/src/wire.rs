//! Request/response frames as they appear on the control channel.
//!
//! Frames are newline-delimited JSON. The channel correlates a response with
//! its request purely by order: the player answers each request before
//! reading the next one, and the supervisor never has more than one request
//! outstanding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single control-channel call addressed to the player.
///
/// ```json
/// {
///   "destination": "org.mpris.MediaPlayer2.omxplayer.instance731-4",
///   "path": "/org/mpris/MediaPlayer2",
///   "interface": "org.mpris.MediaPlayer2.Player",
///   "member": "Seek",
///   "signature": "x",
///   "args": [30000000]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
	/// Per-session unique destination identifier of the target player.
	pub destination: String,
	/// Object path the member lives on.
	pub path: String,
	/// Interface name (properties or player commands).
	pub interface: String,
	/// Member to invoke.
	pub member: String,
	/// Typed argument signature (empty for parameterless verbs).
	pub signature: String,
	/// Positional arguments matching `signature`.
	pub args: Vec<Value>,
}

/// Reply to the most recent [`Request`] on the same connection.
///
/// Exactly one of `value` / `error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl Response {
	/// A successful reply carrying `value`.
	pub fn ok(value: Value) -> Self {
		Self {
			value: Some(value),
			error: None,
		}
	}

	/// A failed reply carrying an error message.
	pub fn err(message: impl Into<String>) -> Self {
		Self {
			value: None,
			error: Some(message.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn request_round_trips_through_json() {
		let request = Request {
			destination: "org.mpris.MediaPlayer2.omxplayer.instance1-1".into(),
			path: "/org/mpris/MediaPlayer2".into(),
			interface: "org.mpris.MediaPlayer2.Player".into(),
			member: "Seek".into(),
			signature: "x".into(),
			args: vec![json!(30_000_000)],
		};

		let encoded = serde_json::to_string(&request).unwrap();
		let decoded: Request = serde_json::from_str(&encoded).unwrap();
		assert_eq!(decoded, request);
	}

	#[test]
	fn error_response_omits_value_field() {
		let encoded = serde_json::to_string(&Response::err("no such property")).unwrap();
		assert!(!encoded.contains("value"));
		assert!(encoded.contains("no such property"));
	}

	#[test]
	fn ok_response_omits_error_field() {
		let encoded = serde_json::to_string(&Response::ok(json!(50))).unwrap();
		assert!(!encoded.contains("error"));
	}
}
