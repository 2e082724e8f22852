//! Notifications emitted by the supervisor to its caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of events a session can emit, in emission order.
///
/// Property notifications carry old/new values where applicable; a batched
/// [`Notification::PropertiesChanged`] follows the per-property ones for the
/// same poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
	/// One property left its cached value.
	PropertyChanged {
		name: String,
		old: Option<Value>,
		new: Value,
	},
	/// Aggregate of every change observed in one poll cycle.
	PropertiesChanged { changed: BTreeMap<String, Value> },
	/// External player process spawned.
	ProcessLaunched { pid: u32 },
	/// Control channel opened and confirmed responsive.
	ChannelOpened,
	/// Control channel closed.
	ChannelClosed,
	/// External player process forcibly terminated.
	ProcessKilled,
	/// Session fully attached; playback is under supervisor control.
	PlayingStarted { identity: String },
	/// Session torn down. Emitted exactly once per session.
	Stopped,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn notifications_tag_by_snake_case_type() {
		let encoded = serde_json::to_string(&Notification::PlayingStarted {
			identity: "omxplayer".into(),
		})
		.unwrap();
		assert!(encoded.contains("\"type\":\"playing_started\""));
	}

	#[test]
	fn property_change_keeps_old_value() {
		let n = Notification::PropertyChanged {
			name: "Position".into(),
			old: Some(json!(1000)),
			new: json!(2000),
		};
		let decoded: Notification = serde_json::from_str(&serde_json::to_string(&n).unwrap()).unwrap();
		assert_eq!(decoded, n);
	}
}
