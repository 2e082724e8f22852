//! Cached last-known property values for one session.

use std::collections::HashMap;

use serde_json::{Value, json};

/// Position value reported after teardown, before any real read.
pub const POSITION_SENTINEL: i64 = -1;

/// Playback status reported while no session is attached.
pub const STATUS_STOPPED: &str = "Stopped";

/// Properties that survive teardown because the caller set them on purpose.
const STICKY_PROPERTIES: &[&str] = &["Volume"];

/// Mapping from property name to last-known value.
///
/// Mutated only by the poller and by the orchestrator's pre-attach buffering
/// path; callers read it through the session API.
#[derive(Debug, Default)]
pub struct PropertySnapshot {
	values: HashMap<String, Value>,
}

impl PropertySnapshot {
	pub fn new() -> Self {
		let mut snapshot = Self::default();
		snapshot.reset_to_baseline();
		snapshot
	}

	/// Last-known value for `name`, if any.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.values.get(name)
	}

	/// Stores `value`, returning the previous value.
	pub fn set(&mut self, name: &str, value: Value) -> Option<Value> {
		self.values.insert(name.to_string(), value)
	}

	/// Whether `value` differs from the cached value for `name`.
	pub fn differs(&self, name: &str, value: &Value) -> bool {
		self.values.get(name) != Some(value)
	}

	/// Resets to the terminal baseline: status stopped, position sentinel,
	/// everything else cleared except sticky caller-set fields.
	pub fn reset_to_baseline(&mut self) {
		self.values.retain(|name, _| STICKY_PROPERTIES.contains(&name.as_str()));
		self.values.insert("PlaybackStatus".into(), json!(STATUS_STOPPED));
		self.values.insert("Position".into(), json!(POSITION_SENTINEL));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn baseline_reports_stopped_and_sentinel_position() {
		let snapshot = PropertySnapshot::new();
		assert_eq!(snapshot.get("PlaybackStatus"), Some(&json!(STATUS_STOPPED)));
		assert_eq!(snapshot.get("Position"), Some(&json!(POSITION_SENTINEL)));
	}

	#[test]
	fn reset_preserves_volume_but_clears_media_state() {
		let mut snapshot = PropertySnapshot::new();
		snapshot.set("Volume", json!(75));
		snapshot.set("Position", json!(123_456));
		snapshot.set("Identity", json!("omxplayer"));

		snapshot.reset_to_baseline();

		assert_eq!(snapshot.get("Volume"), Some(&json!(75)));
		assert_eq!(snapshot.get("Position"), Some(&json!(POSITION_SENTINEL)));
		assert_eq!(snapshot.get("Identity"), None);
	}

	#[test]
	fn differs_compares_by_value() {
		let mut snapshot = PropertySnapshot::new();
		snapshot.set("Volume", json!(50));
		assert!(!snapshot.differs("Volume", &json!(50)));
		assert!(snapshot.differs("Volume", &json!(51)));
		assert!(snapshot.differs("Duration", &json!(0)));
	}
}
