//! Batched property reads diffed into change sets.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use crate::invoke::InvocationQueue;
use crate::snapshot::PropertySnapshot;

/// One observed property change.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
	pub name: String,
	pub old: Option<Value>,
	pub new: Value,
}

/// Reads `names` in order through `queue` and diffs against `snapshot`.
///
/// A failed read is logged and skipped; the batch always runs to the end so
/// one bad property cannot starve the rest. Values that differ from the
/// cached snapshot (by value inequality) update it and are returned in batch
/// order.
pub async fn poll_once(queue: &InvocationQueue, names: &[String], snapshot: &Mutex<PropertySnapshot>) -> Vec<PropertyChange> {
	let mut fresh = Vec::with_capacity(names.len());
	for name in names {
		match queue.get_property(name).await {
			Ok(value) => fresh.push((name.as_str(), value)),
			Err(e) => {
				warn!(target = "omx.poll", property = %name, error = %e, "property read failed; skipping");
			}
		}
	}

	let mut snapshot = snapshot.lock().unwrap_or_else(PoisonError::into_inner);
	let mut changes = Vec::new();
	for (name, value) in fresh {
		if snapshot.differs(name, &value) {
			let old = snapshot.set(name, value.clone());
			changes.push(PropertyChange {
				name: name.to_string(),
				old,
				new: value,
			});
		}
	}
	if !changes.is_empty() {
		debug!(target = "omx.poll", changed = changes.len(), "poll cycle observed changes");
	}
	changes
}

/// Collapses `changes` into the aggregate name→value map for the batched
/// notification.
pub fn change_map(changes: &[PropertyChange]) -> BTreeMap<String, Value> {
	changes.iter().map(|c| (c.name.clone(), c.new.clone())).collect()
}

#[cfg(test)]
mod tests {
	use omx_protocol::Response;
	use serde_json::json;

	use super::*;
	use crate::channel::Connection;
	use crate::channel::fake::FakeTransport;

	fn live_names() -> Vec<String> {
		vec!["Volume".into(), "Position".into()]
	}

	async fn queue_with(script: impl Fn(&omx_protocol::Request) -> Response + Send + Sync + 'static) -> InvocationQueue {
		let queue = InvocationQueue::new();
		let (transport, _) = FakeTransport::scripted(script);
		queue.attach(Connection::from_transport(Box::new(transport), "dest")).await;
		queue
	}

	#[tokio::test]
	async fn only_changed_properties_are_reported() {
		let queue = queue_with(|request| match request.args[0].as_str() {
			Some("Volume") => Response::ok(json!(50)),
			Some("Position") => Response::ok(json!(2000)),
			_ => Response::err("unknown property"),
		})
		.await;

		let snapshot = Mutex::new(PropertySnapshot::new());
		{
			let mut s = snapshot.lock().unwrap();
			s.set("Volume", json!(50));
			s.set("Position", json!(1000));
		}

		let changes = poll_once(&queue, &live_names(), &snapshot).await;
		assert_eq!(changes.len(), 1);
		assert_eq!(changes[0].name, "Position");
		assert_eq!(changes[0].old, Some(json!(1000)));
		assert_eq!(changes[0].new, json!(2000));

		let aggregate = change_map(&changes);
		assert_eq!(aggregate.get("Position"), Some(&json!(2000)));
		assert!(!aggregate.contains_key("Volume"));
	}

	#[tokio::test]
	async fn failed_read_is_skipped_and_batch_continues() {
		let queue = queue_with(|request| match request.args[0].as_str() {
			Some("Volume") => Response::err("transient"),
			_ => Response::ok(json!(7)),
		})
		.await;

		let snapshot = Mutex::new(PropertySnapshot::new());
		let changes = poll_once(&queue, &live_names(), &snapshot).await;

		assert_eq!(changes.len(), 1);
		assert_eq!(changes[0].name, "Position");
		assert_eq!(snapshot.lock().unwrap().get("Position"), Some(&json!(7)));
	}

	#[tokio::test]
	async fn unchanged_batch_reports_nothing() {
		let queue = queue_with(|_| Response::ok(json!(42))).await;
		let snapshot = Mutex::new(PropertySnapshot::new());

		let first = poll_once(&queue, &live_names(), &snapshot).await;
		assert_eq!(first.len(), 2);
		let second = poll_once(&queue, &live_names(), &snapshot).await;
		assert!(second.is_empty());
	}
}
