//! Notification fan-out to subscribed callers.

use std::sync::{Mutex, PoisonError};

use omx_protocol::Notification;
use tokio::sync::mpsc;
use tracing::trace;

/// Delivers [`Notification`]s to every live subscriber in emission order.
///
/// Subscribers that drop their receiver are pruned on the next emit. Channels
/// are unbounded so a slow subscriber can never stall the session tasks.
#[derive(Default)]
pub struct NotificationHub {
	subscribers: Mutex<Vec<mpsc::UnboundedSender<Notification>>>,
}

impl NotificationHub {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a new subscriber and returns its receiving end.
	pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Notification> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
		rx
	}

	/// Sends `notification` to every live subscriber.
	pub fn emit(&self, notification: Notification) {
		trace!(target = "omx.events", ?notification, "emit");
		let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
		subscribers.retain(|tx| tx.send(notification.clone()).is_ok());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn every_subscriber_sees_emissions_in_order() {
		let hub = NotificationHub::new();
		let mut a = hub.subscribe();
		let mut b = hub.subscribe();

		hub.emit(Notification::ChannelOpened);
		hub.emit(Notification::Stopped);

		for rx in [&mut a, &mut b] {
			assert_eq!(rx.recv().await, Some(Notification::ChannelOpened));
			assert_eq!(rx.recv().await, Some(Notification::Stopped));
		}
	}

	#[tokio::test]
	async fn dropped_subscribers_are_pruned() {
		let hub = NotificationHub::new();
		let rx = hub.subscribe();
		drop(rx);
		hub.emit(Notification::Stopped);
		assert!(hub.subscribers.lock().unwrap().is_empty());
	}
}
