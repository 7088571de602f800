//! Shared notification channel

use super::notification::Notification;
use super::storage::{MemoryStorage, NotificationStorage};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Process-wide queue of user-facing notifications
///
/// Notifications are kept in a storage backend until the view drains them,
/// and are also broadcast to live subscribers.
///
/// # Examples
///
/// ```
/// use reinhardt_crud_core::{Notification, NotificationChannel};
///
/// let channel = NotificationChannel::new(16);
/// channel.push(Notification::success("crud.notification.updated"));
///
/// assert_eq!(channel.peek().len(), 1);
/// assert_eq!(channel.drain().len(), 1);
/// assert!(channel.is_empty());
/// ```
#[derive(Clone)]
pub struct NotificationChannel {
	storage: Arc<Mutex<Box<dyn NotificationStorage>>>,
	sender: broadcast::Sender<Notification>,
}

impl NotificationChannel {
	/// Create a channel backed by unbounded in-memory storage
	///
	/// `capacity` bounds the broadcast buffer of slow subscribers.
	pub fn new(capacity: usize) -> Self {
		Self::with_storage(MemoryStorage::new(), capacity)
	}

	/// Create a channel with a custom storage backend
	pub fn with_storage(storage: impl NotificationStorage + 'static, capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self {
			storage: Arc::new(Mutex::new(Box::new(storage))),
			sender,
		}
	}

	/// Push a notification, returning its id
	pub fn push(&self, notification: Notification) -> Uuid {
		let id = notification.id;
		tracing::debug!(
			key = %notification.message_key,
			level = %notification.level,
			undoable = notification.is_undoable(),
			"Notification pushed"
		);
		self.storage.lock().add(notification.clone());
		// No subscribers is not an error: the storage still holds the notification
		let _ = self.sender.send(notification);
		id
	}

	/// Remove a notification that has not been consumed yet
	pub fn dismiss(&self, id: Uuid) -> bool {
		self.storage.lock().remove(id)
	}

	/// Remove and return every stored notification
	pub fn drain(&self) -> Vec<Notification> {
		self.storage.lock().get_all()
	}

	/// Return every stored notification without consuming them
	pub fn peek(&self) -> Vec<Notification> {
		self.storage.lock().peek()
	}

	/// Stored notifications with the given message key
	pub fn peek_by_key(&self, message_key: &str) -> Vec<Notification> {
		self.peek()
			.into_iter()
			.filter(|n| n.message_key == message_key)
			.collect()
	}

	/// Number of stored notifications
	pub fn len(&self) -> usize {
		self.storage.lock().peek().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Remove every stored notification
	pub fn clear(&self) {
		self.storage.lock().clear();
	}

	/// Subscribe to notifications pushed from now on
	pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
		self.sender.subscribe()
	}
}

impl Default for NotificationChannel {
	fn default() -> Self {
		Self::new(64)
	}
}

impl std::fmt::Debug for NotificationChannel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NotificationChannel")
			.field("stored", &self.len())
			.field("subscribers", &self.sender.receiver_count())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::notifications::Level;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_subscribers_receive_pushed_notifications() {
		let channel = NotificationChannel::new(8);
		let mut rx = channel.subscribe();

		channel.push(Notification::error("crud.notification.http_error"));

		let received = rx.recv().await.unwrap();
		assert_eq!(received.level, Level::Error);
		assert_eq!(received.message_key, "crud.notification.http_error");
	}

	#[rstest]
	fn test_push_without_subscribers_is_stored() {
		let channel = NotificationChannel::new(8);

		channel.push(Notification::info("a"));
		channel.push(Notification::info("b"));

		assert_eq!(channel.len(), 2);
		assert_eq!(channel.peek_by_key("b").len(), 1);
	}

	#[rstest]
	fn test_dismiss_removes_stored_notification() {
		let channel = NotificationChannel::new(8);
		let id = channel.push(Notification::info("undo"));

		assert!(channel.dismiss(id));
		assert!(channel.is_empty());
	}

	#[rstest]
	fn test_clones_share_storage() {
		let channel = NotificationChannel::new(8);
		let clone = channel.clone();

		clone.push(Notification::warning("w"));

		assert_eq!(channel.len(), 1);
	}
}
