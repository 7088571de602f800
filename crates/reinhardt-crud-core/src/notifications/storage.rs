//! Notification storage backends

use super::notification::Notification;
use std::collections::VecDeque;
use uuid::Uuid;

/// Storage backend for notifications
pub trait NotificationStorage: Send {
	/// Add a notification
	fn add(&mut self, notification: Notification);

	/// Remove and return every stored notification
	fn get_all(&mut self) -> Vec<Notification>;

	/// Return every stored notification without consuming them
	fn peek(&self) -> Vec<Notification>;

	/// Remove a single notification, returning whether it was stored
	fn remove(&mut self, id: Uuid) -> bool;

	/// Remove every notification
	fn clear(&mut self);
}

/// In-memory notification storage
///
/// When a capacity is set, the oldest notifications are dropped first.
///
/// # Examples
///
/// ```
/// use reinhardt_crud_core::{MemoryStorage, Notification, NotificationStorage};
///
/// let mut storage = MemoryStorage::with_capacity(2);
/// storage.add(Notification::info("a"));
/// storage.add(Notification::info("b"));
/// storage.add(Notification::info("c"));
///
/// let keys: Vec<_> = storage.peek().into_iter().map(|n| n.message_key).collect();
/// assert_eq!(keys, vec!["b", "c"]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
	notifications: VecDeque<Notification>,
	capacity: Option<usize>,
}

impl MemoryStorage {
	/// Create an unbounded storage
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a storage keeping at most `capacity` notifications
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			notifications: VecDeque::with_capacity(capacity),
			capacity: Some(capacity.max(1)),
		}
	}
}

impl NotificationStorage for MemoryStorage {
	fn add(&mut self, notification: Notification) {
		if let Some(capacity) = self.capacity {
			while self.notifications.len() >= capacity {
				self.notifications.pop_front();
			}
		}
		self.notifications.push_back(notification);
	}

	fn get_all(&mut self) -> Vec<Notification> {
		self.notifications.drain(..).collect()
	}

	fn peek(&self) -> Vec<Notification> {
		self.notifications.iter().cloned().collect()
	}

	fn remove(&mut self, id: Uuid) -> bool {
		let before = self.notifications.len();
		self.notifications.retain(|n| n.id != id);
		self.notifications.len() != before
	}

	fn clear(&mut self) {
		self.notifications.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_memory_storage_get_all_consumes() {
		let mut storage = MemoryStorage::new();

		storage.add(Notification::info("first"));
		assert_eq!(storage.peek().len(), 1);

		let notifications = storage.get_all();
		assert_eq!(notifications.len(), 1);
		assert_eq!(storage.peek().len(), 0);
	}

	#[rstest]
	fn test_memory_storage_remove() {
		let mut storage = MemoryStorage::new();
		let keep = Notification::info("keep");
		let drop = Notification::info("drop");
		let drop_id = drop.id;

		storage.add(keep);
		storage.add(drop);

		assert!(storage.remove(drop_id));
		assert!(!storage.remove(drop_id));
		assert_eq!(storage.peek().len(), 1);
		assert_eq!(storage.peek()[0].message_key, "keep");
	}

	#[rstest]
	fn test_memory_storage_clear() {
		let mut storage = MemoryStorage::new();
		storage.add(Notification::info("a"));
		storage.add(Notification::error("b"));

		storage.clear();

		assert!(storage.peek().is_empty());
	}
}
