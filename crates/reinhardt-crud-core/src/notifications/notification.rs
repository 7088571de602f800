//! Notification structure

use super::levels::Level;
use crate::undo::EntryHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Message keys pushed by the controller layer
///
/// The catalog translating these keys is provided by the application.
pub mod keys {
	pub const UPDATED: &str = "crud.notification.updated";
	pub const DELETED: &str = "crud.notification.deleted";
	pub const CREATED: &str = "crud.notification.created";
	pub const UNDO_AVAILABLE: &str = "crud.notification.undo_available";
	pub const UNDONE: &str = "crud.notification.undone";
	pub const HTTP_ERROR: &str = "crud.notification.http_error";
	pub const QUEUE_CONFLICT: &str = "crud.notification.queue_conflict";
}

/// A single user-facing notification
///
/// # Examples
///
/// ```
/// use reinhardt_crud_core::{Level, Notification};
/// use serde_json::json;
///
/// let notification = Notification::success("crud.notification.deleted")
/// 	.with_arg("resource", json!("posts"))
/// 	.with_arg("smart_count", json!(2));
///
/// assert_eq!(notification.level, Level::Success);
/// assert_eq!(notification.arg("smart_count"), Some(&json!(2)));
/// assert!(!notification.is_undoable());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
	pub id: Uuid,
	/// Catalog key of the message
	pub message_key: String,
	pub level: Level,
	/// Structured arguments (resource name, pluralization count, ...)
	pub args: Map<String, Value>,
	/// Set when the view should offer an "undo" action
	pub undo_handle: Option<EntryHandle>,
	/// How long the view should keep the notification visible
	pub auto_hide_ms: Option<u64>,
	pub created_at: DateTime<Utc>,
}

impl Notification {
	/// Create a notification with a level and message key
	pub fn new(level: Level, message_key: impl Into<String>) -> Self {
		Self {
			id: Uuid::new_v4(),
			message_key: message_key.into(),
			level,
			args: Map::new(),
			undo_handle: None,
			auto_hide_ms: None,
			created_at: Utc::now(),
		}
	}

	pub fn info(message_key: impl Into<String>) -> Self {
		Self::new(Level::Info, message_key)
	}

	pub fn success(message_key: impl Into<String>) -> Self {
		Self::new(Level::Success, message_key)
	}

	pub fn warning(message_key: impl Into<String>) -> Self {
		Self::new(Level::Warning, message_key)
	}

	pub fn error(message_key: impl Into<String>) -> Self {
		Self::new(Level::Error, message_key)
	}

	/// Add a structured argument
	pub fn with_arg(mut self, name: impl Into<String>, value: Value) -> Self {
		self.args.insert(name.into(), value);
		self
	}

	/// Attach the undo handle of a pending mutation
	pub fn with_undo(mut self, handle: EntryHandle) -> Self {
		self.undo_handle = Some(handle);
		self
	}

	pub fn with_auto_hide(mut self, auto_hide_ms: Option<u64>) -> Self {
		self.auto_hide_ms = auto_hide_ms;
		self
	}

	/// Get an argument
	pub fn arg(&self, name: &str) -> Option<&Value> {
		self.args.get(name)
	}

	/// Whether the notification offers an undo action
	pub fn is_undoable(&self) -> bool {
		self.undo_handle.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_notification_ids_are_unique() {
		let a = Notification::info(keys::UPDATED);
		let b = Notification::info(keys::UPDATED);

		assert_ne!(a.id, b.id);
	}

	#[rstest]
	fn test_notification_with_undo() {
		let handle = EntryHandle::new();
		let notification = Notification::info(keys::UNDO_AVAILABLE)
			.with_undo(handle)
			.with_auto_hide(Some(5000));

		assert!(notification.is_undoable());
		assert_eq!(notification.undo_handle, Some(handle));
		assert_eq!(notification.auto_hide_ms, Some(5000));
	}

	#[rstest]
	fn test_notification_serializes_level_lowercase() {
		let notification = Notification::error(keys::HTTP_ERROR).with_arg("message", json!("boom"));
		let value = serde_json::to_value(&notification).unwrap();

		assert_eq!(value["level"], json!("error"));
		assert_eq!(value["args"]["message"], json!("boom"));
	}
}
