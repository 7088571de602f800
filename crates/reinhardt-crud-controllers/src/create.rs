//! Create controller
//!
//! Creation has no previous version to roll back to, so it always waits for
//! the provider.

use crate::context::ControllerContext;
use futures_signals::signal::Mutable;
use reinhardt_crud_core::Notification;
use reinhardt_crud_core::notifications::keys;
use reinhardt_crud_types::{ControllerResult, CreateParams, Record};
use serde_json::json;
use std::sync::Arc;

/// Controller of a creation form
pub struct CreateController {
	pub resource: String,
	/// Last created record
	pub record: Mutable<Option<Record>>,
	pub is_saving: Mutable<bool>,
	pub error: Mutable<Option<String>>,
	context: ControllerContext,
}

impl CreateController {
	pub fn new(context: ControllerContext, resource: impl Into<String>) -> Arc<Self> {
		Arc::new(Self {
			resource: resource.into(),
			record: Mutable::new(None),
			is_saving: Mutable::new(false),
			error: Mutable::new(None),
			context,
		})
	}

	/// Create a record
	///
	/// The created record is cached and every cached list of the resource is
	/// dropped, since the new row may belong to any of them.
	pub async fn save(&self, data: Record) -> ControllerResult<Record> {
		self.is_saving.set(true);
		self.error.set(None);
		let result = self
			.context
			.provider
			.create(&self.resource, CreateParams { data, meta: None })
			.await;

		let outcome = match result {
			Ok(record) => {
				self.context.cache.put_record(&self.resource, record.clone());
				self.context.cache.invalidate_lists(&self.resource);
				self.context.notifications.push(
					Notification::success(keys::CREATED)
						.with_arg("resource", json!(self.resource))
						.with_arg("smart_count", json!(1))
						.with_auto_hide(self.context.settings.notifications.auto_hide_ms),
				);
				tracing::debug!(resource = %self.resource, id = ?record.id(), "Record created");
				self.record.set(Some(record.clone()));
				Ok(record)
			}
			Err(e) => {
				tracing::warn!(resource = %self.resource, error = %e, "Create rejected by data provider");
				self.error.set(Some(e.message.clone()));
				self.context.coordinator.notify_error(&self.resource, &e, 1);
				Err(e.into())
			}
		};
		self.is_saving.set(false);
		outcome
	}
}

impl std::fmt::Debug for CreateController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CreateController")
			.field("resource", &self.resource)
			.field("is_saving", &self.is_saving.get())
			.finish_non_exhaustive()
	}
}
