//! Show controller

use crate::context::ControllerContext;
use futures_signals::signal::{Mutable, Signal};
use reinhardt_crud_types::{ControllerResult, GetOneParams, Record, RecordId};
use std::sync::Arc;

/// Controller of a read-only record view
pub struct ShowController {
	pub resource: String,
	pub id: RecordId,
	/// Loaded record; `None` before loading and once deleted
	pub record: Mutable<Option<Record>>,
	pub is_loading: Mutable<bool>,
	pub error: Mutable<Option<String>>,
	context: ControllerContext,
}

impl ShowController {
	pub fn new(context: ControllerContext, resource: impl Into<String>, id: RecordId) -> Arc<Self> {
		Arc::new(Self {
			resource: resource.into(),
			id,
			record: Mutable::new(None),
			is_loading: Mutable::new(false),
			error: Mutable::new(None),
			context,
		})
	}

	/// Fetch the record, showing the cached version while the provider answers
	pub async fn load(&self) -> ControllerResult<()> {
		self.is_loading.set(true);
		self.error.set(None);
		self.refresh_from_cache();

		let params = GetOneParams {
			id: self.id.clone(),
			meta: None,
		};
		let result = self.context.provider.get_one(&self.resource, params).await;
		let outcome = match result {
			Ok(record) => {
				// A record with a pending mutation keeps its speculative version
				if !self.context.cache.put_record(&self.resource, record.clone())
					&& self.context.cache.is_speculative(&self.resource, &self.id)
				{
					self.refresh_from_cache();
				} else {
					self.record.set(Some(record));
				}
				Ok(())
			}
			Err(e) => {
				tracing::warn!(resource = %self.resource, id = %self.id, error = %e, "Failed to load record");
				self.error
					.set(Some(format!("Failed to load data: {}", e.message)));
				Err(e.into())
			}
		};
		self.is_loading.set(false);
		outcome
	}

	/// Re-read the record from the cache
	pub fn refresh_from_cache(&self) {
		let cached = self.context.cache.get_record(&self.resource, &self.id);
		if cached.is_some() || self.context.cache.is_speculative(&self.resource, &self.id) {
			self.record.set(cached);
		}
	}

	pub fn is_pending(&self) -> bool {
		self.context.coordinator.is_pending(&self.resource, &self.id)
	}

	/// Whether a mutation of this record is in flight
	pub fn pending_signal(&self) -> impl Signal<Item = bool> + use<> {
		self.context
			.coordinator
			.pending_signal(&self.resource, &self.id)
	}
}

impl std::fmt::Debug for ShowController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ShowController")
			.field("resource", &self.resource)
			.field("id", &self.id)
			.finish_non_exhaustive()
	}
}
