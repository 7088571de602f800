//! Delete controller

use crate::context::ControllerContext;
use reinhardt_crud_core::MutationTicket;
use reinhardt_crud_types::{ControllerResult, MutationMode, RecordId};

/// Controller behind delete buttons and bulk delete actions
#[derive(Debug, Clone)]
pub struct DeleteController {
	pub resource: String,
	context: ControllerContext,
}

impl DeleteController {
	pub fn new(context: ControllerContext, resource: impl Into<String>) -> Self {
		Self {
			resource: resource.into(),
			context,
		}
	}

	/// Delete one record, using its cached version as the previous data
	pub async fn delete(&self, id: RecordId, mode: MutationMode) -> ControllerResult<MutationTicket> {
		let previous = self.context.cache.get_record(&self.resource, &id);
		self.context
			.coordinator
			.delete(&self.resource, id, previous, mode)
			.await
	}

	pub async fn delete_many(
		&self,
		ids: Vec<RecordId>,
		mode: MutationMode,
	) -> ControllerResult<MutationTicket> {
		self.context
			.coordinator
			.delete_many(&self.resource, ids, mode)
			.await
	}

	/// Delete under the configured default mode
	pub async fn delete_default(&self, id: RecordId) -> ControllerResult<MutationTicket> {
		let mode = self.context.settings.mutation.default_mode;
		self.delete(id, mode).await
	}

	pub fn undo(&self, ticket: &MutationTicket) -> bool {
		ticket
			.handle()
			.is_some_and(|handle| self.context.coordinator.undo(handle))
	}

	pub fn is_pending(&self, id: &RecordId) -> bool {
		self.context.coordinator.is_pending(&self.resource, id)
	}
}
