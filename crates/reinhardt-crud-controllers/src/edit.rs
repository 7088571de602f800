//! Edit controller
//!
//! Saves go through the mutation coordinator. In optimistic and undoable
//! modes the save settles after `save` returned, possibly after the view
//! replaced its success handler; settlements therefore call the handler
//! through a [`LatestCallback`] trampoline.

use crate::context::ControllerContext;
use futures_signals::signal::Mutable;
use reinhardt_crud_core::{LatestCallback, MutationOutcome, MutationTicket};
use reinhardt_crud_types::{
	ControllerError, ControllerResult, GetOneParams, MutationMode, Record, RecordId,
};
use std::sync::{Arc, Weak};

/// Controller of an edit form
pub struct EditController {
	pub resource: String,
	pub id: RecordId,
	pub record: Mutable<Option<Record>>,
	pub is_loading: Mutable<bool>,
	/// Set while a save is waiting for the provider
	pub is_saving: Mutable<bool>,
	pub error: Mutable<Option<String>>,
	on_success: LatestCallback<Record>,
	on_failure: LatestCallback<ControllerError>,
	context: ControllerContext,
}

impl EditController {
	pub fn new(context: ControllerContext, resource: impl Into<String>, id: RecordId) -> Arc<Self> {
		Arc::new(Self {
			resource: resource.into(),
			id,
			record: Mutable::new(None),
			is_loading: Mutable::new(false),
			is_saving: Mutable::new(false),
			error: Mutable::new(None),
			on_success: LatestCallback::new(),
			on_failure: LatestCallback::new(),
			context,
		})
	}

	/// Replace the handler called with the saved record
	pub fn set_on_success<F>(&self, callback: F)
	where
		F: Fn(Record) + Send + Sync + 'static,
	{
		self.on_success.set(callback);
	}

	/// Replace the handler called when a save fails
	pub fn set_on_failure<F>(&self, callback: F)
	where
		F: Fn(ControllerError) + Send + Sync + 'static,
	{
		self.on_failure.set(callback);
	}

	pub async fn load(&self) -> ControllerResult<()> {
		self.is_loading.set(true);
		self.error.set(None);
		let params = GetOneParams {
			id: self.id.clone(),
			meta: None,
		};
		let result = self.context.provider.get_one(&self.resource, params).await;
		let outcome = match result {
			Ok(record) => {
				self.context.cache.put_record(&self.resource, record);
				self.refresh_from_cache();
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

	pub fn refresh_from_cache(&self) {
		self.record
			.set(self.context.cache.get_record(&self.resource, &self.id));
	}

	/// Save `patch` over the loaded record
	///
	/// The loaded record is handed to the provider as the previous version.
	pub async fn save(self: &Arc<Self>, patch: Record, mode: MutationMode) -> ControllerResult<MutationTicket> {
		self.error.set(None);
		self.is_saving.set(true);
		let previous = self.record.get_cloned();
		let result = self
			.context
			.coordinator
			.update(&self.resource, self.id.clone(), patch, previous, mode)
			.await;
		self.refresh_from_cache();

		let ticket = match result {
			Ok(ticket) => ticket,
			Err(e) => {
				self.is_saving.set(false);
				self.fail(e.clone());
				return Err(e);
			}
		};
		self.settle_in_background(&ticket);
		Ok(ticket)
	}

	/// Delete the edited record
	pub async fn delete(self: &Arc<Self>, mode: MutationMode) -> ControllerResult<MutationTicket> {
		let previous = self.record.get_cloned();
		let ticket = self
			.context
			.coordinator
			.delete(&self.resource, self.id.clone(), previous, mode)
			.await?;
		self.refresh_from_cache();
		Ok(ticket)
	}

	fn settle_in_background(self: &Arc<Self>, ticket: &MutationTicket) {
		let on_success = self.on_success.trampoline();
		let on_failure = self.on_failure.trampoline();
		let weak: Weak<Self> = Arc::downgrade(self);
		let ticket = ticket.clone();

		let finish = move |outcome: Option<MutationOutcome>| {
			if let Some(edit) = weak.upgrade() {
				edit.is_saving.set(false);
				edit.refresh_from_cache();
			}
			match outcome {
				Some(MutationOutcome::Succeeded { data, .. }) => {
					if let Some(record) = data.into_iter().next() {
						on_success(record);
					}
				}
				Some(MutationOutcome::Failed(e)) => {
					if let Some(edit) = weak.upgrade() {
						edit.error.set(Some(e.to_string()));
					}
					on_failure(e);
				}
				Some(MutationOutcome::Cancelled) | None => {}
			}
		};

		match ticket.outcome() {
			Some(outcome) => finish(Some(outcome)),
			None => {
				tokio::spawn(async move {
					let outcome = ticket.settled().await;
					finish(outcome);
				});
			}
		}
	}

	fn fail(&self, error: ControllerError) {
		self.error.set(Some(error.to_string()));
		self.on_failure.call(error);
	}
}

impl std::fmt::Debug for EditController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EditController")
			.field("resource", &self.resource)
			.field("id", &self.id)
			.field("is_saving", &self.is_saving.get())
			.finish_non_exhaustive()
	}
}
