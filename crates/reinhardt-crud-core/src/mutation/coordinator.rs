//! Mutation coordinator
//!
//! Runs update and delete actions against the data provider under one of
//! three modes and keeps the record cache, the pending tracker and the
//! notification channel consistent whichever mode is used.

use super::outcome::{MutationOutcome, MutationTicket};
use crate::cache::{RecordCache, Speculation};
use crate::notifications::{Notification, NotificationChannel, keys};
use crate::pending::PendingTracker;
use crate::settings::CrudSettings;
use crate::undo::{CallTimeInfo, EntryHandle, PendingMutation, UndoQueue};
use futures::FutureExt;
use futures_signals::signal::Signal;
use parking_lot::Mutex;
use reinhardt_crud_types::record::ID_FIELD;
use reinhardt_crud_types::{
	ControllerError, ControllerResult, DataProvider, DeleteManyParams, DeleteParams,
	MutationAction, MutationKind, MutationMode, MutationParams, ProviderError, ProviderResult,
	Record, RecordId, UpdateManyParams, UpdateParams,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

struct CoordinatorInner {
	provider: Arc<dyn DataProvider>,
	cache: RecordCache,
	notifications: NotificationChannel,
	queue: UndoQueue,
	pending: PendingTracker,
	settings: CrudSettings,
}

/// Executes mutations and reconciles the cache
///
/// Cloning the coordinator yields another handle to the same queue, cache
/// and notification channel.
#[derive(Clone)]
pub struct MutationCoordinator {
	inner: Arc<CoordinatorInner>,
}

impl MutationCoordinator {
	pub fn new(
		provider: Arc<dyn DataProvider>,
		cache: RecordCache,
		notifications: NotificationChannel,
		settings: CrudSettings,
	) -> Self {
		let queue = UndoQueue::new(settings.undo.conflict_policy);
		Self::with_queue(provider, cache, notifications, queue, settings)
	}

	/// Create a coordinator sharing an existing undo queue
	pub fn with_queue(
		provider: Arc<dyn DataProvider>,
		cache: RecordCache,
		notifications: NotificationChannel,
		queue: UndoQueue,
		settings: CrudSettings,
	) -> Self {
		Self {
			inner: Arc::new(CoordinatorInner {
				provider,
				cache,
				notifications,
				queue,
				pending: PendingTracker::new(),
				settings,
			}),
		}
	}

	pub fn cache(&self) -> &RecordCache {
		&self.inner.cache
	}

	pub fn notifications(&self) -> &NotificationChannel {
		&self.inner.notifications
	}

	pub fn queue(&self) -> &UndoQueue {
		&self.inner.queue
	}

	pub fn pending(&self) -> &PendingTracker {
		&self.inner.pending
	}

	pub fn settings(&self) -> &CrudSettings {
		&self.inner.settings
	}

	pub fn provider(&self) -> &Arc<dyn DataProvider> {
		&self.inner.provider
	}

	/// Execute a mutation under the configured default mode
	pub async fn execute_default(&self, params: MutationParams) -> ControllerResult<MutationTicket> {
		self.execute(params, self.inner.settings.mutation.default_mode)
			.await
	}

	/// Execute a mutation
	///
	/// Invalid requests fail before the cache is touched. Pessimistic
	/// mutations return once the provider answered; optimistic and undoable
	/// mutations return a pending ticket right after the speculative write.
	pub async fn execute(
		&self,
		params: MutationParams,
		mode: MutationMode,
	) -> ControllerResult<MutationTicket> {
		let params = self.prepare(params)?;
		tracing::debug!(
			resource = %params.resource,
			mode = %mode,
			kind = ?params.action.kind(),
			count = params.action.ids().len(),
			"Executing mutation"
		);

		match mode {
			MutationMode::Pessimistic => self.execute_pessimistic(params).await,
			MutationMode::Optimistic => Ok(self.execute_optimistic(params)),
			MutationMode::Undoable => self.execute_undoable(params).await,
		}
	}

	pub async fn update(
		&self,
		resource: &str,
		id: RecordId,
		data: Record,
		previous_data: Option<Record>,
		mode: MutationMode,
	) -> ControllerResult<MutationTicket> {
		let action = MutationAction::Update {
			id,
			data,
			previous_data,
		};
		self.execute(MutationParams::new(resource, action), mode)
			.await
	}

	pub async fn update_many(
		&self,
		resource: &str,
		ids: Vec<RecordId>,
		data: Record,
		mode: MutationMode,
	) -> ControllerResult<MutationTicket> {
		let action = MutationAction::UpdateMany { ids, data };
		self.execute(MutationParams::new(resource, action), mode)
			.await
	}

	pub async fn delete(
		&self,
		resource: &str,
		id: RecordId,
		previous_data: Option<Record>,
		mode: MutationMode,
	) -> ControllerResult<MutationTicket> {
		let action = MutationAction::Delete { id, previous_data };
		self.execute(MutationParams::new(resource, action), mode)
			.await
	}

	pub async fn delete_many(
		&self,
		resource: &str,
		ids: Vec<RecordId>,
		mode: MutationMode,
	) -> ControllerResult<MutationTicket> {
		let action = MutationAction::DeleteMany { ids };
		self.execute(MutationParams::new(resource, action), mode)
			.await
	}

	/// Cancel an undoable mutation still in its grace period
	pub fn undo(&self, handle: EntryHandle) -> bool {
		self.inner.queue.cancel(handle)
	}

	/// Execute an undoable mutation now instead of waiting for its grace period
	pub async fn commit_now(&self, handle: EntryHandle) -> Option<MutationOutcome> {
		self.inner
			.queue
			.commit(handle, CallTimeInfo::Committed)
			.await
	}

	/// Execute every undoable mutation still in its grace period
	pub async fn flush(&self) -> usize {
		self.inner.queue.flush().await
	}

	/// Execute pending undoable mutations and refuse new ones
	pub async fn dispose(&self) -> usize {
		self.inner.queue.dispose().await
	}

	pub fn is_pending(&self, resource: &str, id: &RecordId) -> bool {
		self.inner.pending.is_pending(resource, id)
	}

	pub fn pending_signal(&self, resource: &str, id: &RecordId) -> impl Signal<Item = bool> + use<> {
		self.inner.pending.pending_signal(resource, id)
	}

	/// Validate a request and resolve the previous version of updated records
	fn prepare(&self, mut params: MutationParams) -> ControllerResult<MutationParams> {
		if params.resource.trim().is_empty() {
			return Err(ControllerError::invalid("resource must not be empty"));
		}
		let ids = params.action.ids();
		if ids.is_empty() {
			return Err(ControllerError::invalid("at least one record id is required"));
		}
		if ids.iter().any(RecordId::is_empty) {
			return Err(ControllerError::invalid("record ids must not be empty"));
		}

		if let MutationAction::Update {
			id, previous_data, ..
		} = &mut params.action
		{
			let cached = self.inner.cache.get_record(&params.resource, id);
			let previous = match (previous_data.take(), cached) {
				(Some(mut explicit), _) => {
					if explicit.id().is_none() {
						explicit.set(ID_FIELD, json!(id.as_str()));
					}
					explicit
				}
				(None, Some(cached)) => cached,
				(None, None) => {
					return Err(ControllerError::invalid(format!(
						"no previous version of {} {} to roll back to",
						params.resource, id
					)));
				}
			};
			*previous_data = Some(previous);
		}
		Ok(params)
	}

	async fn execute_pessimistic(&self, params: MutationParams) -> ControllerResult<MutationTicket> {
		let ids = params.action.ids();
		let kind = params.action.kind();
		self.inner.pending.mark(&params.resource, &ids);
		let result = call_provider(Arc::clone(&self.inner.provider), params.clone()).await;
		self.inner.pending.unmark(&params.resource, &ids);

		match result {
			Ok((settled_ids, data)) => {
				self.reconcile(&params, &settled_ids, &data);
				self.notify_success(&params.resource, kind, settled_ids.len());
				let (_tx, rx) = watch::channel(Some(MutationOutcome::Succeeded {
					ids: settled_ids,
					data,
				}));
				Ok(MutationTicket::new(
					MutationMode::Pessimistic,
					params.resource,
					ids,
					None,
					rx,
				))
			}
			Err(e) => {
				tracing::warn!(
					error = %e,
					resource = %params.resource,
					"Mutation rejected by data provider"
				);
				self.notify_error(&params.resource, &e, ids.len());
				Err(e.into())
			}
		}
	}

	fn execute_optimistic(&self, params: MutationParams) -> MutationTicket {
		let ids = params.action.ids();
		let speculation = self.speculate(&params);
		self.inner.pending.mark(&params.resource, &ids);

		let (tx, rx) = watch::channel(None);
		let this = self.clone();
		let resource = params.resource.clone();
		let kind = params.action.kind();
		let count = ids.len();
		tokio::spawn(async move {
			let resource = params.resource.clone();
			let outcome = this.settle(params, speculation).await;
			match &outcome {
				MutationOutcome::Succeeded { ids, .. } => {
					this.notify_success(&resource, kind, ids.len());
				}
				MutationOutcome::Failed(ControllerError::ProviderFailure { source, .. }) => {
					this.notify_error(&resource, source, count);
				}
				_ => {}
			}
			tx.send_replace(Some(outcome));
		});

		MutationTicket::new(MutationMode::Optimistic, resource, ids, None, rx)
	}

	async fn execute_undoable(&self, params: MutationParams) -> ControllerResult<MutationTicket> {
		let ids = params.action.ids();
		let kind = params.action.kind();
		let resource = params.resource.clone();
		let settings = &self.inner.settings;

		let speculation = self.speculate(&params);
		self.inner.pending.mark(&resource, &ids);

		let handle = EntryHandle::new();
		let undo_notification = self.inner.notifications.push(
			Notification::info(keys::UNDO_AVAILABLE)
				.with_arg("resource", json!(resource))
				.with_arg("smart_count", json!(ids.len()))
				.with_arg("action", json!(kind.as_past_tense()))
				.with_undo(handle)
				.with_auto_hide(Some(settings.undo.grace_period_ms)),
		);

		let slot = Arc::new(Mutex::new(Some(speculation)));
		let (tx, rx) = watch::channel(None);
		let tx = Arc::new(tx);

		let pending = {
			let this = self.clone();
			let slot = Arc::clone(&slot);
			PendingMutation::new(resource.clone(), ids.clone(), move |_info| {
				async move {
					let speculation = slot.lock().take();
					match speculation {
						Some(speculation) => this.settle(params, speculation).await,
						None => MutationOutcome::Failed(ControllerError::invalid(
							"speculative write already settled",
						)),
					}
				}
				.boxed()
			})
		};

		let on_settle = {
			let this = self.clone();
			let tx = Arc::clone(&tx);
			let resource = resource.clone();
			let count = ids.len();
			move |outcome: &MutationOutcome, info: CallTimeInfo| {
				this.inner.notifications.dismiss(undo_notification);
				match outcome {
					MutationOutcome::Succeeded { ids, .. } => {
						if this.inner.settings.notifications.notify_on_undoable_success {
							this.notify_success(&resource, kind, ids.len());
						}
					}
					MutationOutcome::Failed(ControllerError::ProviderFailure { source, .. }) => {
						this.notify_error(&resource, source, count);
					}
					_ => {}
				}
				tracing::debug!(resource = %resource, info = %info, "Undoable mutation settled");
				tx.send_replace(Some(outcome.clone()));
			}
		};

		let on_cancel = {
			let this = self.clone();
			let tx = Arc::clone(&tx);
			let slot = Arc::clone(&slot);
			let resource = resource.clone();
			let ids = ids.clone();
			move || {
				this.rollback(&slot, &resource, &ids, undo_notification);
				if this.inner.settings.notifications.notify_on_undo {
					this.inner.notifications.push(
						Notification::info(keys::UNDONE)
							.with_arg("resource", json!(resource))
							.with_arg("smart_count", json!(ids.len()))
							.with_auto_hide(this.inner.settings.notifications.auto_hide_ms),
					);
				}
				tx.send_replace(Some(MutationOutcome::Cancelled));
			}
		};

		let stream = settings.undo.stream_scope.key(&resource, &ids);
		let pending = pending
			.with_handle(handle)
			.with_stream(stream)
			.on_settle(on_settle)
			.on_cancel(on_cancel);

		match self.inner.queue.enqueue(pending, settings.grace_period()).await {
			Ok(handle) => Ok(MutationTicket::new(
				MutationMode::Undoable,
				resource,
				ids,
				Some(handle),
				rx,
			)),
			Err(e) => {
				self.rollback(&slot, &resource, &ids, undo_notification);
				self.inner.notifications.push(
					Notification::warning(keys::QUEUE_CONFLICT)
						.with_arg("resource", json!(resource))
						.with_arg("smart_count", json!(ids.len()))
						.with_arg("message", json!(e.to_string()))
						.with_auto_hide(self.inner.settings.notifications.auto_hide_ms),
				);
				Err(e)
			}
		}
	}

	fn speculate(&self, params: &MutationParams) -> Speculation {
		let cache = &self.inner.cache;
		match &params.action {
			MutationAction::Update {
				id,
				data,
				previous_data,
			} => {
				// An uncached record gets its previous version as the baseline to revert to
				if let Some(previous) = previous_data
					&& !cache.contains(&params.resource, id)
				{
					cache.put_record(&params.resource, previous.clone());
				}
				cache.apply_update(&params.resource, std::slice::from_ref(id), data)
			}
			MutationAction::UpdateMany { ids, data } => {
				cache.apply_update(&params.resource, ids, data)
			}
			MutationAction::Delete { id, .. } => {
				cache.apply_delete(&params.resource, std::slice::from_ref(id))
			}
			MutationAction::DeleteMany { ids } => cache.apply_delete(&params.resource, ids),
		}
	}

	/// Undo a speculative write that never reached the provider
	fn rollback(
		&self,
		slot: &Mutex<Option<Speculation>>,
		resource: &str,
		ids: &[RecordId],
		undo_notification: Uuid,
	) {
		let speculation = slot.lock().take();
		if let Some(speculation) = speculation {
			self.inner.cache.revert(speculation);
		}
		self.inner.pending.unmark(resource, ids);
		self.inner.notifications.dismiss(undo_notification);
	}

	/// Call the provider for a speculative write and commit or revert it
	async fn settle(&self, params: MutationParams, speculation: Speculation) -> MutationOutcome {
		let ids = params.action.ids();
		let result = call_provider(Arc::clone(&self.inner.provider), params.clone()).await;
		let outcome = match result {
			Ok((settled_ids, data)) => {
				self.inner.cache.commit(speculation, &data);
				MutationOutcome::Succeeded {
					ids: settled_ids,
					data,
				}
			}
			Err(e) => {
				tracing::error!(
					error = %e,
					resource = %params.resource,
					"Background mutation failed, reverting cache"
				);
				self.inner.cache.revert(speculation);
				MutationOutcome::Failed(e.into())
			}
		};
		self.inner.pending.unmark(&params.resource, &ids);
		outcome
	}

	/// Write a pessimistic result into the cache
	fn reconcile(&self, params: &MutationParams, settled_ids: &[RecordId], data: &[Record]) {
		let cache = &self.inner.cache;
		match &params.action {
			MutationAction::Update {
				data: patch,
				previous_data,
				..
			} => {
				let base = previous_data
					.as_ref()
					.map(|previous| previous.merge(patch))
					.unwrap_or_else(|| patch.clone());
				let records: Vec<Record> = data.iter().map(|server| base.merge(server)).collect();
				cache.commit_update(&params.resource, &records);
			}
			MutationAction::UpdateMany { data: patch, .. } => {
				cache.commit_patch(&params.resource, settled_ids, patch);
			}
			MutationAction::Delete { .. } | MutationAction::DeleteMany { .. } => {
				cache.commit_delete(&params.resource, settled_ids);
			}
		}
	}

	fn notify_success(&self, resource: &str, kind: MutationKind, count: usize) {
		let key = match kind {
			MutationKind::Update => keys::UPDATED,
			MutationKind::Delete => keys::DELETED,
		};
		self.inner.notifications.push(
			Notification::success(key)
				.with_arg("resource", json!(resource))
				.with_arg("smart_count", json!(count))
				.with_auto_hide(self.inner.settings.notifications.auto_hide_ms),
		);
	}

	/// Push the error notification of a rejected provider call
	pub fn notify_error(&self, resource: &str, error: &ProviderError, count: usize) {
		let mut notification = Notification::error(keys::HTTP_ERROR)
			.with_arg("resource", json!(resource))
			.with_arg("smart_count", json!(count))
			.with_arg("message", json!(error.message));
		if let Some(status) = error.status {
			notification = notification.with_arg("status", json!(status));
		}
		self.inner.notifications.push(notification);
	}
}

impl std::fmt::Debug for MutationCoordinator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MutationCoordinator")
			.field("queue", &self.inner.queue)
			.field("settings", &self.inner.settings)
			.finish()
	}
}

/// Run one mutation against the provider, returning the settled ids and any returned records
async fn call_provider(
	provider: Arc<dyn DataProvider>,
	params: MutationParams,
) -> ProviderResult<(Vec<RecordId>, Vec<Record>)> {
	let MutationParams {
		resource,
		action,
		meta,
	} = params;
	match action {
		MutationAction::Update {
			id,
			data,
			previous_data,
		} => {
			let record = provider
				.update(
					&resource,
					UpdateParams {
						id: id.clone(),
						data,
						previous_data,
						meta,
					},
				)
				.await?;
			Ok((vec![id], vec![record]))
		}
		MutationAction::UpdateMany { ids, data } => {
			let ids = provider
				.update_many(&resource, UpdateManyParams { ids, data, meta })
				.await?;
			Ok((ids, Vec::new()))
		}
		MutationAction::Delete { id, previous_data } => {
			let record = provider
				.delete(
					&resource,
					DeleteParams {
						id: id.clone(),
						previous_data,
						meta,
					},
				)
				.await?;
			Ok((vec![id], vec![record]))
		}
		MutationAction::DeleteMany { ids } => {
			let ids = provider
				.delete_many(&resource, DeleteManyParams { ids, meta })
				.await?;
			Ok((ids, Vec::new()))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::InMemoryDataProvider;
	use reinhardt_crud_types::ErrorKind;
	use rstest::{fixture, rstest};

	fn record(value: serde_json::Value) -> Record {
		Record::from_value(value).unwrap()
	}

	#[fixture]
	fn coordinator() -> MutationCoordinator {
		let provider = InMemoryDataProvider::with_records(
			"posts",
			vec![record(json!({ "id": 1, "title": "A" }))],
		);
		MutationCoordinator::new(
			Arc::new(provider),
			RecordCache::new(),
			NotificationChannel::new(16),
			CrudSettings::default(),
		)
	}

	#[rstest]
	#[case(MutationParams::new(" ", MutationAction::DeleteMany { ids: vec![RecordId::from(1)] }))]
	#[case(MutationParams::new("posts", MutationAction::DeleteMany { ids: vec![] }))]
	#[case(MutationParams::new("posts", MutationAction::Delete { id: RecordId::new(""), previous_data: None }))]
	#[case(MutationParams::new(
		"posts",
		MutationAction::UpdateMany { ids: vec![RecordId::from(1), RecordId::new("  ")], data: Record::new() },
	))]
	#[case(MutationParams::new(
		"posts",
		MutationAction::Update { id: RecordId::from(1), data: Record::new(), previous_data: None },
	))]
	#[tokio::test]
	async fn test_invalid_requests_leave_cache_untouched(
		coordinator: MutationCoordinator,
		#[case] params: MutationParams,
	) {
		let before = coordinator.cache().snapshot("posts");

		let err = coordinator
			.execute(params, MutationMode::Optimistic)
			.await
			.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::InvalidMutationRequest);
		assert_eq!(coordinator.cache().snapshot("posts"), before);
		assert!(coordinator.notifications().is_empty());
		assert_eq!(coordinator.pending().pending_count(), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_explicit_previous_data_seeds_cache(coordinator: MutationCoordinator) {
		let ticket = coordinator
			.update(
				"posts",
				RecordId::from(1),
				record(json!({ "title": "B" })),
				Some(record(json!({ "title": "A" }))),
				MutationMode::Optimistic,
			)
			.await
			.unwrap();

		let cached = coordinator
			.cache()
			.get_record("posts", &RecordId::from(1))
			.unwrap();
		assert_eq!(cached.get("title"), Some(&json!("B")));
		assert_eq!(cached.get("id"), Some(&json!("1")));

		let outcome = ticket.settled().await.unwrap();
		assert!(outcome.is_success());
	}

	#[rstest]
	#[tokio::test]
	async fn test_pessimistic_ticket_is_settled(coordinator: MutationCoordinator) {
		let ticket = coordinator
			.delete("posts", RecordId::from(1), None, MutationMode::Pessimistic)
			.await
			.unwrap();

		assert!(!ticket.is_pending());
		assert!(ticket.handle().is_none());
		assert_eq!(ticket.data().len(), 1);
		assert_eq!(
			coordinator.notifications().peek_by_key(keys::DELETED).len(),
			1
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_pessimistic_missing_record_is_provider_failure(coordinator: MutationCoordinator) {
		let err = coordinator
			.delete("posts", RecordId::from(404), None, MutationMode::Pessimistic)
			.await
			.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::ProviderFailure);
		let notifications = coordinator.notifications().peek_by_key(keys::HTTP_ERROR);
		assert_eq!(notifications.len(), 1);
		assert_eq!(notifications[0].arg("status"), Some(&json!(404)));
	}
}
