//! Mutation outcomes and settlement tickets

use crate::undo::EntryHandle;
use reinhardt_crud_types::{ControllerError, MutationMode, Record, RecordId};
use tokio::sync::watch;

/// Final result of a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
	/// The provider accepted the mutation
	Succeeded {
		ids: Vec<RecordId>,
		/// Records returned by the provider (empty for bulk actions)
		data: Vec<Record>,
	},
	Failed(ControllerError),
	/// Undone before the provider was called
	Cancelled,
}

impl MutationOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, MutationOutcome::Succeeded { .. })
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, MutationOutcome::Cancelled)
	}

	pub fn error(&self) -> Option<&ControllerError> {
		match self {
			MutationOutcome::Failed(err) => Some(err),
			_ => None,
		}
	}

	pub fn data(&self) -> &[Record] {
		match self {
			MutationOutcome::Succeeded { data, .. } => data,
			_ => &[],
		}
	}
}

/// Result of submitting a mutation to the coordinator
///
/// Pessimistic tickets are already settled. Optimistic and undoable tickets
/// are pending until the provider answered or the mutation was undone.
#[derive(Debug, Clone)]
pub struct MutationTicket {
	pub mode: MutationMode,
	pub resource: String,
	pub ids: Vec<RecordId>,
	handle: Option<EntryHandle>,
	outcome: watch::Receiver<Option<MutationOutcome>>,
}

impl MutationTicket {
	pub(crate) fn new(
		mode: MutationMode,
		resource: impl Into<String>,
		ids: Vec<RecordId>,
		handle: Option<EntryHandle>,
		outcome: watch::Receiver<Option<MutationOutcome>>,
	) -> Self {
		Self {
			mode,
			resource: resource.into(),
			ids,
			handle,
			outcome,
		}
	}

	/// Undo handle (undoable mode only)
	pub fn handle(&self) -> Option<EntryHandle> {
		self.handle
	}

	pub fn is_pending(&self) -> bool {
		self.outcome.borrow().is_none()
	}

	/// Outcome, if already settled
	pub fn outcome(&self) -> Option<MutationOutcome> {
		(*self.outcome.borrow()).clone()
	}

	/// Data returned by the provider, if already settled successfully
	pub fn data(&self) -> Vec<Record> {
		self.outcome()
			.map(|outcome| outcome.data().to_vec())
			.unwrap_or_default()
	}

	/// Wait for the mutation to settle
	///
	/// Returns `None` if the mutation was dropped without settling.
	pub async fn settled(&self) -> Option<MutationOutcome> {
		let mut rx = self.outcome.clone();
		rx.wait_for(Option::is_some).await.ok().and_then(|o| (*o).clone())
	}
}
