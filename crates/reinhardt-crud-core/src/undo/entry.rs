//! Undo queue entries and their identifiers

use crate::mutation::MutationOutcome;
use futures::future::BoxFuture;
use reinhardt_crud_types::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Token identifying a pending mutation in the undo queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryHandle(Uuid);

impl EntryHandle {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}

	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl Default for EntryHandle {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for EntryHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Lifecycle of an undo queue entry
///
/// `Queued -> Cancelled` or `Queued -> Executing -> Committed`. Terminal
/// states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EntryState {
	Queued = 0,
	Cancelled = 1,
	Executing = 2,
	Committed = 3,
}

impl EntryState {
	pub(crate) fn from_u8(value: u8) -> Self {
		match value {
			0 => EntryState::Queued,
			1 => EntryState::Cancelled,
			2 => EntryState::Executing,
			_ => EntryState::Committed,
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, EntryState::Cancelled | EntryState::Committed)
	}
}

/// Why a deferred mutation is being executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallTimeInfo {
	/// The grace period elapsed
	Expired,
	/// Executed early through `take`/`commit`/`flush`
	Committed,
	/// Displaced by a newer mutation in the same stream
	ForceSettled,
	/// The queue was disposed
	Disposed,
}

impl CallTimeInfo {
	pub fn as_str(&self) -> &'static str {
		match self {
			CallTimeInfo::Expired => "expired",
			CallTimeInfo::Committed => "committed",
			CallTimeInfo::ForceSettled => "force_settled",
			CallTimeInfo::Disposed => "disposed",
		}
	}
}

impl fmt::Display for CallTimeInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Logical action stream; the queue keeps at most one live entry per stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamKey(String);

impl StreamKey {
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	/// Single stream shared by every mutation
	pub fn global() -> Self {
		Self("*".to_string())
	}

	pub fn resource(resource: &str) -> Self {
		Self(resource.to_string())
	}

	/// Stream of one resource and one set of records, independent of id order
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_crud_core::StreamKey;
	/// use reinhardt_crud_types::RecordId;
	///
	/// let a = StreamKey::records("posts", &[RecordId::from(2), RecordId::from(1)]);
	/// let b = StreamKey::records("posts", &[RecordId::from(1), RecordId::from(2)]);
	/// assert_eq!(a, b);
	/// assert_eq!(a.as_str(), "posts:1,2");
	/// ```
	pub fn records(resource: &str, ids: &[RecordId]) -> Self {
		let mut ids: Vec<&str> = ids.iter().map(RecordId::as_str).collect();
		ids.sort_unstable();
		ids.dedup();
		Self(format!("{}:{}", resource, ids.join(",")))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for StreamKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// What happens when a mutation is enqueued into a stream that already has a live entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
	/// Execute the live entry now and accept the new one once it settled
	#[default]
	ForceSettle,
	/// Refuse the new entry with `QueueConflict`
	Reject,
}

/// Granularity of undo streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoStreamScope {
	Global,
	Resource,
	#[default]
	Record,
}

impl UndoStreamScope {
	pub fn key(&self, resource: &str, ids: &[RecordId]) -> StreamKey {
		match self {
			UndoStreamScope::Global => StreamKey::global(),
			UndoStreamScope::Resource => StreamKey::resource(resource),
			UndoStreamScope::Record => StreamKey::records(resource, ids),
		}
	}
}

pub type MutationFn = Box<dyn FnOnce(CallTimeInfo) -> BoxFuture<'static, MutationOutcome> + Send>;
pub type SettleFn = Box<dyn FnOnce(&MutationOutcome, CallTimeInfo) + Send>;
pub type CancelFn = Box<dyn FnOnce() + Send>;

/// A deferred side effect waiting in the undo queue
///
/// # Examples
///
/// ```
/// use futures::FutureExt;
/// use reinhardt_crud_core::{MutationOutcome, PendingMutation};
/// use reinhardt_crud_types::RecordId;
///
/// let pending = PendingMutation::new("posts", vec![RecordId::from(1)], |_info| {
/// 	async { MutationOutcome::Succeeded { ids: vec![RecordId::from(1)], data: vec![] } }.boxed()
/// })
/// .on_cancel(|| println!("undone"));
///
/// assert_eq!(pending.stream.as_str(), "posts:1");
/// ```
pub struct PendingMutation {
	pub handle: EntryHandle,
	pub resource: String,
	pub ids: Vec<RecordId>,
	pub stream: StreamKey,
	pub(crate) mutation_fn: MutationFn,
	pub(crate) on_settle: Option<SettleFn>,
	pub(crate) on_cancel: Option<CancelFn>,
}

impl PendingMutation {
	/// Create a pending mutation in the per-record stream of `ids`
	pub fn new<F>(resource: impl Into<String>, ids: Vec<RecordId>, mutation_fn: F) -> Self
	where
		F: FnOnce(CallTimeInfo) -> BoxFuture<'static, MutationOutcome> + Send + 'static,
	{
		let resource = resource.into();
		let stream = StreamKey::records(&resource, &ids);
		Self {
			handle: EntryHandle::new(),
			resource,
			ids,
			stream,
			mutation_fn: Box::new(mutation_fn),
			on_settle: None,
			on_cancel: None,
		}
	}

	pub fn with_handle(mut self, handle: EntryHandle) -> Self {
		self.handle = handle;
		self
	}

	pub fn with_stream(mut self, stream: StreamKey) -> Self {
		self.stream = stream;
		self
	}

	/// Called once the mutation executed, with its outcome
	pub fn on_settle<F>(mut self, f: F) -> Self
	where
		F: FnOnce(&MutationOutcome, CallTimeInfo) + Send + 'static,
	{
		self.on_settle = Some(Box::new(f));
		self
	}

	/// Called if the mutation is cancelled before executing
	pub fn on_cancel<F>(mut self, f: F) -> Self
	where
		F: FnOnce() + Send + 'static,
	{
		self.on_cancel = Some(Box::new(f));
		self
	}
}

impl fmt::Debug for PendingMutation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PendingMutation")
			.field("handle", &self.handle)
			.field("resource", &self.resource)
			.field("ids", &self.ids)
			.field("stream", &self.stream)
			.field("on_settle", &self.on_settle.is_some())
			.field("on_cancel", &self.on_cancel.is_some())
			.finish()
	}
}

/// Final state of an entry
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
	pub handle: EntryHandle,
	pub state: EntryState,
	pub outcome: MutationOutcome,
	/// `None` for cancelled entries
	pub info: Option<CallTimeInfo>,
}
