//! Undo queue
//!
//! Each live entry sits behind a [`CancellableTimer`]. Whoever moves the
//! entry out of `Queued` first wins: `cancel` moves it to `Cancelled`, while
//! `take` (called by the timer, by `commit`, by `flush` or by a newer entry
//! of the same stream) moves it to `Executing`. The transition is a single
//! compare-and-swap, so the deferred mutation runs at most once, and every
//! path that wins `Executing` runs it, so it runs exactly once unless it was
//! cancelled. Dropping the last queue handle executes the entries still
//! queued with [`CallTimeInfo::Disposed`].

use super::entry::{
	CallTimeInfo, ConflictPolicy, EntryHandle, EntryState, PendingMutation, Settlement, StreamKey,
};
use crate::mutation::MutationOutcome;
use crate::timer::CancellableTimer;
use parking_lot::Mutex;
use reinhardt_crud_types::{ControllerError, ControllerResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;

struct Entry {
	handle: EntryHandle,
	stream: StreamKey,
	state: AtomicU8,
	/// Set once the entry owns its stream and its grace period runs
	armed: AtomicBool,
	pending: Mutex<Option<PendingMutation>>,
	timer: Mutex<Option<CancellableTimer>>,
	settlement: watch::Sender<Option<Settlement>>,
}

impl Entry {
	fn new(pending: PendingMutation) -> Arc<Self> {
		let (settlement, _) = watch::channel(None);
		Arc::new(Self {
			handle: pending.handle,
			stream: pending.stream.clone(),
			state: AtomicU8::new(EntryState::Queued as u8),
			armed: AtomicBool::new(false),
			pending: Mutex::new(Some(pending)),
			timer: Mutex::new(None),
			settlement,
		})
	}

	fn state(&self) -> EntryState {
		EntryState::from_u8(self.state.load(Ordering::SeqCst))
	}

	fn transition(&self, from: EntryState, to: EntryState) -> bool {
		self.state
			.compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
			.is_ok()
	}

	fn dispose_timer(&self) {
		if let Some(timer) = self.timer.lock().as_ref() {
			timer.dispose();
		}
	}

	async fn wait_settled(&self) -> Option<Settlement> {
		let mut rx = self.settlement.subscribe();
		rx.wait_for(Option::is_some).await.ok().and_then(|s| (*s).clone())
	}
}

#[derive(Default)]
struct QueueState {
	entries: HashMap<EntryHandle, Arc<Entry>>,
	streams: HashMap<StreamKey, EntryHandle>,
}

struct QueueInner {
	state: Mutex<QueueState>,
	policy: ConflictPolicy,
	disposed: AtomicBool,
}

impl QueueInner {
	fn entry(&self, handle: EntryHandle) -> Option<Arc<Entry>> {
		self.state.lock().entries.get(&handle).cloned()
	}

	fn remove(&self, entry: &Entry) {
		let mut state = self.state.lock();
		state.entries.remove(&entry.handle);
		if state.streams.get(&entry.stream) == Some(&entry.handle) {
			state.streams.remove(&entry.stream);
		}
	}
}

impl Drop for QueueInner {
	fn drop(&mut self) {
		let state = std::mem::take(self.state.get_mut());
		for entry in state.entries.into_values() {
			if !entry.transition(EntryState::Queued, EntryState::Executing) {
				continue;
			}
			entry.dispose_timer();
			let pending = entry.pending.lock().take();
			match tokio::runtime::Handle::try_current() {
				Ok(runtime) => {
					tracing::debug!(handle = %entry.handle, "Executing mutation of a dropped undo queue");
					runtime.spawn(run(Weak::new(), entry, pending, CallTimeInfo::Disposed));
				}
				Err(_) => {
					tracing::error!(
						handle = %entry.handle,
						"Undo queue dropped outside a runtime; queued mutation will never execute"
					);
				}
			}
		}
	}
}

/// Queue of deferred, cancellable mutations
///
/// Cloning the queue yields another handle to the same entries.
///
/// # Examples
///
/// ```
/// use futures::FutureExt;
/// use reinhardt_crud_core::{EntryState, MutationOutcome, PendingMutation, UndoQueue};
/// use reinhardt_crud_types::RecordId;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let queue = UndoQueue::default();
/// let pending = PendingMutation::new("posts", vec![RecordId::from(1)], |_| {
/// 	async { MutationOutcome::Cancelled }.boxed()
/// });
///
/// let handle = queue.enqueue(pending, Duration::from_secs(5)).await.unwrap();
/// assert_eq!(queue.state(handle), Some(EntryState::Queued));
///
/// assert!(queue.cancel(handle));
/// assert!(!queue.cancel(handle));
/// assert!(!queue.is_live(handle));
/// # }
/// ```
#[derive(Clone)]
pub struct UndoQueue {
	inner: Arc<QueueInner>,
}

impl UndoQueue {
	pub fn new(policy: ConflictPolicy) -> Self {
		Self {
			inner: Arc::new(QueueInner {
				state: Mutex::new(QueueState::default()),
				policy,
				disposed: AtomicBool::new(false),
			}),
		}
	}

	pub fn policy(&self) -> ConflictPolicy {
		self.inner.policy
	}

	/// Register a deferred mutation and start its grace period
	///
	/// If the stream already holds a live entry, the conflict policy decides:
	/// `ForceSettle` executes the live entry and waits for it to settle before
	/// starting this one's grace period, `Reject` fails with `QueueConflict`.
	/// While it waits, the new entry can already be cancelled through its
	/// handle; `enqueue` then returns the handle of the cancelled entry.
	pub async fn enqueue(
		&self,
		pending: PendingMutation,
		grace_period: Duration,
	) -> ControllerResult<EntryHandle> {
		let handle = pending.handle;
		let entry = {
			let mut state = self.inner.state.lock();
			if self.inner.disposed.load(Ordering::SeqCst) {
				return Err(ControllerError::QueueDisposed);
			}
			match Self::live_locked(&state, &pending.stream) {
				None => {
					let entry = Entry::new(pending);
					self.arm_locked(&mut state, &entry, grace_period);
					return Ok(handle);
				}
				Some(prior) if self.inner.policy == ConflictPolicy::Reject => {
					tracing::warn!(
						stream = %pending.stream,
						live = %prior.handle,
						"Rejected mutation: stream already has a live entry"
					);
					return Err(ControllerError::QueueConflict(format!(
						"stream {} already has a pending mutation",
						pending.stream
					)));
				}
				Some(_) => {
					let entry = Entry::new(pending);
					state.entries.insert(handle, Arc::clone(&entry));
					entry
				}
			}
		};

		loop {
			let prior = {
				let mut state = self.inner.state.lock();
				if entry.state() != EntryState::Queued {
					// Cancelled while waiting for the prior entry
					return Ok(handle);
				}
				if self.inner.disposed.load(Ordering::SeqCst) {
					if !entry.transition(EntryState::Queued, EntryState::Cancelled) {
						return Ok(handle);
					}
					state.entries.remove(&handle);
					entry.settlement.send_replace(Some(Settlement {
						handle,
						state: EntryState::Cancelled,
						outcome: MutationOutcome::Cancelled,
						info: None,
					}));
					return Err(ControllerError::QueueDisposed);
				}
				match Self::live_locked(&state, &entry.stream) {
					None => {
						self.arm_locked(&mut state, &entry, grace_period);
						return Ok(handle);
					}
					Some(prior) => prior,
				}
			};

			tracing::info!(
				stream = %entry.stream,
				prior = %prior.handle,
				"Force-settling prior mutation"
			);
			match self.take_entry(prior.clone(), CallTimeInfo::ForceSettled) {
				Some(taken) => {
					taken.execute().await;
				}
				// Executing elsewhere, or cancelled and about to leave the stream
				None => {
					prior.wait_settled().await;
				}
			}
		}
	}

	fn live_locked(state: &QueueState, stream: &StreamKey) -> Option<Arc<Entry>> {
		state
			.streams
			.get(stream)
			.and_then(|handle| state.entries.get(handle))
			.cloned()
	}

	/// Give an entry its stream and start its grace period
	fn arm_locked(&self, state: &mut QueueState, entry: &Arc<Entry>, grace_period: Duration) {
		state.entries.insert(entry.handle, Arc::clone(entry));
		state.streams.insert(entry.stream.clone(), entry.handle);

		let weak: Weak<QueueInner> = Arc::downgrade(&self.inner);
		let handle = entry.handle;
		let timer = CancellableTimer::start(grace_period, move || async move {
			if let Some(inner) = weak.upgrade() {
				let queue = UndoQueue { inner };
				queue.commit(handle, CallTimeInfo::Expired).await;
			}
		});
		*entry.timer.lock() = Some(timer);
		entry.armed.store(true, Ordering::SeqCst);
		tracing::debug!(
			handle = %entry.handle,
			stream = %entry.stream,
			grace_period = ?grace_period,
			"Mutation enqueued"
		);
	}

	/// Cancel a queued entry
	///
	/// Returns `false` if the entry is unknown, already cancelled, or already
	/// taken for execution.
	pub fn cancel(&self, handle: EntryHandle) -> bool {
		let Some(entry) = self.inner.entry(handle) else {
			return false;
		};
		if !entry.transition(EntryState::Queued, EntryState::Cancelled) {
			return false;
		}

		entry.dispose_timer();
		let pending = entry.pending.lock().take();
		self.inner.remove(&entry);
		tracing::debug!(handle = %handle, stream = %entry.stream, "Mutation cancelled");

		if let Some(on_cancel) = pending.and_then(|p| p.on_cancel) {
			on_cancel();
		}
		entry.settlement.send_replace(Some(Settlement {
			handle,
			state: EntryState::Cancelled,
			outcome: MutationOutcome::Cancelled,
			info: None,
		}));
		true
	}

	/// Claim a queued entry for execution
	///
	/// At most one caller can take a given entry, and only once its grace
	/// period started. The returned guard must be executed; dropping it
	/// unexecuted runs the mutation in the background.
	pub fn take(&self, handle: EntryHandle, info: CallTimeInfo) -> Option<TakenMutation> {
		let entry = self.inner.entry(handle)?;
		self.take_entry(entry, info)
	}

	fn take_entry(&self, entry: Arc<Entry>, info: CallTimeInfo) -> Option<TakenMutation> {
		if !entry.armed.load(Ordering::SeqCst) {
			return None;
		}
		if !entry.transition(EntryState::Queued, EntryState::Executing) {
			return None;
		}
		entry.dispose_timer();
		let pending = entry.pending.lock().take();
		tracing::debug!(handle = %entry.handle, info = %info, "Mutation taken");
		Some(TakenMutation {
			queue: Arc::clone(&self.inner),
			entry,
			pending,
			info,
		})
	}

	/// Take and execute an entry now, returning its outcome
	pub async fn commit(&self, handle: EntryHandle, info: CallTimeInfo) -> Option<MutationOutcome> {
		let taken = self.take(handle, info)?;
		Some(taken.execute().await)
	}

	/// Execute every queued entry now
	///
	/// Returns the number of entries this call executed.
	pub async fn flush(&self) -> usize {
		self.flush_with(CallTimeInfo::Committed).await
	}

	async fn flush_with(&self, info: CallTimeInfo) -> usize {
		let handles: Vec<EntryHandle> = self.inner.state.lock().entries.keys().copied().collect();
		let mut executed = 0;
		for handle in handles {
			if self.commit(handle, info).await.is_some() {
				executed += 1;
			}
		}
		if executed > 0 {
			tracing::debug!(executed, info = %info, "Undo queue flushed");
		}
		executed
	}

	/// Execute every queued entry and refuse further enqueues
	pub async fn dispose(&self) -> usize {
		self.inner.disposed.store(true, Ordering::SeqCst);
		let executed = self.flush_with(CallTimeInfo::Disposed).await;
		tracing::debug!(executed, "Undo queue disposed");
		executed
	}

	pub fn is_disposed(&self) -> bool {
		self.inner.disposed.load(Ordering::SeqCst)
	}

	/// State of a live entry; `None` once the entry settled
	pub fn state(&self, handle: EntryHandle) -> Option<EntryState> {
		self.inner.entry(handle).map(|e| e.state())
	}

	pub fn is_live(&self, handle: EntryHandle) -> bool {
		self.state(handle).is_some_and(|s| !s.is_terminal())
	}

	pub fn live_count(&self) -> usize {
		self.inner
			.state
			.lock()
			.entries
			.values()
			.filter(|e| !e.state().is_terminal())
			.count()
	}

	/// Handle of the live entry of a stream
	pub fn live_in_stream(&self, stream: &StreamKey) -> Option<EntryHandle> {
		self.inner.state.lock().streams.get(stream).copied()
	}

	/// Watch the settlement of a live entry
	///
	/// Returns `None` if the entry already settled.
	pub fn subscribe(&self, handle: EntryHandle) -> Option<watch::Receiver<Option<Settlement>>> {
		self.inner.entry(handle).map(|e| e.settlement.subscribe())
	}

	/// Wait until a live entry settles
	pub async fn settled(&self, handle: EntryHandle) -> Option<Settlement> {
		let entry = self.inner.entry(handle)?;
		entry.wait_settled().await
	}
}

impl Default for UndoQueue {
	fn default() -> Self {
		Self::new(ConflictPolicy::default())
	}
}

impl std::fmt::Debug for UndoQueue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("UndoQueue")
			.field("policy", &self.inner.policy)
			.field("live", &self.live_count())
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

/// An entry claimed for execution
pub struct TakenMutation {
	queue: Arc<QueueInner>,
	entry: Arc<Entry>,
	pending: Option<PendingMutation>,
	info: CallTimeInfo,
}

impl TakenMutation {
	pub fn handle(&self) -> EntryHandle {
		self.entry.handle
	}

	pub fn info(&self) -> CallTimeInfo {
		self.info
	}

	/// Run the deferred mutation, mark the entry committed and notify
	pub async fn execute(mut self) -> MutationOutcome {
		let pending = self.pending.take();
		run(
			Arc::downgrade(&self.queue),
			Arc::clone(&self.entry),
			pending,
			self.info,
		)
		.await
	}
}

impl Drop for TakenMutation {
	fn drop(&mut self) {
		let Some(pending) = self.pending.take() else {
			return;
		};
		let queue = Arc::downgrade(&self.queue);
		let entry = Arc::clone(&self.entry);
		let info = self.info;
		match tokio::runtime::Handle::try_current() {
			Ok(runtime) => {
				runtime.spawn(run(queue, entry, Some(pending), info));
			}
			Err(_) => {
				tracing::error!(
					handle = %entry.handle,
					"Taken mutation dropped outside a runtime; it will never execute"
				);
			}
		}
	}
}

async fn run(
	queue: Weak<QueueInner>,
	entry: Arc<Entry>,
	pending: Option<PendingMutation>,
	info: CallTimeInfo,
) -> MutationOutcome {
	let (outcome, on_settle) = match pending {
		Some(pending) => {
			let on_settle = pending.on_settle;
			((pending.mutation_fn)(info).await, on_settle)
		}
		None => (
			MutationOutcome::Failed(ControllerError::invalid("pending mutation already consumed")),
			None,
		),
	};

	entry
		.state
		.store(EntryState::Committed as u8, Ordering::SeqCst);
	if let Some(queue) = queue.upgrade() {
		queue.remove(&entry);
	}
	tracing::debug!(
		handle = %entry.handle,
		info = %info,
		success = outcome.is_success(),
		"Mutation settled"
	);

	if let Some(on_settle) = on_settle {
		on_settle(&outcome, info);
	}
	entry.settlement.send_replace(Some(Settlement {
		handle: entry.handle,
		state: EntryState::Committed,
		outcome: outcome.clone(),
		info: Some(info),
	}));
	outcome
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::FutureExt;
	use reinhardt_crud_types::RecordId;
	use rstest::rstest;
	use std::sync::atomic::AtomicUsize;

	fn counting(id: i64, calls: &Arc<AtomicUsize>) -> PendingMutation {
		let calls = Arc::clone(calls);
		PendingMutation::new("posts", vec![RecordId::from(id)], move |_| {
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				MutationOutcome::Succeeded {
					ids: vec![RecordId::from(id)],
					data: vec![],
				}
			}
			.boxed()
		})
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_entry_executes_after_grace_period() {
		let queue = UndoQueue::default();
		let calls = Arc::new(AtomicUsize::new(0));

		let handle = queue
			.enqueue(counting(1, &calls), Duration::from_millis(1000))
			.await
			.unwrap();
		let mut rx = queue.subscribe(handle).unwrap();

		tokio::time::sleep(Duration::from_millis(999)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 0);
		assert!(queue.is_live(handle));

		tokio::time::sleep(Duration::from_millis(2)).await;
		let settlement = rx.wait_for(Option::is_some).await.unwrap().clone().unwrap();

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(settlement.state, EntryState::Committed);
		assert_eq!(settlement.info, Some(CallTimeInfo::Expired));
		assert_eq!(queue.live_count(), 0);
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_cancel_prevents_execution() {
		let queue = UndoQueue::default();
		let calls = Arc::new(AtomicUsize::new(0));
		let cancelled = Arc::new(AtomicUsize::new(0));
		let on_cancel = Arc::clone(&cancelled);

		let pending = counting(1, &calls).on_cancel(move || {
			on_cancel.fetch_add(1, Ordering::SeqCst);
		});
		let handle = queue
			.enqueue(pending, Duration::from_millis(1000))
			.await
			.unwrap();

		assert!(queue.cancel(handle));
		assert!(!queue.cancel(handle));

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 0);
		assert_eq!(cancelled.load(Ordering::SeqCst), 1);
		assert!(queue.take(handle, CallTimeInfo::Committed).is_none());
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_take_wins_over_cancel() {
		let queue = UndoQueue::default();
		let calls = Arc::new(AtomicUsize::new(0));

		let handle = queue
			.enqueue(counting(1, &calls), Duration::from_millis(1000))
			.await
			.unwrap();

		let taken = queue.take(handle, CallTimeInfo::Committed).unwrap();
		assert_eq!(queue.state(handle), Some(EntryState::Executing));
		assert!(!queue.cancel(handle));
		assert!(queue.take(handle, CallTimeInfo::Committed).is_none());

		let outcome = taken.execute().await;
		assert!(outcome.is_success());
		assert_eq!(calls.load(Ordering::SeqCst), 1);

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_dropped_take_still_executes() {
		let queue = UndoQueue::default();
		let calls = Arc::new(AtomicUsize::new(0));

		let handle = queue
			.enqueue(counting(1, &calls), Duration::from_millis(1000))
			.await
			.unwrap();

		drop(queue.take(handle, CallTimeInfo::Committed));
		tokio::task::yield_now().await;

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(!queue.is_live(handle));
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_flush_executes_every_live_entry() {
		let queue = UndoQueue::default();
		let calls = Arc::new(AtomicUsize::new(0));

		for id in 1..=3 {
			queue
				.enqueue(counting(id, &calls), Duration::from_millis(1000))
				.await
				.unwrap();
		}

		assert_eq!(queue.live_count(), 3);
		assert_eq!(queue.flush().await, 3);
		assert_eq!(queue.flush().await, 0);

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_dispose_rejects_later_enqueues() {
		let queue = UndoQueue::default();
		let calls = Arc::new(AtomicUsize::new(0));

		queue
			.enqueue(counting(1, &calls), Duration::from_millis(1000))
			.await
			.unwrap();

		assert_eq!(queue.dispose().await, 1);
		assert!(queue.is_disposed());

		let err = queue
			.enqueue(counting(2, &calls), Duration::from_millis(1000))
			.await
			.unwrap_err();
		assert_eq!(err, ControllerError::QueueDisposed);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_force_settle_commits_prior_entry_first() {
		let queue = UndoQueue::new(ConflictPolicy::ForceSettle);
		let calls = Arc::new(AtomicUsize::new(0));

		let first = queue
			.enqueue(counting(1, &calls), Duration::from_millis(1000))
			.await
			.unwrap();
		let mut first_rx = queue.subscribe(first).unwrap();

		let second = queue
			.enqueue(counting(1, &calls), Duration::from_millis(1000))
			.await
			.unwrap();

		let settlement = first_rx.borrow().clone().unwrap();
		assert_eq!(settlement.state, EntryState::Committed);
		assert_eq!(settlement.info, Some(CallTimeInfo::ForceSettled));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(queue.is_live(second));
		assert_eq!(queue.live_count(), 1);
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_reject_policy_refuses_second_entry() {
		let queue = UndoQueue::new(ConflictPolicy::Reject);
		let calls = Arc::new(AtomicUsize::new(0));

		let first = queue
			.enqueue(counting(1, &calls), Duration::from_millis(1000))
			.await
			.unwrap();
		let err = queue
			.enqueue(counting(1, &calls), Duration::from_millis(1000))
			.await
			.unwrap_err();

		assert!(matches!(err, ControllerError::QueueConflict(_)));
		assert!(queue.is_live(first));
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_distinct_streams_do_not_conflict() {
		let queue = UndoQueue::new(ConflictPolicy::Reject);
		let calls = Arc::new(AtomicUsize::new(0));

		queue
			.enqueue(counting(1, &calls), Duration::from_millis(1000))
			.await
			.unwrap();
		queue
			.enqueue(counting(2, &calls), Duration::from_millis(1000))
			.await
			.unwrap();

		assert_eq!(queue.live_count(), 2);
	}
}
