//! Pending mutation tracker

use futures_signals::signal::{Mutable, Signal, SignalExt};
use reinhardt_crud_types::RecordId;
use std::collections::BTreeMap;

/// Observable set of records with an in-flight mutation
///
/// A record can be the target of several mutations at once, so marks are
/// counted.
///
/// # Examples
///
/// ```
/// use reinhardt_crud_core::PendingTracker;
/// use reinhardt_crud_types::RecordId;
///
/// let tracker = PendingTracker::new();
/// let id = RecordId::from(1);
///
/// tracker.mark("posts", &[id.clone()]);
/// tracker.mark("posts", &[id.clone()]);
/// tracker.unmark("posts", &[id.clone()]);
/// assert!(tracker.is_pending("posts", &id));
///
/// tracker.unmark("posts", &[id.clone()]);
/// assert!(!tracker.is_pending("posts", &id));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PendingTracker {
	marks: Mutable<BTreeMap<(String, RecordId), usize>>,
}

impl PendingTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mark(&self, resource: &str, ids: &[RecordId]) {
		let mut marks = self.marks.lock_mut();
		for id in ids {
			*marks.entry((resource.to_string(), id.clone())).or_insert(0) += 1;
		}
	}

	pub fn unmark(&self, resource: &str, ids: &[RecordId]) {
		let mut marks = self.marks.lock_mut();
		for id in ids {
			let key = (resource.to_string(), id.clone());
			if let Some(count) = marks.get_mut(&key) {
				*count -= 1;
				if *count == 0 {
					marks.remove(&key);
				}
			}
		}
	}

	pub fn is_pending(&self, resource: &str, id: &RecordId) -> bool {
		self.marks
			.lock_ref()
			.contains_key(&(resource.to_string(), id.clone()))
	}

	/// Number of records with at least one in-flight mutation
	pub fn pending_count(&self) -> usize {
		self.marks.lock_ref().len()
	}

	/// Signal of whether a record has an in-flight mutation
	pub fn pending_signal(&self, resource: &str, id: &RecordId) -> impl Signal<Item = bool> + use<> {
		let key = (resource.to_string(), id.clone());
		self.marks
			.signal_ref(move |marks| marks.contains_key(&key))
			.dedupe()
	}
}
