//! Latest-callback cell
//!
//! Deferred settlements can outlive the handler that was current when the
//! mutation started. Code that must call "whatever handler is current now"
//! keeps a [`LatestCallback`] and hands out its trampoline.

use parking_lot::Mutex;
use std::sync::Arc;

type Handler<A> = Arc<dyn Fn(A) + Send + Sync + 'static>;

/// Single-slot holder of the latest callback
///
/// # Examples
///
/// ```
/// use reinhardt_crud_core::LatestCallback;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let seen = Arc::new(AtomicUsize::new(0));
/// let cell = LatestCallback::new();
/// let trampoline = cell.trampoline();
///
/// let first = Arc::clone(&seen);
/// cell.set(move |n: usize| first.store(n, Ordering::SeqCst));
/// let second = Arc::clone(&seen);
/// cell.set(move |n: usize| second.store(n * 10, Ordering::SeqCst));
///
/// // Handed out before either `set`, yet calls the newest handler
/// trampoline(2);
/// assert_eq!(seen.load(Ordering::SeqCst), 20);
/// ```
pub struct LatestCallback<A> {
	slot: Arc<Mutex<Option<Handler<A>>>>,
}

impl<A: 'static> LatestCallback<A> {
	pub fn new() -> Self {
		Self {
			slot: Arc::new(Mutex::new(None)),
		}
	}

	/// Replace the current callback
	pub fn set<F>(&self, callback: F)
	where
		F: Fn(A) + Send + Sync + 'static,
	{
		*self.slot.lock() = Some(Arc::new(callback));
	}

	pub fn clear(&self) {
		*self.slot.lock() = None;
	}

	pub fn is_set(&self) -> bool {
		self.slot.lock().is_some()
	}

	/// Call the current callback, returning whether one was set
	pub fn call(&self, arg: A) -> bool {
		dispatch(&self.slot, arg)
	}

	/// Stable function that always dispatches to the current callback
	pub fn trampoline(&self) -> Arc<dyn Fn(A) + Send + Sync + 'static> {
		let slot = Arc::clone(&self.slot);
		Arc::new(move |arg: A| {
			dispatch(&slot, arg);
		})
	}
}

fn dispatch<A>(slot: &Mutex<Option<Handler<A>>>, arg: A) -> bool {
	// Released before calling, so the callback may replace itself
	let current = slot.lock().clone();
	match current {
		Some(callback) => {
			callback(arg);
			true
		}
		None => false,
	}
}

impl<A: 'static> Default for LatestCallback<A> {
	fn default() -> Self {
		Self::new()
	}
}

impl<A> Clone for LatestCallback<A> {
	fn clone(&self) -> Self {
		Self {
			slot: Arc::clone(&self.slot),
		}
	}
}

impl<A> std::fmt::Debug for LatestCallback<A> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LatestCallback")
			.field("is_set", &self.slot.lock().is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[rstest]
	fn test_call_without_callback_returns_false() {
		let cell: LatestCallback<u32> = LatestCallback::new();

		assert!(!cell.call(1));
		cell.trampoline()(1);
	}

	#[rstest]
	fn test_callback_may_replace_itself() {
		let calls = Arc::new(AtomicUsize::new(0));
		let cell: LatestCallback<()> = LatestCallback::new();

		let inner = cell.clone();
		let counter = Arc::clone(&calls);
		cell.set(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
			inner.clear();
		});

		assert!(cell.call(()));
		assert!(!cell.call(()));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
