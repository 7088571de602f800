//! Cancellable one-shot timer
//!
//! A timer runs its callback once after a delay unless it is disposed first.
//! Once the delay has elapsed the callback runs to completion; disposing the
//! timer afterwards has no effect on it.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

/// One-shot timer backed by a spawned tokio task
///
/// Dropping the timer disposes it.
///
/// # Examples
///
/// ```
/// use reinhardt_crud_core::CancellableTimer;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let timer = CancellableTimer::start(Duration::from_secs(60), || async {
/// 	println!("never printed");
/// });
///
/// assert!(timer.dispose());
/// assert!(!timer.dispose());
/// assert!(!timer.is_fired());
/// # }
/// ```
#[derive(Debug)]
pub struct CancellableTimer {
	cancel_tx: Mutex<Option<oneshot::Sender<()>>>,
	fired: Arc<AtomicBool>,
	disposed: AtomicBool,
	duration: Duration,
}

impl CancellableTimer {
	/// Start a timer running `callback` after `duration`
	///
	/// Must be called from within a tokio runtime.
	pub fn start<F, Fut>(duration: Duration, callback: F) -> Self
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
		let fired = Arc::new(AtomicBool::new(false));
		let task_fired = Arc::clone(&fired);

		tokio::spawn(async move {
			tokio::select! {
				_ = tokio::time::sleep(duration) => {
					task_fired.store(true, Ordering::SeqCst);
					callback().await;
				}
				// Resolves on dispose and when the sender is dropped
				_ = cancel_rx => {}
			}
		});

		Self {
			cancel_tx: Mutex::new(Some(cancel_tx)),
			fired,
			disposed: AtomicBool::new(false),
			duration,
		}
	}

	/// Stop the timer
	///
	/// Returns `true` only for the call that disposed the timer. Disposing a
	/// timer whose callback already started does not interrupt the callback.
	pub fn dispose(&self) -> bool {
		if self.disposed.swap(true, Ordering::SeqCst) {
			return false;
		}
		if let Some(tx) = self.cancel_tx.lock().take() {
			let _ = tx.send(());
		}
		true
	}

	/// Whether the delay elapsed and the callback was started
	pub fn is_fired(&self) -> bool {
		self.fired.load(Ordering::SeqCst)
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::SeqCst)
	}

	pub fn duration(&self) -> Duration {
		self.duration
	}
}

impl Drop for CancellableTimer {
	fn drop(&mut self) {
		self.dispose();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::AtomicUsize;

	fn counting_timer(duration: Duration) -> (CancellableTimer, Arc<AtomicUsize>) {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		let timer = CancellableTimer::start(duration, move || async move {
			counter.fetch_add(1, Ordering::SeqCst);
		});
		(timer, calls)
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_timer_fires_once_after_duration() {
		let (timer, calls) = counting_timer(Duration::from_millis(500));

		tokio::time::sleep(Duration::from_millis(499)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 0);
		assert!(!timer.is_fired());

		tokio::time::sleep(Duration::from_millis(2)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(timer.is_fired());

		tokio::time::sleep(Duration::from_secs(10)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_disposed_timer_never_fires() {
		let (timer, calls) = counting_timer(Duration::from_millis(500));

		tokio::time::sleep(Duration::from_millis(100)).await;
		assert!(timer.dispose());
		assert!(timer.is_disposed());

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 0);
		assert!(!timer.is_fired());
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_dropping_timer_disposes_it() {
		let (timer, calls) = counting_timer(Duration::from_millis(50));

		drop(timer);
		tokio::time::sleep(Duration::from_secs(1)).await;

		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_dispose_is_idempotent() {
		let (timer, _calls) = counting_timer(Duration::from_millis(50));

		assert!(timer.dispose());
		assert!(!timer.dispose());
		assert!(!timer.dispose());
	}
}
