//! rstest fixtures
//!
//! Note: doctests cannot use rstest fixtures directly. See the integration
//! tests of `reinhardt-crud-core` and `reinhardt-crud-controllers` for usage.

use crate::recording::RecordingDataProvider;
use reinhardt_crud_core::{CrudSettings, MutationCoordinator, NotificationChannel, RecordCache};
use reinhardt_crud_types::{DataProvider, Record, RecordId};
use rstest::fixture;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

pub const POSTS: &str = "posts";

/// Build a record from a JSON object
///
/// # Panics
///
/// Panics if `value` is not a JSON object.
pub fn record(value: Value) -> Record {
	match Record::from_value(value) {
		Some(record) => record,
		None => panic!("record fixtures must be JSON objects"),
	}
}

/// Five posts with ids 1 to 5
#[fixture]
pub fn posts() -> Vec<Record> {
	(1..=5)
		.map(|id| {
			record(json!({
				"id": id,
				"title": format!("Post {}", id),
				"status": if id % 2 == 0 { "draft" } else { "published" },
				"views": id * 10,
			}))
		})
		.collect()
}

/// Recording provider over an in-memory store seeded with [`posts`]
#[fixture]
pub fn recording_provider(posts: Vec<Record>) -> Arc<RecordingDataProvider> {
	Arc::new(RecordingDataProvider::with_records(POSTS, posts))
}

/// Default settings
#[fixture]
pub fn crud_settings() -> CrudSettings {
	CrudSettings::default()
}

/// Coordinator wired to a recording provider, with handles to every collaborator
#[derive(Debug, Clone)]
pub struct CrudHarness {
	pub provider: Arc<RecordingDataProvider>,
	pub cache: RecordCache,
	pub notifications: NotificationChannel,
	pub coordinator: MutationCoordinator,
	pub settings: CrudSettings,
}

impl CrudHarness {
	pub fn new(provider: Arc<RecordingDataProvider>, settings: CrudSettings) -> Self {
		let cache = RecordCache::new();
		let notifications = NotificationChannel::new(settings.notifications.capacity);
		let dyn_provider: Arc<dyn DataProvider> = provider.clone();
		let coordinator = MutationCoordinator::new(
			dyn_provider,
			cache.clone(),
			notifications.clone(),
			settings.clone(),
		);
		Self {
			provider,
			cache,
			notifications,
			coordinator,
			settings,
		}
	}

	/// Harness whose cache already holds every record of the provider
	pub fn warmed(provider: Arc<RecordingDataProvider>, settings: CrudSettings, records: &[Record]) -> Self {
		let harness = Self::new(provider, settings);
		for record in records {
			harness.cache.put_record(POSTS, record.clone());
		}
		harness
	}

	pub fn grace_period(&self) -> Duration {
		self.settings.grace_period()
	}

	/// Cached post, if present and not deleted
	pub fn cached_post(&self, id: i64) -> Option<Record> {
		self.cache.get_record(POSTS, &RecordId::from(id))
	}

	/// Number of stored notifications with `message_key`
	pub fn notification_count(&self, message_key: &str) -> usize {
		self.notifications.peek_by_key(message_key).len()
	}
}

/// Harness with a warmed cache and default settings
#[fixture]
pub fn crud_harness(posts: Vec<Record>) -> CrudHarness {
	let provider = Arc::new(RecordingDataProvider::with_records(POSTS, posts.clone()));
	CrudHarness::warmed(provider, CrudSettings::default(), &posts)
}
