//! Collaborators shared by every controller

use reinhardt_crud_core::{CrudSettings, MutationCoordinator, NotificationChannel, RecordCache};
use reinhardt_crud_types::DataProvider;
use std::sync::Arc;

/// Data provider, cache, notification channel and coordinator of one admin site
///
/// Controllers receive the context at construction; cloning it shares every
/// collaborator.
///
/// # Examples
///
/// ```
/// use reinhardt_crud_controllers::ControllerContext;
/// use reinhardt_crud_core::{CrudSettings, InMemoryDataProvider};
/// use std::sync::Arc;
///
/// let context = ControllerContext::new(
/// 	Arc::new(InMemoryDataProvider::new()),
/// 	CrudSettings::default(),
/// );
/// assert!(context.notifications.is_empty());
/// ```
#[derive(Clone)]
pub struct ControllerContext {
	pub provider: Arc<dyn DataProvider>,
	pub cache: RecordCache,
	pub notifications: NotificationChannel,
	pub coordinator: MutationCoordinator,
	pub settings: CrudSettings,
}

impl ControllerContext {
	/// Build a context with a fresh cache, notification channel and coordinator
	pub fn new(provider: Arc<dyn DataProvider>, settings: CrudSettings) -> Self {
		let cache = RecordCache::new();
		let notifications = NotificationChannel::new(settings.notifications.capacity);
		let coordinator = MutationCoordinator::new(
			Arc::clone(&provider),
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

	/// Build a context around an existing coordinator
	pub fn from_coordinator(coordinator: MutationCoordinator) -> Self {
		Self {
			provider: Arc::clone(coordinator.provider()),
			cache: coordinator.cache().clone(),
			notifications: coordinator.notifications().clone(),
			settings: coordinator.settings().clone(),
			coordinator,
		}
	}
}

impl std::fmt::Debug for ControllerContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ControllerContext")
			.field("cache", &self.cache)
			.field("notifications", &self.notifications)
			.field("coordinator", &self.coordinator)
			.finish_non_exhaustive()
	}
}
