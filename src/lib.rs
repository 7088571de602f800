//! # Reinhardt CRUD
//!
//! Controller layer for CRUD admin views: list, show, edit, create and delete
//! controllers bound to a pluggable data provider, with pessimistic,
//! optimistic and undoable mutations.
//!
//! ## Mutation Modes
//!
//! - `pessimistic` - call the data provider, wait, then update the cache
//! - `optimistic` - update the cache at once and roll it back if the provider fails
//! - `undoable` (default) - update the cache at once and defer the provider call
//!   behind a grace period during which the user can undo
//!
//! Whatever the mode, the cache, the pending state and the notifications
//! end up consistent, and a deferred mutation is either cancelled or
//! executed, exactly once.
//!
//! ## Feature Flags
//!
//! - `minimal` - Types and mutation machinery only
//! - `controllers` - View controllers
//! - `test` - Recording provider, `mockall` mock and `rstest` fixtures
//! - `full` (default) - All of the above
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use reinhardt_crud::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> ControllerResult<()> {
//! let provider = Arc::new(InMemoryDataProvider::new());
//! provider.insert("posts", Record::from_value(json!({ "id": 1, "title": "Hello" })).unwrap());
//!
//! let context = ControllerContext::new(provider, CrudSettings::default());
//! let coordinator = context.coordinator.clone();
//! let edit = EditController::new(context, "posts", RecordId::from(1));
//! edit.load().await?;
//!
//! let patch = Record::from_value(json!({ "title": "Hello, world" })).unwrap();
//! let ticket = edit.save(patch, MutationMode::Undoable).await?;
//!
//! // The form already shows the new title; undo within the grace period
//! if let Some(handle) = ticket.handle() {
//! 	coordinator.undo(handle);
//! }
//! # Ok(())
//! # }
//! ```

pub mod controllers;
pub mod core;
#[cfg(feature = "test")]
pub mod test;
pub mod types;

pub use reinhardt_crud_core::{
	CrudSettings, InMemoryDataProvider, MutationCoordinator, MutationOutcome, MutationTicket,
	Notification, NotificationChannel, RecordCache, UndoQueue,
};
pub use reinhardt_crud_types::{
	ControllerError, ControllerResult, DataProvider, MutationMode, ProviderError, Record,
	RecordId,
};

#[cfg(feature = "controllers")]
pub use reinhardt_crud_controllers::{
	ControllerContext, CreateController, DeleteController, EditController, ListController,
	ShowController,
};

/// Re-export commonly used types
pub mod prelude {
	pub use reinhardt_crud_core::prelude::*;
	pub use reinhardt_crud_types::*;

	#[cfg(feature = "controllers")]
	pub use reinhardt_crud_controllers::prelude::*;
}
