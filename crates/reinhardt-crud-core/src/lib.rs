//! # reinhardt-crud-core
//!
//! Mutation machinery behind the Reinhardt CRUD controllers.
//!
//! ## Features
//!
//! - **Mutation Coordinator**: executes update/delete actions under one of three
//!   strategies (pessimistic, optimistic, undoable) and reconciles the record cache
//! - **Undo Queue**: holds deferred mutations behind a grace period and guarantees
//!   each one is either cancelled or executed, exactly once
//! - **Record Cache**: shared read cache with speculative writes, rollback and
//!   per-record versions so late settlements never clobber newer writes
//! - **Notification Channel**: Django-messages style queue of user-facing notifications
//! - **Pending Tracker**: observable "is this record being mutated" state
//!
//! ## Example
//!
//! ```rust,no_run
//! use reinhardt_crud_core::prelude::*;
//! use reinhardt_crud_types::{MutationMode, Record, RecordId};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> reinhardt_crud_types::ControllerResult<()> {
//! let provider = Arc::new(InMemoryDataProvider::new());
//! provider.insert("posts", Record::from_value(json!({ "id": 1, "title": "A" })).unwrap());
//!
//! let coordinator = MutationCoordinator::new(
//! 	provider,
//! 	RecordCache::new(),
//! 	NotificationChannel::new(64),
//! 	CrudSettings::default(),
//! );
//!
//! // Returns immediately; the provider call happens once the grace period elapses
//! let ticket = coordinator
//! 	.delete("posts", RecordId::from(1), None, MutationMode::Undoable)
//! 	.await?;
//!
//! // Changed our mind
//! if let Some(handle) = ticket.handle() {
//! 	coordinator.undo(handle);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod callback;
pub mod memory;
pub mod mutation;
pub mod notifications;
pub mod pending;
pub mod settings;
pub mod timer;
pub mod undo;

pub use cache::{RecordCache, ResourceSnapshot, Speculation};
pub use callback::LatestCallback;
pub use memory::InMemoryDataProvider;
pub use mutation::{MutationCoordinator, MutationOutcome, MutationTicket};
pub use notifications::{Level, MemoryStorage, Notification, NotificationChannel, NotificationStorage};
pub use pending::PendingTracker;
pub use settings::{CrudSettings, SettingsError};
pub use timer::CancellableTimer;
pub use undo::{
	CallTimeInfo, ConflictPolicy, EntryHandle, EntryState, PendingMutation, Settlement, StreamKey,
	TakenMutation, UndoQueue, UndoStreamScope,
};

/// Re-export commonly used types
pub mod prelude {
	pub use crate::cache::*;
	pub use crate::callback::*;
	pub use crate::memory::*;
	pub use crate::mutation::*;
	pub use crate::notifications::*;
	pub use crate::pending::*;
	pub use crate::settings::*;
	pub use crate::timer::*;
	pub use crate::undo::*;
}
