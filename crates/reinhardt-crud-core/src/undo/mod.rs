//! Undo queue
//!
//! Holds deferred mutations behind a grace period. An entry is either
//! cancelled (the user clicked "undo") or executed, never both and never twice.

pub mod entry;
pub mod queue;

pub use entry::{
	CallTimeInfo, CancelFn, ConflictPolicy, EntryHandle, EntryState, MutationFn, PendingMutation,
	SettleFn, Settlement, StreamKey, UndoStreamScope,
};
pub use queue::{TakenMutation, UndoQueue};
