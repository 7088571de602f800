//! Mutation execution
//!
//! The same update or delete can run under three modes:
//!
//! - **pessimistic**: call the provider, wait, then write the cache
//! - **optimistic**: write the cache now, call the provider in the background,
//!   roll back on failure
//! - **undoable**: write the cache now, defer the provider call behind the
//!   undo queue's grace period, roll back if undone

pub mod coordinator;
pub mod outcome;

pub use coordinator::MutationCoordinator;
pub use outcome::{MutationOutcome, MutationTicket};
