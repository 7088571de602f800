//! Mutation machinery module.
//!
//! This module provides the undo queue, the mutation coordinator, the record
//! cache, the notification channel and the settings.
//!
//! # Examples
//!
//! ```rust,no_run
//! use reinhardt_crud::core::{CrudSettings, MutationCoordinator, UndoQueue};
//! ```

pub use reinhardt_crud_core::*;
