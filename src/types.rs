//! Shared types module.
//!
//! This module provides records, identifiers, mutation modes, the data
//! provider contract and the error types.
//!
//! # Examples
//!
//! ```rust,no_run
//! use reinhardt_crud::types::{DataProvider, MutationMode, Record, RecordId};
//! ```

pub use reinhardt_crud_types::*;
