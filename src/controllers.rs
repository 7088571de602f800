//! View controllers module.
//!
//! # Examples
//!
//! ```rust,no_run
//! # #[cfg(feature = "controllers")]
//! use reinhardt_crud::controllers::{ControllerContext, EditController, ListController};
//! ```

#[cfg(feature = "controllers")]
pub use reinhardt_crud_controllers::*;
