//! # reinhardt-crud-controllers
//!
//! Controllers binding CRUD views to a data provider.
//!
//! Each controller exposes its view state as `futures-signals` mutables and
//! receives its collaborators through a [`ControllerContext`]:
//!
//! - **ListController**: pagination, sort, filters, selection and bulk delete
//! - **ShowController**: one record, cached while it loads
//! - **EditController**: load and save one record under any mutation mode
//! - **CreateController**: create records and drop stale list caches
//! - **DeleteController**: single and bulk deletes with undo
//!
//! ## Example
//!
//! ```rust,no_run
//! use reinhardt_crud_controllers::{ControllerContext, ListController};
//! use reinhardt_crud_core::{CrudSettings, InMemoryDataProvider};
//! use reinhardt_crud_types::MutationMode;
//! use std::sync::Arc;
//!
//! # async fn example() -> reinhardt_crud_types::ControllerResult<()> {
//! let context = ControllerContext::new(Arc::new(InMemoryDataProvider::new()), CrudSettings::default());
//! let list = ListController::new(context, "posts");
//!
//! list.load().await?;
//! list.select_all();
//! let ticket = list.delete_selected(MutationMode::Undoable).await?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod create;
pub mod delete;
pub mod edit;
pub mod list;
pub mod show;

pub use context::ControllerContext;
pub use create::CreateController;
pub use delete::DeleteController;
pub use edit::EditController;
pub use list::{ListController, ListParams};
pub use show::ShowController;

/// Re-export commonly used types
pub mod prelude {
	pub use crate::context::*;
	pub use crate::create::*;
	pub use crate::delete::*;
	pub use crate::edit::*;
	pub use crate::list::*;
	pub use crate::show::*;
}
