//! # reinhardt-crud-types
//!
//! Shared type definitions for the Reinhardt CRUD controller layer.
//!
//! ## Contents
//!
//! - **record**: [`Record`] and [`RecordId`], the dynamic row representation used by
//!   every controller (records are JSON objects, as in the admin panel API)
//! - **mode**: [`MutationMode`], the three mutation strategies
//! - **params**: request/response parameters of the [`DataProvider`] contract
//! - **mutation**: [`MutationParams`] and [`MutationAction`] accepted by the coordinator
//! - **provider**: the [`DataProvider`] trait consumed by the controllers
//! - **errors**: [`ControllerError`], [`ProviderError`] and their result aliases
//!
//! ## Example
//!
//! ```
//! use reinhardt_crud_types::{MutationAction, MutationParams, Record, RecordId};
//! use serde_json::json;
//!
//! let patch = Record::from_value(json!({ "title": "Hello" })).unwrap();
//! let params = MutationParams::new(
//! 	"posts",
//! 	MutationAction::Update {
//! 		id: RecordId::from(1),
//! 		data: patch,
//! 		previous_data: None,
//! 	},
//! );
//! assert_eq!(params.resource, "posts");
//! assert_eq!(params.action.ids(), vec![RecordId::from(1)]);
//! ```

pub mod errors;
pub mod mode;
pub mod mutation;
pub mod params;
pub mod provider;
pub mod record;

pub use errors::{
	ControllerError, ControllerResult, ErrorKind, ParseMutationModeError, ProviderError,
	ProviderResult,
};
pub use mode::MutationMode;
pub use mutation::{MutationAction, MutationKind, MutationParams};
pub use params::{
	CreateParams, DeleteManyParams, DeleteParams, GetListParams, GetListResult, GetManyParams,
	GetOneParams, Pagination, Sort, SortOrder, UpdateManyParams, UpdateParams,
};
pub use provider::DataProvider;
pub use record::{Record, RecordId};
