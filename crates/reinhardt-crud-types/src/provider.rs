//! Data provider contract
//!
//! The data provider is the pluggable backend the controllers talk to. Its
//! wire format is the implementor's business; the controllers only see this trait.

use crate::errors::ProviderResult;
use crate::params::{
	CreateParams, DeleteManyParams, DeleteParams, GetListParams, GetListResult, GetManyParams,
	GetOneParams, UpdateManyParams, UpdateParams,
};
use crate::record::{Record, RecordId};
use async_trait::async_trait;

/// Resource-oriented CRUD backend
///
/// # Examples
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use reinhardt_crud_types::*;
///
/// struct ReadOnlyProvider;
///
/// #[async_trait]
/// impl DataProvider for ReadOnlyProvider {
///     async fn get_list(&self, _resource: &str, _params: GetListParams) -> ProviderResult<GetListResult> {
///         Ok(GetListResult::default())
///     }
///     async fn get_one(&self, resource: &str, params: GetOneParams) -> ProviderResult<Record> {
///         Err(ProviderError::not_found(resource, params.id))
///     }
///     async fn get_many(&self, _resource: &str, _params: GetManyParams) -> ProviderResult<Vec<Record>> {
///         Ok(vec![])
///     }
///     async fn create(&self, _resource: &str, _params: CreateParams) -> ProviderResult<Record> {
///         Err(ProviderError::new("read only").with_status(405))
///     }
///     async fn update(&self, _resource: &str, _params: UpdateParams) -> ProviderResult<Record> {
///         Err(ProviderError::new("read only").with_status(405))
///     }
///     async fn update_many(&self, _resource: &str, _params: UpdateManyParams) -> ProviderResult<Vec<RecordId>> {
///         Err(ProviderError::new("read only").with_status(405))
///     }
///     async fn delete(&self, _resource: &str, _params: DeleteParams) -> ProviderResult<Record> {
///         Err(ProviderError::new("read only").with_status(405))
///     }
///     async fn delete_many(&self, _resource: &str, _params: DeleteManyParams) -> ProviderResult<Vec<RecordId>> {
///         Err(ProviderError::new("read only").with_status(405))
///     }
/// }
/// ```
#[async_trait]
pub trait DataProvider: Send + Sync {
	/// Fetch one page of a resource
	async fn get_list(&self, resource: &str, params: GetListParams)
	-> ProviderResult<GetListResult>;

	/// Fetch a single record
	async fn get_one(&self, resource: &str, params: GetOneParams) -> ProviderResult<Record>;

	/// Fetch several records by id
	async fn get_many(&self, resource: &str, params: GetManyParams) -> ProviderResult<Vec<Record>>;

	/// Create a record, returning it as stored (with its id)
	async fn create(&self, resource: &str, params: CreateParams) -> ProviderResult<Record>;

	/// Update a record, returning it as stored
	async fn update(&self, resource: &str, params: UpdateParams) -> ProviderResult<Record>;

	/// Update several records, returning the updated ids
	async fn update_many(
		&self,
		resource: &str,
		params: UpdateManyParams,
	) -> ProviderResult<Vec<RecordId>>;

	/// Delete a record, returning it as it was
	async fn delete(&self, resource: &str, params: DeleteParams) -> ProviderResult<Record>;

	/// Delete several records, returning the deleted ids
	async fn delete_many(
		&self,
		resource: &str,
		params: DeleteManyParams,
	) -> ProviderResult<Vec<RecordId>>;
}
