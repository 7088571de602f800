//! mockall-based data provider mock

use mockall::mock;
use reinhardt_crud_types::{
	CreateParams, DataProvider, DeleteManyParams, DeleteParams, GetListParams, GetListResult,
	GetManyParams, GetOneParams, ProviderResult, Record, RecordId, UpdateManyParams, UpdateParams,
};

mock! {
	/// Mock implementation of the `DataProvider` trait
	///
	/// # Examples
	///
	/// ```rust
	/// use reinhardt_crud_test::MockDataProvider;
	/// use reinhardt_crud_types::{DataProvider, DeleteParams, Record, RecordId};
	///
	/// #[tokio::main]
	/// async fn main() {
	/// 	let mut mock = MockDataProvider::new();
	///
	/// 	mock.expect_delete()
	/// 		.withf(|_, params| params.id == RecordId::from(1))
	/// 		.times(1)
	/// 		.returning(|_, _| Ok(Record::new()));
	///
	/// 	let params = DeleteParams { id: RecordId::from(1), previous_data: None, meta: None };
	/// 	assert!(mock.delete("posts", params).await.is_ok());
	/// 	// Expectations are verified on drop
	/// }
	/// ```
	pub DataProvider {}

	#[async_trait::async_trait]
	impl DataProvider for DataProvider {
		async fn get_list(&self, resource: &str, params: GetListParams) -> ProviderResult<GetListResult>;
		async fn get_one(&self, resource: &str, params: GetOneParams) -> ProviderResult<Record>;
		async fn get_many(&self, resource: &str, params: GetManyParams) -> ProviderResult<Vec<Record>>;
		async fn create(&self, resource: &str, params: CreateParams) -> ProviderResult<Record>;
		async fn update(&self, resource: &str, params: UpdateParams) -> ProviderResult<Record>;
		async fn update_many(&self, resource: &str, params: UpdateManyParams) -> ProviderResult<Vec<RecordId>>;
		async fn delete(&self, resource: &str, params: DeleteParams) -> ProviderResult<Record>;
		async fn delete_many(&self, resource: &str, params: DeleteManyParams) -> ProviderResult<Vec<RecordId>>;
	}
}

/// Mock provider that rejects every write call
///
/// Reads succeed with empty results. Writes are expected never to happen;
/// any write panics when the mock is called.
pub fn read_only_mock() -> MockDataProvider {
	let mut mock = MockDataProvider::new();
	mock.expect_get_list()
		.returning(|_, _| Ok(GetListResult::default()));
	mock.expect_get_many().returning(|_, _| Ok(Vec::new()));
	mock.expect_update().never();
	mock.expect_update_many().never();
	mock.expect_delete().never();
	mock.expect_delete_many().never();
	mock
}

#[cfg(test)]
mod tests {
	use super::*;
	use reinhardt_crud_types::ProviderError;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_mock_returns_configured_error() {
		let mut mock = MockDataProvider::new();
		mock.expect_update()
			.times(1)
			.returning(|_, _| Err(ProviderError::new("rejected").with_status(422)));

		let err = mock
			.update(
				"posts",
				UpdateParams {
					id: RecordId::from(1),
					data: Record::new(),
					previous_data: None,
					meta: None,
				},
			)
			.await
			.unwrap_err();

		assert_eq!(err.status, Some(422));
	}

	#[rstest]
	#[tokio::test]
	async fn test_read_only_mock_serves_reads() {
		let mock = read_only_mock();

		let result = mock.get_list("posts", GetListParams::default()).await.unwrap();

		assert_eq!(result.total, 0);
	}
}
