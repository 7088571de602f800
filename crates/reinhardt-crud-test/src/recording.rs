//! Recording data provider
//!
//! Wraps another provider, records every call and can inject failures and
//! latency per method.

use async_trait::async_trait;
use parking_lot::Mutex;
use reinhardt_crud_core::InMemoryDataProvider;
use reinhardt_crud_types::{
	CreateParams, DataProvider, DeleteManyParams, DeleteParams, GetListParams, GetListResult,
	GetManyParams, GetOneParams, ProviderError, ProviderResult, Record, RecordId,
	UpdateManyParams, UpdateParams,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Data provider method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderMethod {
	GetList,
	GetOne,
	GetMany,
	Create,
	Update,
	UpdateMany,
	Delete,
	DeleteMany,
}

impl ProviderMethod {
	pub fn as_str(&self) -> &'static str {
		match self {
			ProviderMethod::GetList => "get_list",
			ProviderMethod::GetOne => "get_one",
			ProviderMethod::GetMany => "get_many",
			ProviderMethod::Create => "create",
			ProviderMethod::Update => "update",
			ProviderMethod::UpdateMany => "update_many",
			ProviderMethod::Delete => "delete",
			ProviderMethod::DeleteMany => "delete_many",
		}
	}

	/// Whether the method writes data
	pub fn is_write(&self) -> bool {
		!matches!(
			self,
			ProviderMethod::GetList | ProviderMethod::GetOne | ProviderMethod::GetMany
		)
	}
}

impl fmt::Display for ProviderMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One recorded provider call
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCall {
	pub method: ProviderMethod,
	pub resource: String,
	/// Target ids (empty for `get_list` and `create`)
	pub ids: Vec<RecordId>,
	pub at: Instant,
}

#[derive(Debug, Clone)]
struct Failure {
	error: ProviderError,
	/// `None` fails every call
	remaining: Option<usize>,
}

/// Data provider double recording every call
///
/// # Examples
///
/// ```
/// use reinhardt_crud_test::{ProviderMethod, RecordingDataProvider};
/// use reinhardt_crud_types::{DataProvider, DeleteParams, ProviderError, Record, RecordId};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() {
/// let provider = RecordingDataProvider::with_records(
/// 	"posts",
/// 	vec![Record::from_value(json!({ "id": 1 })).unwrap()],
/// );
/// provider.fail_next(ProviderMethod::Delete, ProviderError::new("Network down"));
///
/// let params = DeleteParams { id: RecordId::from(1), previous_data: None, meta: None };
/// assert!(provider.delete("posts", params.clone()).await.is_err());
/// assert!(provider.delete("posts", params).await.is_ok());
/// assert_eq!(provider.call_count(ProviderMethod::Delete), 2);
/// # }
/// ```
pub struct RecordingDataProvider {
	inner: Arc<dyn DataProvider>,
	calls: Mutex<Vec<ProviderCall>>,
	failures: Mutex<HashMap<ProviderMethod, Failure>>,
	latency: Mutex<Option<Duration>>,
}

impl RecordingDataProvider {
	pub fn new(inner: Arc<dyn DataProvider>) -> Self {
		Self {
			inner,
			calls: Mutex::new(Vec::new()),
			failures: Mutex::new(HashMap::new()),
			latency: Mutex::new(None),
		}
	}

	/// Record calls to an in-memory provider seeded with `records`
	pub fn with_records(resource: &str, records: impl IntoIterator<Item = Record>) -> Self {
		Self::new(Arc::new(InMemoryDataProvider::with_records(resource, records)))
	}

	/// Fail the next call to `method`
	pub fn fail_next(&self, method: ProviderMethod, error: ProviderError) {
		self.failures.lock().insert(
			method,
			Failure {
				error,
				remaining: Some(1),
			},
		);
	}

	/// Fail every call to `method`
	pub fn fail_always(&self, method: ProviderMethod, error: ProviderError) {
		self.failures.lock().insert(
			method,
			Failure {
				error,
				remaining: None,
			},
		);
	}

	pub fn clear_failures(&self) {
		self.failures.lock().clear();
	}

	/// Delay every call by `latency`
	pub fn set_latency(&self, latency: Duration) {
		*self.latency.lock() = Some(latency);
	}

	pub fn calls(&self) -> Vec<ProviderCall> {
		self.calls.lock().clone()
	}

	pub fn calls_to(&self, method: ProviderMethod) -> Vec<ProviderCall> {
		self.calls
			.lock()
			.iter()
			.filter(|call| call.method == method)
			.cloned()
			.collect()
	}

	pub fn call_count(&self, method: ProviderMethod) -> usize {
		self.calls
			.lock()
			.iter()
			.filter(|call| call.method == method)
			.count()
	}

	/// Number of write calls (create, update, delete and their bulk variants)
	pub fn write_count(&self) -> usize {
		self.calls
			.lock()
			.iter()
			.filter(|call| call.method.is_write())
			.count()
	}

	pub fn clear_calls(&self) {
		self.calls.lock().clear();
	}

	async fn before(
		&self,
		method: ProviderMethod,
		resource: &str,
		ids: Vec<RecordId>,
	) -> ProviderResult<()> {
		self.calls.lock().push(ProviderCall {
			method,
			resource: resource.to_string(),
			ids,
			at: Instant::now(),
		});
		tracing::trace!(method = %method, resource, "Recorded provider call");

		let latency = *self.latency.lock();
		if let Some(latency) = latency {
			tokio::time::sleep(latency).await;
		}

		let mut failures = self.failures.lock();
		let Some(failure) = failures.get_mut(&method) else {
			return Ok(());
		};
		let error = failure.error.clone();
		if let Some(remaining) = failure.remaining.as_mut() {
			*remaining = remaining.saturating_sub(1);
			if *remaining == 0 {
				failures.remove(&method);
			}
		}
		Err(error)
	}
}

impl fmt::Debug for RecordingDataProvider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RecordingDataProvider")
			.field("calls", &self.calls.lock().len())
			.finish()
	}
}

#[async_trait]
impl DataProvider for RecordingDataProvider {
	async fn get_list(
		&self,
		resource: &str,
		params: GetListParams,
	) -> ProviderResult<GetListResult> {
		self.before(ProviderMethod::GetList, resource, Vec::new())
			.await?;
		self.inner.get_list(resource, params).await
	}

	async fn get_one(&self, resource: &str, params: GetOneParams) -> ProviderResult<Record> {
		self.before(ProviderMethod::GetOne, resource, vec![params.id.clone()])
			.await?;
		self.inner.get_one(resource, params).await
	}

	async fn get_many(&self, resource: &str, params: GetManyParams) -> ProviderResult<Vec<Record>> {
		self.before(ProviderMethod::GetMany, resource, params.ids.clone())
			.await?;
		self.inner.get_many(resource, params).await
	}

	async fn create(&self, resource: &str, params: CreateParams) -> ProviderResult<Record> {
		self.before(ProviderMethod::Create, resource, Vec::new())
			.await?;
		self.inner.create(resource, params).await
	}

	async fn update(&self, resource: &str, params: UpdateParams) -> ProviderResult<Record> {
		self.before(ProviderMethod::Update, resource, vec![params.id.clone()])
			.await?;
		self.inner.update(resource, params).await
	}

	async fn update_many(
		&self,
		resource: &str,
		params: UpdateManyParams,
	) -> ProviderResult<Vec<RecordId>> {
		self.before(ProviderMethod::UpdateMany, resource, params.ids.clone())
			.await?;
		self.inner.update_many(resource, params).await
	}

	async fn delete(&self, resource: &str, params: DeleteParams) -> ProviderResult<Record> {
		self.before(ProviderMethod::Delete, resource, vec![params.id.clone()])
			.await?;
		self.inner.delete(resource, params).await
	}

	async fn delete_many(
		&self,
		resource: &str,
		params: DeleteManyParams,
	) -> ProviderResult<Vec<RecordId>> {
		self.before(ProviderMethod::DeleteMany, resource, params.ids.clone())
			.await?;
		self.inner.delete_many(resource, params).await
	}
}
