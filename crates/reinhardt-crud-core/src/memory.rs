//! In-memory data provider
//!
//! Backs demos and tests. Lists support equality filters (array values match
//! any element), a `q` full-text filter over string fields, sorting and
//! pagination.

use async_trait::async_trait;
use parking_lot::RwLock;
use reinhardt_crud_types::record::ID_FIELD;
use reinhardt_crud_types::{
	CreateParams, DataProvider, DeleteManyParams, DeleteParams, GetListParams, GetListResult,
	GetManyParams, GetOneParams, ProviderError, ProviderResult, Record, RecordId, SortOrder,
	UpdateManyParams, UpdateParams,
};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Name of the full-text filter
pub const SEARCH_FILTER: &str = "q";

/// Data provider keeping every resource in memory
///
/// # Examples
///
/// ```
/// use reinhardt_crud_core::InMemoryDataProvider;
/// use reinhardt_crud_types::{DataProvider, GetListParams, Record};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() {
/// let provider = InMemoryDataProvider::new();
/// provider.insert("posts", Record::from_value(json!({ "id": 1, "title": "Hello" })).unwrap());
///
/// let result = provider.get_list("posts", GetListParams::default()).await.unwrap();
/// assert_eq!(result.total, 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDataProvider {
	resources: RwLock<HashMap<String, BTreeMap<RecordId, Record>>>,
}

impl InMemoryDataProvider {
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a provider holding `records` for `resource`
	pub fn with_records(resource: &str, records: impl IntoIterator<Item = Record>) -> Self {
		let provider = Self::new();
		for record in records {
			provider.insert(resource, record);
		}
		provider
	}

	/// Insert or replace a record; records without an id are ignored
	pub fn insert(&self, resource: &str, record: Record) -> Option<RecordId> {
		let id = record.id()?;
		self.resources
			.write()
			.entry(resource.to_string())
			.or_default()
			.insert(id.clone(), record);
		Some(id)
	}

	pub fn get(&self, resource: &str, id: &RecordId) -> Option<Record> {
		self.resources
			.read()
			.get(resource)
			.and_then(|records| records.get(id).cloned())
	}

	/// Every record of a resource, ordered by id
	pub fn records(&self, resource: &str) -> Vec<Record> {
		let mut records: Vec<Record> = self
			.resources
			.read()
			.get(resource)
			.map(|records| records.values().cloned().collect())
			.unwrap_or_default();
		records.sort_by(|a, b| compare_field(a, b, ID_FIELD));
		records
	}

	pub fn len(&self, resource: &str) -> usize {
		self.resources
			.read()
			.get(resource)
			.map(BTreeMap::len)
			.unwrap_or(0)
	}

	fn next_id(records: &BTreeMap<RecordId, Record>) -> RecordId {
		let max = records
			.keys()
			.filter_map(|id| id.as_str().parse::<u64>().ok())
			.max()
			.unwrap_or(0);
		RecordId::from(max + 1)
	}
}

fn matches_filter(record: &Record, filter: &Map<String, Value>) -> bool {
	filter.iter().all(|(field, expected)| {
		if field == SEARCH_FILTER {
			let Some(needle) = expected.as_str() else {
				return true;
			};
			let needle = needle.to_lowercase();
			return record.fields().values().any(|value| {
				value
					.as_str()
					.is_some_and(|s| s.to_lowercase().contains(&needle))
			});
		}
		match (record.get(field), expected) {
			(Some(actual), Value::Array(candidates)) => candidates.contains(actual),
			(Some(actual), expected) => actual == expected,
			(None, Value::Null) => true,
			(None, _) => false,
		}
	})
}

fn value_rank(value: Option<&Value>) -> u8 {
	match value {
		None | Some(Value::Null) => 0,
		Some(Value::Bool(_)) => 1,
		Some(Value::Number(_)) => 2,
		Some(Value::String(_)) => 3,
		Some(_) => 4,
	}
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
	match (a, b) {
		(Some(Value::Number(x)), Some(Value::Number(y))) => {
			let x = x.as_f64().unwrap_or(0.0);
			let y = y.as_f64().unwrap_or(0.0);
			x.partial_cmp(&y).unwrap_or(Ordering::Equal)
		}
		(Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
		(Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
		_ => value_rank(a).cmp(&value_rank(b)),
	}
}

fn compare_field(a: &Record, b: &Record, field: &str) -> Ordering {
	compare_values(a.get(field), b.get(field))
}

#[async_trait]
impl DataProvider for InMemoryDataProvider {
	async fn get_list(
		&self,
		resource: &str,
		params: GetListParams,
	) -> ProviderResult<GetListResult> {
		let mut records: Vec<Record> = self
			.resources
			.read()
			.get(resource)
			.map(|records| {
				records
					.values()
					.filter(|record| matches_filter(record, &params.filter))
					.cloned()
					.collect()
			})
			.unwrap_or_default();

		match &params.sort {
			Some(sort) => records.sort_by(|a, b| {
				let ordering = compare_field(a, b, &sort.field);
				match sort.order {
					SortOrder::Asc => ordering,
					SortOrder::Desc => ordering.reverse(),
				}
			}),
			None => records.sort_by(|a, b| compare_field(a, b, ID_FIELD)),
		}

		let total = records.len() as u64;
		let data = records
			.into_iter()
			.skip(params.pagination.offset() as usize)
			.take(params.pagination.per_page as usize)
			.collect();
		Ok(GetListResult { data, total })
	}

	async fn get_one(&self, resource: &str, params: GetOneParams) -> ProviderResult<Record> {
		self.get(resource, &params.id)
			.ok_or_else(|| ProviderError::not_found(resource, &params.id))
	}

	async fn get_many(&self, resource: &str, params: GetManyParams) -> ProviderResult<Vec<Record>> {
		Ok(params
			.ids
			.iter()
			.filter_map(|id| self.get(resource, id))
			.collect())
	}

	async fn create(&self, resource: &str, params: CreateParams) -> ProviderResult<Record> {
		let mut resources = self.resources.write();
		let records = resources.entry(resource.to_string()).or_default();

		let mut record = params.data;
		let id = match record.id() {
			Some(id) if records.contains_key(&id) => {
				return Err(ProviderError::new(format!(
					"{} with id {} already exists",
					resource, id
				))
				.with_status(409));
			}
			Some(id) => id,
			None => {
				let id = Self::next_id(records);
				let value = id
					.as_str()
					.parse::<u64>()
					.map(Value::from)
					.unwrap_or_else(|_| Value::from(id.as_str()));
				record.set(ID_FIELD, value);
				id
			}
		};
		records.insert(id, record.clone());
		Ok(record)
	}

	async fn update(&self, resource: &str, params: UpdateParams) -> ProviderResult<Record> {
		let mut resources = self.resources.write();
		let record = resources
			.get_mut(resource)
			.and_then(|records| records.get_mut(&params.id))
			.ok_or_else(|| ProviderError::not_found(resource, &params.id))?;
		*record = record.merge(&params.data);
		Ok(record.clone())
	}

	async fn update_many(
		&self,
		resource: &str,
		params: UpdateManyParams,
	) -> ProviderResult<Vec<RecordId>> {
		let mut resources = self.resources.write();
		let Some(records) = resources.get_mut(resource) else {
			return Ok(Vec::new());
		};
		let mut updated = Vec::with_capacity(params.ids.len());
		for id in params.ids {
			if let Some(record) = records.get_mut(&id) {
				*record = record.merge(&params.data);
				updated.push(id);
			}
		}
		Ok(updated)
	}

	async fn delete(&self, resource: &str, params: DeleteParams) -> ProviderResult<Record> {
		self.resources
			.write()
			.get_mut(resource)
			.and_then(|records| records.remove(&params.id))
			.ok_or_else(|| ProviderError::not_found(resource, &params.id))
	}

	async fn delete_many(
		&self,
		resource: &str,
		params: DeleteManyParams,
	) -> ProviderResult<Vec<RecordId>> {
		let mut resources = self.resources.write();
		let Some(records) = resources.get_mut(resource) else {
			return Ok(Vec::new());
		};
		Ok(params
			.ids
			.into_iter()
			.filter(|id| records.remove(id).is_some())
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use reinhardt_crud_types::{Pagination, Sort};
	use rstest::{fixture, rstest};
	use serde_json::json;

	fn record(value: Value) -> Record {
		Record::from_value(value).unwrap()
	}

	#[fixture]
	fn provider() -> InMemoryDataProvider {
		InMemoryDataProvider::with_records(
			"posts",
			vec![
				record(json!({ "id": 1, "title": "Rust ownership", "status": "published", "views": 10 })),
				record(json!({ "id": 2, "title": "Async traits", "status": "draft", "views": 3 })),
				record(json!({ "id": 10, "title": "Borrowing in Rust", "status": "published", "views": 7 })),
			],
		)
	}

	fn ids(result: &GetListResult) -> Vec<String> {
		result
			.data
			.iter()
			.filter_map(Record::id)
			.map(|id| id.to_string())
			.collect()
	}

	#[rstest]
	#[tokio::test]
	async fn test_default_order_is_numeric_by_id(provider: InMemoryDataProvider) {
		let result = provider.get_list("posts", GetListParams::default()).await.unwrap();

		assert_eq!(ids(&result), vec!["1", "2", "10"]);
	}

	#[rstest]
	#[case("views", SortOrder::Asc, vec!["2", "10", "1"])]
	#[case("views", SortOrder::Desc, vec!["1", "10", "2"])]
	#[case("title", SortOrder::Asc, vec!["2", "10", "1"])]
	#[tokio::test]
	async fn test_sorting(
		provider: InMemoryDataProvider,
		#[case] field: &str,
		#[case] order: SortOrder,
		#[case] expected: Vec<&str>,
	) {
		let params = GetListParams {
			sort: Some(Sort::new(field, order)),
			..GetListParams::default()
		};

		let result = provider.get_list("posts", params).await.unwrap();

		assert_eq!(ids(&result), expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_filter_and_search(provider: InMemoryDataProvider) {
		let mut filter = Map::new();
		filter.insert("status".to_string(), json!("published"));
		filter.insert(SEARCH_FILTER.to_string(), json!("rust"));
		let params = GetListParams {
			filter,
			..GetListParams::default()
		};

		let result = provider.get_list("posts", params).await.unwrap();

		assert_eq!(result.total, 2);
		assert_eq!(ids(&result), vec!["1", "10"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_pagination_keeps_total(provider: InMemoryDataProvider) {
		let params = GetListParams {
			pagination: Pagination::new(2, 2),
			..GetListParams::default()
		};

		let result = provider.get_list("posts", params).await.unwrap();

		assert_eq!(result.total, 3);
		assert_eq!(ids(&result), vec!["10"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_create_assigns_next_numeric_id(provider: InMemoryDataProvider) {
		let created = provider
			.create(
				"posts",
				CreateParams {
					data: record(json!({ "title": "New" })),
					meta: None,
				},
			)
			.await
			.unwrap();

		assert_eq!(created.get("id"), Some(&json!(11)));
		assert_eq!(provider.len("posts"), 4);
	}

	#[rstest]
	#[tokio::test]
	async fn test_update_and_delete_missing_record_are_not_found(provider: InMemoryDataProvider) {
		let err = provider
			.update(
				"posts",
				UpdateParams {
					id: RecordId::from(99),
					data: Record::new(),
					previous_data: None,
					meta: None,
				},
			)
			.await
			.unwrap_err();
		assert_eq!(err.status, Some(404));

		let err = provider
			.delete(
				"posts",
				DeleteParams {
					id: RecordId::from(99),
					previous_data: None,
					meta: None,
				},
			)
			.await
			.unwrap_err();
		assert_eq!(err.status, Some(404));
	}

	#[rstest]
	#[tokio::test]
	async fn test_bulk_operations_report_affected_ids(provider: InMemoryDataProvider) {
		let updated = provider
			.update_many(
				"posts",
				UpdateManyParams {
					ids: vec![RecordId::from(1), RecordId::from(42)],
					data: record(json!({ "status": "archived" })),
					meta: None,
				},
			)
			.await
			.unwrap();
		assert_eq!(updated, vec![RecordId::from(1)]);
		assert_eq!(
			provider.get("posts", &RecordId::from(1)).unwrap().get("status"),
			Some(&json!("archived"))
		);

		let deleted = provider
			.delete_many(
				"posts",
				DeleteManyParams {
					ids: vec![RecordId::from(2), RecordId::from(10), RecordId::from(42)],
					meta: None,
				},
			)
			.await
			.unwrap();
		assert_eq!(deleted, vec![RecordId::from(2), RecordId::from(10)]);
		assert_eq!(provider.len("posts"), 1);
	}
}
