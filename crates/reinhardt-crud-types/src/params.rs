//! Request and response parameters of the data provider contract

use crate::record::{Record, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
	#[default]
	Asc,
	Desc,
}

impl SortOrder {
	/// The opposite direction
	pub fn toggled(self) -> Self {
		match self {
			SortOrder::Asc => SortOrder::Desc,
			SortOrder::Desc => SortOrder::Asc,
		}
	}
}

/// Sort field and direction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
	pub field: String,
	pub order: SortOrder,
}

impl Sort {
	/// Create a sort on one field
	pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
		Self {
			field: field.into(),
			order,
		}
	}

	/// Parse the `"-field"` shorthand (leading `-` means descending)
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_crud_types::{Sort, SortOrder};
	///
	/// assert_eq!(Sort::parse("-created_at"), Sort::new("created_at", SortOrder::Desc));
	/// assert_eq!(Sort::parse("title"), Sort::new("title", SortOrder::Asc));
	/// ```
	pub fn parse(sort_str: &str) -> Self {
		match sort_str.strip_prefix('-') {
			Some(stripped) => Self::new(stripped, SortOrder::Desc),
			None => Self::new(sort_str, SortOrder::Asc),
		}
	}
}

/// Page-based pagination (pages are 1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pagination {
	pub page: u64,
	pub per_page: u64,
}

impl Pagination {
	/// Create a pagination window
	pub fn new(page: u64, per_page: u64) -> Self {
		Self {
			page: page.max(1),
			per_page: per_page.max(1),
		}
	}

	/// Number of records to skip
	pub fn offset(&self) -> u64 {
		(self.page.max(1) - 1) * self.per_page
	}
}

impl Default for Pagination {
	fn default() -> Self {
		Self::new(1, 25)
	}
}

/// Parameters of `DataProvider::get_list`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetListParams {
	pub pagination: Pagination,
	pub sort: Option<Sort>,
	pub filter: Map<String, Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub meta: Option<Value>,
}

impl GetListParams {
	/// Key identifying this query in the record cache
	///
	/// Two parameter sets that request the same page of the same query share a key.
	pub fn cache_key(&self) -> String {
		let key = serde_json::json!({
			"pagination": self.pagination,
			"sort": self.sort,
			"filter": self.filter,
		});
		key.to_string()
	}
}

/// Result of `DataProvider::get_list`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetListResult {
	pub data: Vec<Record>,
	pub total: u64,
}

/// Parameters of `DataProvider::get_one`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetOneParams {
	pub id: RecordId,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub meta: Option<Value>,
}

/// Parameters of `DataProvider::get_many`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetManyParams {
	pub ids: Vec<RecordId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub meta: Option<Value>,
}

/// Parameters of `DataProvider::create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateParams {
	pub data: Record,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub meta: Option<Value>,
}

/// Parameters of `DataProvider::update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateParams {
	pub id: RecordId,
	/// Fields to change
	pub data: Record,
	/// Record as it was before the change
	pub previous_data: Option<Record>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub meta: Option<Value>,
}

/// Parameters of `DataProvider::update_many`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateManyParams {
	pub ids: Vec<RecordId>,
	pub data: Record,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub meta: Option<Value>,
}

/// Parameters of `DataProvider::delete`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteParams {
	pub id: RecordId,
	pub previous_data: Option<Record>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub meta: Option<Value>,
}

/// Parameters of `DataProvider::delete_many`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteManyParams {
	pub ids: Vec<RecordId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub meta: Option<Value>,
}
