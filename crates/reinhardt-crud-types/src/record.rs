//! Record and identifier types
//!
//! Controllers operate on dynamic data: a record is a JSON object keyed by
//! field name, identified by its `id` field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Name of the field holding a record's identifier
pub const ID_FIELD: &str = "id";

/// Identifier of a record within a resource
///
/// Identifiers are stored as strings so that numeric and textual primary keys
/// compare the same way regardless of how the provider serialized them.
///
/// # Examples
///
/// ```
/// use reinhardt_crud_types::RecordId;
/// use serde_json::json;
///
/// assert_eq!(RecordId::from(42), RecordId::new("42"));
/// assert_eq!(RecordId::from_value(&json!(42)), Some(RecordId::new("42")));
/// assert_eq!(RecordId::from_value(&json!(null)), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
	/// Create a new identifier
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Read an identifier from a JSON value (strings and numbers only)
	pub fn from_value(value: &Value) -> Option<Self> {
		match value {
			Value::String(s) => Some(Self(s.clone())),
			Value::Number(n) => Some(Self(n.to_string())),
			_ => None,
		}
	}

	/// Get the identifier as a string slice
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Whether the identifier is blank
	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Display for RecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<&str> for RecordId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

impl From<String> for RecordId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl From<i64> for RecordId {
	fn from(id: i64) -> Self {
		Self(id.to_string())
	}
}

impl From<i32> for RecordId {
	fn from(id: i32) -> Self {
		Self(id.to_string())
	}
}

impl From<u64> for RecordId {
	fn from(id: u64) -> Self {
		Self(id.to_string())
	}
}

/// A single entity of a resource
///
/// # Examples
///
/// ```
/// use reinhardt_crud_types::{Record, RecordId};
/// use serde_json::json;
///
/// let post = Record::from_value(json!({ "id": 1, "title": "A" })).unwrap();
/// let patch = Record::from_value(json!({ "title": "B" })).unwrap();
///
/// let merged = post.merge(&patch);
/// assert_eq!(merged.id(), Some(RecordId::from(1)));
/// assert_eq!(merged.get("title"), Some(&json!("B")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
	/// Create an empty record
	pub fn new() -> Self {
		Self(Map::new())
	}

	/// Build a record from a JSON value; returns `None` unless the value is an object
	pub fn from_value(value: Value) -> Option<Self> {
		match value {
			Value::Object(map) => Some(Self(map)),
			_ => None,
		}
	}

	/// Identifier of the record, read from its `id` field
	pub fn id(&self) -> Option<RecordId> {
		self.0.get(ID_FIELD).and_then(RecordId::from_value)
	}

	/// Get a field value
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.0.get(field)
	}

	/// Set a field value, returning the previous one
	pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
		self.0.insert(field.into(), value)
	}

	/// Shallow-merge `patch` over this record; keys of the patch win
	pub fn merge(&self, patch: &Record) -> Record {
		let mut merged = self.0.clone();
		for (key, value) in &patch.0 {
			merged.insert(key.clone(), value.clone());
		}
		Self(merged)
	}

	/// Borrow the underlying field map
	pub fn fields(&self) -> &Map<String, Value> {
		&self.0
	}

	/// Number of fields
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the record has no fields
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Convert into a JSON value
	pub fn into_value(self) -> Value {
		Value::Object(self.0)
	}
}

impl From<Map<String, Value>> for Record {
	fn from(map: Map<String, Value>) -> Self {
		Self(map)
	}
}
