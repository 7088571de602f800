//! Internal cache entry structures

use reinhardt_crud_types::{Record, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cached record with its write version
///
/// `data: None` is a tombstone left by a delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord {
	pub data: Option<Record>,
	pub version: u64,
}

impl CachedRecord {
	pub(crate) fn new(data: Option<Record>, version: u64) -> Self {
		Self { data, version }
	}

	pub fn is_tombstone(&self) -> bool {
		self.data.is_none()
	}
}

/// Ids and total of one list query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListSnapshot {
	pub ids: Vec<RecordId>,
	pub total: u64,
}

/// One unsettled speculative write on a record
#[derive(Debug, Clone)]
pub(crate) struct Layer {
	pub(crate) version: u64,
	/// What the record held before the write; `None` if it was not cached
	pub(crate) baseline: Option<CachedRecord>,
}

/// How a speculative write left its record's stack of writes
#[derive(Debug)]
pub(crate) enum LayerEnd {
	/// It was the newest speculation on the record
	Top(Option<CachedRecord>),
	/// A newer speculation is stacked on the record
	Superseded,
	/// No speculation of that version is registered on the record
	Unknown,
}

#[derive(Debug, Default)]
pub(crate) struct ResourceEntries {
	pub(crate) records: HashMap<RecordId, CachedRecord>,
	pub(crate) lists: HashMap<String, ListSnapshot>,
	/// Unsettled speculative writes per record, oldest first
	pub(crate) speculations: HashMap<RecordId, Vec<Layer>>,
}

impl ResourceEntries {
	pub(crate) fn is_in_flight(&self, id: &RecordId) -> bool {
		self.speculations.get(id).is_some_and(|layers| !layers.is_empty())
	}

	pub(crate) fn begin(&mut self, id: &RecordId, version: u64, baseline: Option<CachedRecord>) {
		self.speculations
			.entry(id.clone())
			.or_default()
			.push(Layer { version, baseline });
	}

	/// Remove the speculation of `version` from the record's stack
	///
	/// With `hand_down`, a superseded write passes its baseline to the write
	/// stacked directly on it, so reverting that one later restores the
	/// value from before both.
	pub(crate) fn end(&mut self, id: &RecordId, version: u64, hand_down: bool) -> LayerEnd {
		let Some(layers) = self.speculations.get_mut(id) else {
			return LayerEnd::Unknown;
		};
		let Some(index) = layers.iter().position(|layer| layer.version == version) else {
			return LayerEnd::Unknown;
		};
		let layer = layers.remove(index);
		let end = match layers.get_mut(index) {
			Some(next) => {
				let stacked = next
					.baseline
					.as_ref()
					.is_some_and(|baseline| baseline.version == version);
				if hand_down && stacked {
					next.baseline = layer.baseline;
				}
				LayerEnd::Superseded
			}
			None => LayerEnd::Top(layer.baseline),
		};
		if layers.is_empty() {
			self.speculations.remove(id);
		}
		end
	}

	/// Drop deleted ids from every list snapshot
	pub(crate) fn forget_in_lists(&mut self, id: &RecordId) {
		for list in self.lists.values_mut() {
			let before = list.ids.len();
			list.ids.retain(|listed| listed != id);
			if list.ids.len() != before {
				list.total = list.total.saturating_sub(1);
			}
		}
	}
}
