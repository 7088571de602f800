//! Shared record cache with speculative writes

use super::entry::{CachedRecord, LayerEnd, ListSnapshot, ResourceEntries};
use parking_lot::RwLock;
use reinhardt_crud_types::{MutationKind, Record, RecordId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Token of a speculative write
///
/// Names the records the write touched and the version assigned to it. The
/// cache keeps each record's baseline, so a settlement arriving after a newer
/// write on the same record is ignored, and a failed write that was
/// superseded hands its baseline down to the newer one.
#[derive(Debug, Clone, PartialEq)]
pub struct Speculation {
	resource: String,
	kind: MutationKind,
	version: u64,
	ids: Vec<RecordId>,
}

impl Speculation {
	pub fn resource(&self) -> &str {
		&self.resource
	}

	pub fn kind(&self) -> MutationKind {
		self.kind
	}

	pub fn version(&self) -> u64 {
		self.version
	}

	/// Ids of the records this write touched
	pub fn ids(&self) -> Vec<RecordId> {
		self.ids.clone()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}
}

/// Cache hit/miss statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
	pub hits: u64,
	pub misses: u64,
	pub record_count: u64,
	pub list_count: u64,
}

impl CacheStatistics {
	pub fn hit_rate(&self) -> f64 {
		let total = self.hits + self.misses;
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}
}

/// Comparable view of everything cached for one resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSnapshot {
	/// `None` marks a tombstone
	pub records: BTreeMap<RecordId, Option<Record>>,
	pub lists: BTreeMap<String, ListSnapshot>,
}

/// Read cache shared by controllers and the mutation coordinator
///
/// Cloning the cache yields another handle to the same store.
///
/// # Examples
///
/// ```
/// use reinhardt_crud_core::RecordCache;
/// use reinhardt_crud_types::{Record, RecordId};
/// use serde_json::json;
///
/// let cache = RecordCache::new();
/// cache.put_record("posts", Record::from_value(json!({ "id": 1, "title": "A" })).unwrap());
///
/// let patch = Record::from_value(json!({ "title": "B" })).unwrap();
/// let speculation = cache.apply_update("posts", &[RecordId::from(1)], &patch);
/// assert_eq!(
/// 	cache.get_record("posts", &RecordId::from(1)).unwrap().get("title"),
/// 	Some(&json!("B"))
/// );
///
/// cache.revert(speculation);
/// assert_eq!(
/// 	cache.get_record("posts", &RecordId::from(1)).unwrap().get("title"),
/// 	Some(&json!("A"))
/// );
/// ```
#[derive(Clone, Default)]
pub struct RecordCache {
	store: Arc<RwLock<HashMap<String, ResourceEntries>>>,
	versions: Arc<AtomicU64>,
	hits: Arc<AtomicU64>,
	misses: Arc<AtomicU64>,
}

impl RecordCache {
	pub fn new() -> Self {
		Self::default()
	}

	fn next_version(&self) -> u64 {
		self.versions.fetch_add(1, Ordering::SeqCst) + 1
	}

	/// Store a record fetched from the provider
	///
	/// Records with an unsettled speculative write are left untouched.
	/// Returns whether the record was written.
	pub fn put_record(&self, resource: &str, record: Record) -> bool {
		let Some(id) = record.id() else {
			return false;
		};
		let version = self.next_version();
		let mut store = self.store.write();
		let entries = store.entry(resource.to_string()).or_default();
		if entries.is_in_flight(&id) {
			tracing::debug!(resource, id = %id, "Skipped cache write of record with pending mutation");
			return false;
		}
		entries
			.records
			.insert(id, CachedRecord::new(Some(record), version));
		true
	}

	/// Store the result of a list query
	pub fn put_list(&self, resource: &str, query_key: &str, records: Vec<Record>, total: u64) {
		let ids: Vec<RecordId> = records.iter().filter_map(Record::id).collect();
		for record in records {
			self.put_record(resource, record);
		}
		self.store
			.write()
			.entry(resource.to_string())
			.or_default()
			.lists
			.insert(query_key.to_string(), ListSnapshot { ids, total });
	}

	pub fn get_record(&self, resource: &str, id: &RecordId) -> Option<Record> {
		let found = self
			.store
			.read()
			.get(resource)
			.and_then(|entries| entries.records.get(id))
			.and_then(|cached| cached.data.clone());
		self.count_lookup(found.is_some());
		found
	}

	/// Records and total of a cached list query
	///
	/// Tombstoned records are hidden and not counted in the total.
	pub fn get_list(&self, resource: &str, query_key: &str) -> Option<(Vec<Record>, u64)> {
		let store = self.store.read();
		let Some(entries) = store.get(resource) else {
			self.count_lookup(false);
			return None;
		};
		let Some(list) = entries.lists.get(query_key) else {
			self.count_lookup(false);
			return None;
		};

		let mut records = Vec::with_capacity(list.ids.len());
		let mut hidden = 0u64;
		for id in &list.ids {
			match entries.records.get(id) {
				Some(CachedRecord {
					data: Some(record), ..
				}) => records.push(record.clone()),
				Some(CachedRecord { data: None, .. }) => hidden += 1,
				None => {}
			}
		}
		self.count_lookup(true);
		Some((records, list.total.saturating_sub(hidden)))
	}

	/// Current version of a cached record or tombstone
	pub fn record_version(&self, resource: &str, id: &RecordId) -> Option<u64> {
		self.store
			.read()
			.get(resource)
			.and_then(|entries| entries.records.get(id))
			.map(|cached| cached.version)
	}

	pub fn contains(&self, resource: &str, id: &RecordId) -> bool {
		self.store
			.read()
			.get(resource)
			.and_then(|entries| entries.records.get(id))
			.is_some_and(|cached| !cached.is_tombstone())
	}

	/// Whether a record has an unsettled speculative write
	pub fn is_speculative(&self, resource: &str, id: &RecordId) -> bool {
		self.store
			.read()
			.get(resource)
			.is_some_and(|entries| entries.is_in_flight(id))
	}

	/// Speculatively merge `patch` into every cached record of `ids`
	///
	/// Records that are not cached (or tombstoned) are left out of the write.
	pub fn apply_update(&self, resource: &str, ids: &[RecordId], patch: &Record) -> Speculation {
		let version = self.next_version();
		let mut store = self.store.write();
		let entries = store.entry(resource.to_string()).or_default();

		let mut touched = Vec::with_capacity(ids.len());
		for id in ids {
			let Some(baseline) = entries.records.get(id).cloned() else {
				continue;
			};
			let Some(current) = baseline.data.as_ref() else {
				continue;
			};
			let updated = current.merge(patch);
			entries
				.records
				.insert(id.clone(), CachedRecord::new(Some(updated), version));
			entries.begin(id, version, Some(baseline));
			touched.push(id.clone());
		}

		Speculation {
			resource: resource.to_string(),
			kind: MutationKind::Update,
			version,
			ids: touched,
		}
	}

	/// Speculatively tombstone every record of `ids`
	pub fn apply_delete(&self, resource: &str, ids: &[RecordId]) -> Speculation {
		let version = self.next_version();
		let mut store = self.store.write();
		let entries = store.entry(resource.to_string()).or_default();

		for id in ids {
			let baseline = entries.records.get(id).cloned();
			entries
				.records
				.insert(id.clone(), CachedRecord::new(None, version));
			entries.begin(id, version, baseline);
		}

		Speculation {
			resource: resource.to_string(),
			kind: MutationKind::Delete,
			version,
			ids: ids.to_vec(),
		}
	}

	/// Roll a speculative write back to its baseline
	///
	/// Records written again after the speculation keep the newer write. If
	/// that newer write is speculative too, it inherits this write's baseline.
	pub fn revert(&self, speculation: Speculation) {
		let mut store = self.store.write();
		let entries = store.entry(speculation.resource.clone()).or_default();

		for id in speculation.ids {
			let baseline = match entries.end(&id, speculation.version, true) {
				LayerEnd::Top(baseline) if Self::owns(entries, &id, speculation.version) => baseline,
				LayerEnd::Top(_) | LayerEnd::Superseded => {
					tracing::debug!(
						resource = %speculation.resource,
						id = %id,
						"Revert superseded by a newer write"
					);
					continue;
				}
				LayerEnd::Unknown => continue,
			};
			match baseline {
				Some(baseline) => {
					entries.records.insert(id, baseline);
				}
				None => {
					entries.records.remove(&id);
				}
			}
		}
	}

	/// Settle a speculative write with the records returned by the provider
	///
	/// Updates adopt server-returned fields; deletes drop the records from
	/// the cache and from every list snapshot. Records written again after the
	/// speculation keep the newer write.
	pub fn commit(&self, speculation: Speculation, server_records: &[Record]) {
		let server: HashMap<RecordId, &Record> = server_records
			.iter()
			.filter_map(|record| record.id().map(|id| (id, record)))
			.collect();
		let version = self.next_version();
		let mut store = self.store.write();
		let entries = store.entry(speculation.resource.clone()).or_default();

		for id in speculation.ids {
			let top = matches!(entries.end(&id, speculation.version, false), LayerEnd::Top(_));
			if !top || !Self::owns(entries, &id, speculation.version) {
				tracing::debug!(
					resource = %speculation.resource,
					id = %id,
					"Commit superseded by a newer write"
				);
				continue;
			}
			match speculation.kind {
				MutationKind::Update => {
					if let Some(record) = server.get(&id) {
						let merged = entries
							.records
							.get(&id)
							.and_then(|cached| cached.data.as_ref())
							.map(|current| current.merge(record))
							.unwrap_or_else(|| (*record).clone());
						entries
							.records
							.insert(id, CachedRecord::new(Some(merged), version));
					}
				}
				MutationKind::Delete => {
					entries.records.remove(&id);
					entries.forget_in_lists(&id);
				}
			}
		}
	}

	fn owns(entries: &ResourceEntries, id: &RecordId, version: u64) -> bool {
		entries
			.records
			.get(id)
			.is_some_and(|cached| cached.version == version)
	}

	/// Write provider-confirmed records, superseding pending speculations
	pub fn commit_update(&self, resource: &str, records: &[Record]) {
		let version = self.next_version();
		let mut store = self.store.write();
		let entries = store.entry(resource.to_string()).or_default();
		for record in records {
			if let Some(id) = record.id() {
				entries
					.records
					.insert(id, CachedRecord::new(Some(record.clone()), version));
			}
		}
	}

	/// Merge a provider-confirmed patch into the cached records of `ids`
	pub fn commit_patch(&self, resource: &str, ids: &[RecordId], patch: &Record) {
		let version = self.next_version();
		let mut store = self.store.write();
		let entries = store.entry(resource.to_string()).or_default();
		for id in ids {
			let merged = entries
				.records
				.get(id)
				.and_then(|cached| cached.data.as_ref())
				.map(|current| current.merge(patch));
			if let Some(merged) = merged {
				entries
					.records
					.insert(id.clone(), CachedRecord::new(Some(merged), version));
			}
		}
	}

	/// Drop provider-confirmed deletes from the cache and every list snapshot
	pub fn commit_delete(&self, resource: &str, ids: &[RecordId]) {
		let mut store = self.store.write();
		let entries = store.entry(resource.to_string()).or_default();
		for id in ids {
			entries.records.remove(id);
			entries.forget_in_lists(id);
		}
	}

	/// Drop every list snapshot of a resource
	pub fn invalidate_lists(&self, resource: &str) {
		if let Some(entries) = self.store.write().get_mut(resource) {
			entries.lists.clear();
		}
	}

	/// Drop everything cached for a resource except records with pending mutations
	pub fn invalidate(&self, resource: &str) {
		let mut store = self.store.write();
		if let Some(entries) = store.get_mut(resource) {
			entries.lists.clear();
			let speculations = &entries.speculations;
			entries
				.records
				.retain(|id, _| speculations.get(id).is_some_and(|layers| !layers.is_empty()));
		}
	}

	pub fn clear(&self) {
		self.store.write().clear();
	}

	pub fn snapshot(&self, resource: &str) -> ResourceSnapshot {
		let store = self.store.read();
		let Some(entries) = store.get(resource) else {
			return ResourceSnapshot::default();
		};
		ResourceSnapshot {
			records: entries
				.records
				.iter()
				.map(|(id, cached)| (id.clone(), cached.data.clone()))
				.collect(),
			lists: entries
				.lists
				.iter()
				.map(|(key, list)| (key.clone(), list.clone()))
				.collect(),
		}
	}

	pub fn statistics(&self) -> CacheStatistics {
		let store = self.store.read();
		CacheStatistics {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			record_count: store.values().map(|e| e.records.len() as u64).sum(),
			list_count: store.values().map(|e| e.lists.len() as u64).sum(),
		}
	}

	fn count_lookup(&self, hit: bool) {
		if hit {
			self.hits.fetch_add(1, Ordering::Relaxed);
		} else {
			self.misses.fetch_add(1, Ordering::Relaxed);
		}
	}
}

impl std::fmt::Debug for RecordCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RecordCache")
			.field("statistics", &self.statistics())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;

	fn record(value: serde_json::Value) -> Record {
		Record::from_value(value).unwrap()
	}

	fn title(cache: &RecordCache, id: i64) -> Option<serde_json::Value> {
		cache
			.get_record("posts", &RecordId::from(id))
			.and_then(|r| r.get("title").cloned())
	}

	#[fixture]
	fn cache() -> RecordCache {
		let cache = RecordCache::new();
		cache.put_list(
			"posts",
			"all",
			vec![
				record(json!({ "id": 1, "title": "A" })),
				record(json!({ "id": 2, "title": "B" })),
				record(json!({ "id": 3, "title": "C" })),
			],
			3,
		);
		cache
	}

	#[rstest]
	fn test_get_list_returns_cached_records(cache: RecordCache) {
		let (records, total) = cache.get_list("posts", "all").unwrap();

		assert_eq!(records.len(), 3);
		assert_eq!(total, 3);
		assert!(cache.get_list("posts", "other").is_none());
	}

	#[rstest]
	fn test_speculative_delete_hides_record_and_reduces_total(cache: RecordCache) {
		let speculation = cache.apply_delete("posts", &[RecordId::from(2)]);

		let (records, total) = cache.get_list("posts", "all").unwrap();
		assert_eq!(records.len(), 2);
		assert_eq!(total, 2);
		assert!(!cache.contains("posts", &RecordId::from(2)));

		cache.revert(speculation);
		let (records, total) = cache.get_list("posts", "all").unwrap();
		assert_eq!(records.len(), 3);
		assert_eq!(total, 3);
	}

	#[rstest]
	fn test_revert_restores_snapshot(cache: RecordCache) {
		let before = cache.snapshot("posts");

		let update = cache.apply_update(
			"posts",
			&[RecordId::from(1), RecordId::from(3)],
			&record(json!({ "title": "Z" })),
		);
		assert_ne!(cache.snapshot("posts"), before);

		cache.revert(update);
		assert_eq!(cache.snapshot("posts"), before);
	}

	#[rstest]
	fn test_committed_delete_leaves_lists(cache: RecordCache) {
		let speculation = cache.apply_delete("posts", &[RecordId::from(1)]);
		cache.commit(speculation, &[]);

		let snapshot = cache.snapshot("posts");
		assert!(!snapshot.records.contains_key(&RecordId::from(1)));
		assert_eq!(snapshot.lists["all"].total, 2);
		assert_eq!(snapshot.lists["all"].ids.len(), 2);
		assert!(!cache.is_speculative("posts", &RecordId::from(1)));
	}

	#[rstest]
	fn test_commit_adopts_server_fields(cache: RecordCache) {
		let speculation = cache.apply_update(
			"posts",
			&[RecordId::from(1)],
			&record(json!({ "title": "B" })),
		);

		cache.commit(
			speculation,
			&[record(json!({ "id": 1, "title": "B", "updated_at": "now" }))],
		);

		let stored = cache.get_record("posts", &RecordId::from(1)).unwrap();
		assert_eq!(stored.get("updated_at"), Some(&json!("now")));
	}

	#[rstest]
	fn test_late_settlement_does_not_clobber_newer_write(cache: RecordCache) {
		let first = cache.apply_update("posts", &[RecordId::from(1)], &record(json!({ "title": "X" })));
		let second = cache.apply_update("posts", &[RecordId::from(1)], &record(json!({ "title": "Y" })));

		// The earlier write fails after the later one was issued
		cache.revert(first);
		assert_eq!(title(&cache, 1), Some(json!("Y")));

		cache.commit(second, &[]);
		assert_eq!(title(&cache, 1), Some(json!("Y")));
	}

	#[rstest]
	fn test_failed_overlapping_writes_restore_original(cache: RecordCache) {
		let first = cache.apply_update("posts", &[RecordId::from(1)], &record(json!({ "title": "X" })));
		let second = cache.apply_update("posts", &[RecordId::from(1)], &record(json!({ "title": "Y" })));

		cache.revert(first);
		assert_eq!(title(&cache, 1), Some(json!("Y")));
		assert!(cache.is_speculative("posts", &RecordId::from(1)));

		cache.revert(second);
		assert_eq!(title(&cache, 1), Some(json!("A")));
		assert!(!cache.is_speculative("posts", &RecordId::from(1)));
	}

	#[rstest]
	fn test_failed_overlapping_writes_restore_original_in_any_order(cache: RecordCache) {
		let before = cache.snapshot("posts");
		let first = cache.apply_update("posts", &[RecordId::from(2)], &record(json!({ "title": "X" })));
		let second = cache.apply_update("posts", &[RecordId::from(2)], &record(json!({ "title": "Y" })));
		let third = cache.apply_delete("posts", &[RecordId::from(2)]);

		cache.revert(second);
		cache.revert(first);
		assert!(!cache.contains("posts", &RecordId::from(2)));

		cache.revert(third);
		assert_eq!(cache.snapshot("posts"), before);
	}

	#[rstest]
	fn test_revert_after_confirmed_older_write_keeps_confirmed_value(cache: RecordCache) {
		let first = cache.apply_update("posts", &[RecordId::from(1)], &record(json!({ "title": "X" })));
		let second = cache.apply_update("posts", &[RecordId::from(1)], &record(json!({ "title": "Y" })));

		cache.commit(first, &[record(json!({ "id": 1, "title": "X" }))]);
		cache.revert(second);

		assert_eq!(title(&cache, 1), Some(json!("X")));
	}

	#[rstest]
	fn test_reverting_twice_is_harmless(cache: RecordCache) {
		let update = cache.apply_update("posts", &[RecordId::from(3)], &record(json!({ "title": "Z" })));
		let copy = update.clone();

		cache.revert(update);
		cache.put_record("posts", record(json!({ "id": 3, "title": "Fresh" })));
		cache.revert(copy);

		assert_eq!(title(&cache, 3), Some(json!("Fresh")));
	}

	#[rstest]
	fn test_late_commit_does_not_clobber_newer_write(cache: RecordCache) {
		let first = cache.apply_update("posts", &[RecordId::from(1)], &record(json!({ "title": "X" })));
		let _second = cache.apply_update("posts", &[RecordId::from(1)], &record(json!({ "title": "Y" })));

		cache.commit(first, &[record(json!({ "id": 1, "title": "X" }))]);

		assert_eq!(title(&cache, 1), Some(json!("Y")));
	}

	#[rstest]
	fn test_put_record_skips_records_with_pending_writes(cache: RecordCache) {
		let speculation = cache.apply_delete("posts", &[RecordId::from(1)]);

		assert!(!cache.put_record("posts", record(json!({ "id": 1, "title": "A" }))));
		assert!(!cache.contains("posts", &RecordId::from(1)));

		cache.revert(speculation);
		assert!(cache.put_record("posts", record(json!({ "id": 1, "title": "A2" }))));
		assert_eq!(title(&cache, 1), Some(json!("A2")));
	}

	#[rstest]
	fn test_apply_update_skips_uncached_records(cache: RecordCache) {
		let speculation = cache.apply_update(
			"posts",
			&[RecordId::from(1), RecordId::from(99)],
			&record(json!({ "title": "Z" })),
		);

		assert_eq!(speculation.ids(), vec![RecordId::from(1)]);
		assert!(!cache.contains("posts", &RecordId::from(99)));
	}

	#[rstest]
	fn test_invalidate_keeps_pending_records(cache: RecordCache) {
		let _speculation = cache.apply_update("posts", &[RecordId::from(1)], &record(json!({ "title": "Z" })));

		cache.invalidate("posts");

		let snapshot = cache.snapshot("posts");
		assert!(snapshot.lists.is_empty());
		assert_eq!(snapshot.records.len(), 1);
		assert_eq!(title(&cache, 1), Some(json!("Z")));
	}

	#[rstest]
	fn test_statistics_count_hits_and_misses(cache: RecordCache) {
		cache.get_record("posts", &RecordId::from(1));
		cache.get_record("posts", &RecordId::from(42));

		let stats = cache.statistics();
		assert_eq!(stats.hits, 1);
		assert_eq!(stats.misses, 1);
		assert_eq!(stats.record_count, 3);
		assert_eq!(stats.hit_rate(), 0.5);
	}
}
