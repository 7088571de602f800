//! Record cache
//!
//! Records are cached per resource and id, and list queries are cached as
//! snapshots of ids plus the server-side total. Every write gets a version
//! from a monotonic counter; speculative writes can only be reverted or
//! committed while they are still the latest write on a record.

pub mod entry;
pub mod record_cache;

pub use entry::{CachedRecord, ListSnapshot};
pub use record_cache::{CacheStatistics, RecordCache, ResourceSnapshot, Speculation};
