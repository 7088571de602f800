//! # reinhardt-crud-test
//!
//! Test utilities for the Reinhardt CRUD controller layer.
//!
//! ## Features
//!
//! - **RecordingDataProvider**: provider double recording calls, with failure and latency injection
//! - **MockDataProvider**: `mockall` mock of the `DataProvider` trait
//! - **Fixtures**: `rstest` fixtures for posts, providers, settings and a wired coordinator
//! - **Logging**: one-shot `tracing` initialization for tests

pub mod fixtures;
pub mod logging;
pub mod mock;
pub mod recording;

pub use fixtures::{CrudHarness, POSTS, crud_harness, crud_settings, posts, record, recording_provider};
pub use mock::{MockDataProvider, read_only_mock};
pub use recording::{ProviderCall, ProviderMethod, RecordingDataProvider};
