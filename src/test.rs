//! Testing utilities module.
//!
//! This module provides the recording data provider, the `mockall` data
//! provider mock and `rstest` fixtures.

#[cfg(feature = "test")]
pub use reinhardt_crud_test::*;
