//! Mutation strategies

use crate::errors::ParseMutationModeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a mutation is applied to the cache and sent to the data provider
///
/// # Examples
///
/// ```
/// use reinhardt_crud_types::MutationMode;
///
/// let mode: MutationMode = "optimistic".parse().unwrap();
/// assert_eq!(mode, MutationMode::Optimistic);
/// assert_eq!(MutationMode::default(), MutationMode::Undoable);
/// assert!(MutationMode::Undoable.is_speculative());
/// assert!(!MutationMode::Pessimistic.is_speculative());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationMode {
	/// Call the provider, wait for the response, then update the cache
	Pessimistic,
	/// Update the cache immediately, call the provider in the background,
	/// roll back on failure
	Optimistic,
	/// Update the cache immediately and defer the provider call behind a
	/// cancellable grace period, roll back if cancelled
	#[default]
	Undoable,
}

impl MutationMode {
	/// String representation of the mode
	pub fn as_str(&self) -> &'static str {
		match self {
			MutationMode::Pessimistic => "pessimistic",
			MutationMode::Optimistic => "optimistic",
			MutationMode::Undoable => "undoable",
		}
	}

	/// Whether the mode writes to the cache before the provider confirms
	pub fn is_speculative(&self) -> bool {
		!matches!(self, MutationMode::Pessimistic)
	}
}

impl fmt::Display for MutationMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for MutationMode {
	type Err = ParseMutationModeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"pessimistic" => Ok(MutationMode::Pessimistic),
			"optimistic" => Ok(MutationMode::Optimistic),
			"undoable" => Ok(MutationMode::Undoable),
			other => Err(ParseMutationModeError(other.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("pessimistic", MutationMode::Pessimistic)]
	#[case("Optimistic", MutationMode::Optimistic)]
	#[case(" UNDOABLE ", MutationMode::Undoable)]
	fn test_parse_mode(#[case] raw: &str, #[case] expected: MutationMode) {
		assert_eq!(raw.parse::<MutationMode>().unwrap(), expected);
	}

	#[rstest]
	fn test_parse_unknown_mode() {
		let err = "eventual".parse::<MutationMode>().unwrap_err();
		assert_eq!(err.to_string(), "Unknown mutation mode: eventual");
	}

	#[rstest]
	fn test_mode_serde_roundtrip_uses_lowercase() {
		let json = serde_json::to_string(&MutationMode::Optimistic).unwrap();
		assert_eq!(json, "\"optimistic\"");
	}
}
