//! Notification level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Notification severity (values follow the Django message levels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
	Info,
	Success,
	Warning,
	Error,
}

impl Level {
	/// Returns the string representation of the level
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_crud_core::Level;
	///
	/// assert_eq!(Level::Info.as_str(), "info");
	/// assert_eq!(Level::Error.as_str(), "error");
	/// ```
	pub fn as_str(&self) -> &'static str {
		match self {
			Level::Info => "info",
			Level::Success => "success",
			Level::Warning => "warning",
			Level::Error => "error",
		}
	}

	/// Returns the numeric value of the level
	pub fn value(&self) -> i32 {
		match self {
			Level::Info => 20,
			Level::Success => 25,
			Level::Warning => 30,
			Level::Error => 40,
		}
	}
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Level {
	type Err = String;

	/// Parses a level from a string (case-insensitive)
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"info" => Ok(Level::Info),
			"success" => Ok(Level::Success),
			"warning" => Ok(Level::Warning),
			"error" => Ok(Level::Error),
			other => Err(format!("Unknown notification level: {}", other)),
		}
	}
}

impl PartialOrd for Level {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Level {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.value().cmp(&other.value())
	}
}
