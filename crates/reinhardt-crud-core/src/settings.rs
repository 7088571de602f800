//! CRUD controller settings
//!
//! Settings can be loaded from a TOML or JSON file, from environment
//! variables, or built in code.
//!
//! ```toml
//! [mutation]
//! default_mode = "undoable"
//!
//! [undo]
//! grace_period_ms = 5000
//! conflict_policy = "force_settle"
//! stream_scope = "record"
//!
//! [notifications]
//! notify_on_undoable_success = true
//! notify_on_undo = true
//! auto_hide_ms = 4000
//! capacity = 64
//!
//! [list]
//! default_per_page = 25
//! max_per_page = 500
//! ```

use crate::undo::{ConflictPolicy, UndoStreamScope};
use reinhardt_crud_types::MutationMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Mutation settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MutationSettings {
	/// Mode used when a caller does not pick one
	#[serde(default)]
	pub default_mode: MutationMode,
}

/// Undo queue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoSettings {
	#[serde(default = "default_grace_period_ms")]
	pub grace_period_ms: u64,
	#[serde(default)]
	pub conflict_policy: ConflictPolicy,
	#[serde(default)]
	pub stream_scope: UndoStreamScope,
}

impl Default for UndoSettings {
	fn default() -> Self {
		Self {
			grace_period_ms: default_grace_period_ms(),
			conflict_policy: ConflictPolicy::default(),
			stream_scope: UndoStreamScope::default(),
		}
	}
}

/// Notification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
	/// Push a success notification when an undoable mutation settles
	#[serde(default = "default_true")]
	pub notify_on_undoable_success: bool,
	/// Push an "undone" notification when an undoable mutation is cancelled
	#[serde(default = "default_true")]
	pub notify_on_undo: bool,
	#[serde(default = "default_auto_hide_ms")]
	pub auto_hide_ms: Option<u64>,
	/// Broadcast buffer of notification subscribers
	#[serde(default = "default_capacity")]
	pub capacity: usize,
}

impl Default for NotificationSettings {
	fn default() -> Self {
		Self {
			notify_on_undoable_success: true,
			notify_on_undo: true,
			auto_hide_ms: default_auto_hide_ms(),
			capacity: default_capacity(),
		}
	}
}

/// List controller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSettings {
	#[serde(default = "default_per_page")]
	pub default_per_page: u64,
	#[serde(default = "default_max_per_page")]
	pub max_per_page: u64,
}

impl Default for ListSettings {
	fn default() -> Self {
		Self {
			default_per_page: default_per_page(),
			max_per_page: default_max_per_page(),
		}
	}
}

fn default_grace_period_ms() -> u64 {
	5000
}

fn default_true() -> bool {
	true
}

fn default_auto_hide_ms() -> Option<u64> {
	Some(4000)
}

fn default_capacity() -> usize {
	64
}

fn default_per_page() -> u64 {
	25
}

fn default_max_per_page() -> u64 {
	500
}

/// Settings of the CRUD controller layer
///
/// # Examples
///
/// ```
/// use reinhardt_crud_core::CrudSettings;
/// use reinhardt_crud_types::MutationMode;
///
/// let settings = CrudSettings::from_toml_str(
/// 	r#"
/// 	[mutation]
/// 	default_mode = "pessimistic"
///
/// 	[undo]
/// 	grace_period_ms = 3000
/// 	"#,
/// )
/// .unwrap();
///
/// assert_eq!(settings.mutation.default_mode, MutationMode::Pessimistic);
/// assert_eq!(settings.undo.grace_period_ms, 3000);
/// assert_eq!(settings.list.default_per_page, 25);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CrudSettings {
	#[serde(default)]
	pub mutation: MutationSettings,
	#[serde(default)]
	pub undo: UndoSettings,
	#[serde(default)]
	pub notifications: NotificationSettings,
	#[serde(default)]
	pub list: ListSettings,
}

impl CrudSettings {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parse and validate TOML settings
	pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
		let settings: CrudSettings = toml::from_str(contents)
			.map_err(|e| SettingsError::ParseError(format!("TOML parse error: {}", e)))?;
		settings.validate()?;
		Ok(settings)
	}

	/// Load and validate settings from a `.toml` or `.json` file
	pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
		let path = path.into();
		let contents = std::fs::read_to_string(&path).map_err(|e| {
			SettingsError::FileError(format!("Failed to read {}: {}", path.display(), e))
		})?;

		let settings: CrudSettings = match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => toml::from_str(&contents)
				.map_err(|e| SettingsError::ParseError(format!("TOML parse error: {}", e)))?,
			Some("json") => serde_json::from_str(&contents)
				.map_err(|e| SettingsError::ParseError(format!("JSON parse error: {}", e)))?,
			_ => {
				return Err(SettingsError::UnsupportedFormat(
					"Supported formats: .toml, .json".to_string(),
				));
			}
		};
		settings.validate()?;
		Ok(settings)
	}

	/// Defaults overridden by `REINHARDT_CRUD_*` environment variables
	pub fn from_env() -> Result<Self, SettingsError> {
		Self::default().with_env_overrides(|key| std::env::var(key).ok())
	}

	/// Apply `REINHARDT_CRUD_*` overrides read through `lookup`
	pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, SettingsError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(mode) = lookup("REINHARDT_CRUD_MUTATION_MODE") {
			self.mutation.default_mode = mode
				.parse()
				.map_err(|e| SettingsError::ParseError(format!("{}", e)))?;
		}
		if let Some(grace) = lookup("REINHARDT_CRUD_GRACE_PERIOD_MS") {
			self.undo.grace_period_ms = grace.trim().parse().map_err(|_| {
				SettingsError::ParseError(format!("Invalid grace period: {}", grace))
			})?;
		}
		if let Some(policy) = lookup("REINHARDT_CRUD_CONFLICT_POLICY") {
			self.undo.conflict_policy = match policy.trim().to_lowercase().as_str() {
				"force_settle" => ConflictPolicy::ForceSettle,
				"reject" => ConflictPolicy::Reject,
				other => {
					return Err(SettingsError::ParseError(format!(
						"Unknown conflict policy: {}",
						other
					)));
				}
			};
		}
		self.validate()?;
		Ok(self)
	}

	/// Validate settings
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.undo.grace_period_ms == 0 {
			return Err(SettingsError::ValidationError(
				"undo.grace_period_ms must be greater than 0".to_string(),
			));
		}
		if self.list.default_per_page == 0 || self.list.max_per_page == 0 {
			return Err(SettingsError::ValidationError(
				"list page sizes must be greater than 0".to_string(),
			));
		}
		if self.list.default_per_page > self.list.max_per_page {
			return Err(SettingsError::ValidationError(format!(
				"list.default_per_page ({}) exceeds list.max_per_page ({})",
				self.list.default_per_page, self.list.max_per_page
			)));
		}
		Ok(())
	}

	pub fn grace_period(&self) -> Duration {
		Duration::from_millis(self.undo.grace_period_ms)
	}

	pub fn with_default_mode(mut self, mode: MutationMode) -> Self {
		self.mutation.default_mode = mode;
		self
	}

	pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
		self.undo.grace_period_ms = u64::try_from(grace_period.as_millis()).unwrap_or(u64::MAX);
		self
	}

	pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
		self.undo.conflict_policy = policy;
		self
	}

	pub fn with_stream_scope(mut self, scope: UndoStreamScope) -> Self {
		self.undo.stream_scope = scope;
		self
	}

	pub fn with_notify_on_undoable_success(mut self, notify: bool) -> Self {
		self.notifications.notify_on_undoable_success = notify;
		self
	}

	pub fn with_notify_on_undo(mut self, notify: bool) -> Self {
		self.notifications.notify_on_undo = notify;
		self
	}

	pub fn with_per_page(mut self, default_per_page: u64, max_per_page: u64) -> Self {
		self.list.default_per_page = default_per_page;
		self.list.max_per_page = max_per_page;
		self
	}

	/// Clamp a requested page size to the configured bounds
	pub fn clamp_per_page(&self, per_page: u64) -> u64 {
		per_page.clamp(1, self.list.max_per_page.max(1))
	}
}

/// Settings error
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("File error: {0}")]
	FileError(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Unsupported format: {0}")]
	UnsupportedFormat(String),
}
