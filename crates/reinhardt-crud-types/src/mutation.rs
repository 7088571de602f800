//! Mutation requests accepted by the mutation coordinator

use crate::record::{Record, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a mutation changes or removes its target records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
	Update,
	Delete,
}

impl MutationKind {
	/// Past-tense verb used in notification arguments
	pub fn as_past_tense(&self) -> &'static str {
		match self {
			MutationKind::Update => "updated",
			MutationKind::Delete => "deleted",
		}
	}
}

/// A mutation against one or several records of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MutationAction {
	/// Patch a single record
	Update {
		id: RecordId,
		data: Record,
		previous_data: Option<Record>,
	},
	/// Apply the same patch to several records
	UpdateMany { ids: Vec<RecordId>, data: Record },
	/// Remove a single record
	Delete {
		id: RecordId,
		previous_data: Option<Record>,
	},
	/// Remove several records
	DeleteMany { ids: Vec<RecordId> },
}

impl MutationAction {
	/// Target identifiers of the action
	pub fn ids(&self) -> Vec<RecordId> {
		match self {
			MutationAction::Update { id, .. } | MutationAction::Delete { id, .. } => {
				vec![id.clone()]
			}
			MutationAction::UpdateMany { ids, .. } | MutationAction::DeleteMany { ids } => {
				ids.clone()
			}
		}
	}

	/// Whether the action updates or deletes
	pub fn kind(&self) -> MutationKind {
		match self {
			MutationAction::Update { .. } | MutationAction::UpdateMany { .. } => {
				MutationKind::Update
			}
			MutationAction::Delete { .. } | MutationAction::DeleteMany { .. } => {
				MutationKind::Delete
			}
		}
	}

	/// Whether the action targets several records
	pub fn is_bulk(&self) -> bool {
		matches!(
			self,
			MutationAction::UpdateMany { .. } | MutationAction::DeleteMany { .. }
		)
	}
}

/// Full mutation request: target resource, action and side-channel metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationParams {
	pub resource: String,
	pub action: MutationAction,
	/// Opaque metadata forwarded to the data provider
	#[serde(skip_serializing_if = "Option::is_none")]
	pub meta: Option<Value>,
}

impl MutationParams {
	/// Create mutation parameters without metadata
	pub fn new(resource: impl Into<String>, action: MutationAction) -> Self {
		Self {
			resource: resource.into(),
			action,
			meta: None,
		}
	}

	/// Attach provider metadata
	pub fn with_meta(mut self, meta: Value) -> Self {
		self.meta = Some(meta);
		self
	}
}
