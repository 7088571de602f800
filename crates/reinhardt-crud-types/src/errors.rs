//! Error types for the controller layer

use serde_json::Value;
use thiserror::Error;

/// Error reported by a data provider
///
/// Providers are free to shape their failures however they like; the
/// controller layer only relies on the `message`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ProviderError {
	/// Human readable message
	pub message: String,
	/// HTTP-like status code, if the provider has one
	pub status: Option<u16>,
	/// Provider-specific error payload
	pub body: Option<Value>,
}

impl ProviderError {
	/// Create a provider error with a message
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			status: None,
			body: None,
		}
	}

	/// Attach a status code
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);
		self
	}

	/// Attach a provider-specific payload
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);
		self
	}

	/// Error for a record that does not exist
	pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
		Self::new(format!("{} with id {} not found", resource, id)).with_status(404)
	}
}

/// Result type returned by data providers
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Discriminant of [`ControllerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	InvalidMutationRequest,
	ProviderFailure,
	QueueConflict,
	QueueDisposed,
}

/// Controller layer error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
	/// Precondition failure (caller bug), raised before any cache write
	#[error("Invalid mutation request: {0}")]
	InvalidMutationRequest(String),

	/// The data provider rejected the call
	#[error("Provider failure: {message}")]
	ProviderFailure {
		message: String,
		#[source]
		source: ProviderError,
	},

	/// An enqueue collided with a live entry under the reject policy
	#[error("Undo queue conflict: {0}")]
	QueueConflict(String),

	/// The undo queue no longer accepts entries
	#[error("Undo queue has been disposed")]
	QueueDisposed,
}

impl ControllerError {
	/// Kind of the error
	pub fn kind(&self) -> ErrorKind {
		match self {
			ControllerError::InvalidMutationRequest(_) => ErrorKind::InvalidMutationRequest,
			ControllerError::ProviderFailure { .. } => ErrorKind::ProviderFailure,
			ControllerError::QueueConflict(_) => ErrorKind::QueueConflict,
			ControllerError::QueueDisposed => ErrorKind::QueueDisposed,
		}
	}

	/// Shorthand for an invalid request
	pub fn invalid(msg: impl Into<String>) -> Self {
		ControllerError::InvalidMutationRequest(msg.into())
	}
}

impl From<ProviderError> for ControllerError {
	fn from(err: ProviderError) -> Self {
		ControllerError::ProviderFailure {
			message: err.message.clone(),
			source: err,
		}
	}
}

/// Result type for controller operations
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Error returned when parsing an unknown mutation mode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown mutation mode: {0}")]
pub struct ParseMutationModeError(pub String);

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::error::Error as _;

	#[rstest]
	fn test_provider_error_converts_to_provider_failure() {
		let provider_err = ProviderError::new("Network down").with_status(503);
		let err: ControllerError = provider_err.clone().into();

		assert_eq!(err.kind(), ErrorKind::ProviderFailure);
		assert_eq!(err.to_string(), "Provider failure: Network down");
		match &err {
			ControllerError::ProviderFailure { source, .. } => {
				assert_eq!(source, &provider_err);
				assert_eq!(source.status, Some(503));
			}
			_ => panic!("Expected ProviderFailure"),
		}
		assert!(err.source().is_some());
	}

	#[rstest]
	#[case(ControllerError::invalid("missing id"), ErrorKind::InvalidMutationRequest)]
	#[case(ControllerError::QueueConflict("posts:1".into()), ErrorKind::QueueConflict)]
	#[case(ControllerError::QueueDisposed, ErrorKind::QueueDisposed)]
	fn test_error_kind(#[case] err: ControllerError, #[case] expected: ErrorKind) {
		assert_eq!(err.kind(), expected);
	}

	#[rstest]
	fn test_not_found_sets_status() {
		let err = ProviderError::not_found("posts", 9);

		assert_eq!(err.status, Some(404));
		assert_eq!(err.message, "posts with id 9 not found");
	}
}
