//! Storage contracts and built-in backends for the shared token state.

pub mod blob;
pub mod file;
pub mod memory;

pub use blob::BlobStore;
pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenState};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// Durable home of the [`TokenState`] shared across relay instances.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Loads the current state.
	///
	/// Missing, empty, or unreadable backing data yields [`TokenState::default`]; this call never
	/// fails so a broken store degrades into a refresh instead of an outage.
	fn load(&self) -> StoreFuture<'_, TokenState>;

	/// Overwrites the stored state (last writer wins).
	fn save(&self, state: TokenState) -> StoreFuture<'_, Result<(), StoreError>>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Decodes a stored payload, treating empty input as an empty state.
pub(crate) fn decode_state(bytes: &[u8]) -> Result<TokenState, StoreError> {
	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(TokenState::default());
	}

	serde_json::from_slice(bytes)
		.map_err(|e| StoreError::Serialization { message: format!("Failed to parse token state: {e}") })
}

/// Encodes a state for persistence.
pub(crate) fn encode_state(state: &TokenState) -> Result<Vec<u8>, StoreError> {
	serde_json::to_vec(state).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize token state: {e}"),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use std::error::Error as StdError;

	#[test]
	fn store_error_converts_into_relay_error_with_source() {
		let store_error = StoreError::Backend { message: "container unreachable".into() };
		let relay_error: Error = store_error.clone().into();

		assert!(matches!(relay_error, Error::Storage(_)));
		assert!(relay_error.to_string().contains("container unreachable"));

		let source = StdError::source(&relay_error)
			.expect("Relay error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn blank_payload_decodes_to_empty_state() {
		assert_eq!(decode_state(b"").expect("Empty payload should decode."), TokenState::default());
		assert_eq!(
			decode_state(b"  \n").expect("Whitespace payload should decode."),
			TokenState::default()
		);
	}

	#[test]
	fn corrupt_payload_reports_serialization_error() {
		let err = decode_state(b"{not json").expect_err("Corrupt payload should be rejected.");

		assert!(matches!(err, StoreError::Serialization { .. }));
	}
}
