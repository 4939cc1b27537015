//! Thread-safe in-memory [`TokenStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::TokenState,
	store::{StoreError, StoreFuture, TokenStore},
};

/// Keeps the token state in-process; every clone shares the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<TokenState>>);
impl MemoryStore {
	/// Creates a store seeded with `state`.
	pub fn with_state(state: TokenState) -> Self {
		Self(Arc::new(RwLock::new(state)))
	}

	/// Returns a copy of the current state without going through the async contract.
	pub fn snapshot(&self) -> TokenState {
		self.0.read().clone()
	}
}
impl TokenStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, TokenState> {
		let state = self.snapshot();

		Box::pin(async move { state })
	}

	fn save(&self, state: TokenState) -> StoreFuture<'_, Result<(), StoreError>> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = state;

			Ok(())
		})
	}
}
