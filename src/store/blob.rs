//! Azure Blob Storage backed [`TokenStore`] shared by every relay instance.

// self
use crate::{
	_prelude::*,
	auth::TokenState,
	blob::{BlobClient, BlobError},
	store::{self, StoreError, StoreFuture, TokenStore},
};

/// Stores the token state as a JSON block blob.
#[derive(Clone, Debug)]
pub struct BlobStore {
	client: BlobClient,
	container: String,
	blob: String,
}
impl BlobStore {
	/// Creates a store for `container/blob`.
	pub fn new(client: BlobClient, container: impl Into<String>, blob: impl Into<String>) -> Self {
		Self { client, container: container.into(), blob: blob.into() }
	}

	async fn read_state(&self) -> Result<TokenState, StoreError> {
		match self.client.get_blob(&self.container, &self.blob).await.map_err(backend_error)? {
			Some(bytes) => store::decode_state(&bytes),
			None => Ok(TokenState::default()),
		}
	}

	async fn write_state(&self, state: &TokenState) -> Result<(), StoreError> {
		let body = store::encode_state(state)?;

		match self
			.client
			.put_blob(&self.container, &self.blob, body.clone(), "application/json", false)
			.await
		{
			Ok(_) => Ok(()),
			Err(e) if e.code() == Some("ContainerNotFound") => {
				tracing::info!(container = %self.container, "Creating token state container.");

				self.client.create_container(&self.container).await.map_err(backend_error)?;
				self.client
					.put_blob(&self.container, &self.blob, body, "application/json", false)
					.await
					.map(|_| ())
					.map_err(backend_error)
			},
			Err(e) => Err(backend_error(e)),
		}
	}
}
impl TokenStore for BlobStore {
	fn load(&self) -> StoreFuture<'_, TokenState> {
		Box::pin(async move {
			self.read_state().await.unwrap_or_else(|e| {
				tracing::warn!(
					container = %self.container,
					blob = %self.blob,
					error = %e,
					"Treating unreadable token state blob as empty."
				);

				TokenState::default()
			})
		})
	}

	fn save(&self, state: TokenState) -> StoreFuture<'_, Result<(), StoreError>> {
		Box::pin(async move { self.write_state(&state).await })
	}
}

fn backend_error(e: BlobError) -> StoreError {
	StoreError::Backend { message: e.to_string() }
}
