//! [`LockProvider`] backed by Azure blob leases.
//!
//! The lock blob's content is irrelevant; only its lease matters. A missing blob (or container)
//! is created empty on first use.

// std
use std::time::Duration as StdDuration;
// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	blob::{BlobClient, LeaseAttempt, PutOutcome},
	lock::{LockFuture, LockHandle, LockProvider},
};

/// Lease lock over `container/blob`.
#[derive(Clone, Debug)]
pub struct BlobLeaseLock {
	client: BlobClient,
	container: String,
	blob: String,
	lease_secs: u32,
}
impl BlobLeaseLock {
	/// Default lease duration; Azure accepts 15 to 60 seconds for finite leases.
	pub const DEFAULT_LEASE_SECS: u32 = 60;

	const POLL_MIN_MS: u64 = 250;
	const POLL_MAX_MS: u64 = 750;

	/// Creates a lock over `container/blob` with the default lease duration.
	pub fn new(client: BlobClient, container: impl Into<String>, blob: impl Into<String>) -> Self {
		Self {
			client,
			container: container.into(),
			blob: blob.into(),
			lease_secs: Self::DEFAULT_LEASE_SECS,
		}
	}

	/// Overrides the lease duration, clamped to the service's 15-60 second window.
	pub fn with_lease_secs(mut self, secs: u32) -> Self {
		self.lease_secs = secs.clamp(15, 60);

		self
	}

	fn resource(&self) -> String {
		format!("{}/{}", self.container, self.blob)
	}

	async fn create_lock_blob(&self) -> bool {
		if let Err(e) = self.client.create_container(&self.container).await {
			tracing::warn!(container = %self.container, error = %e, "Failed to create lock container.");

			return false;
		}

		match self.client.put_blob(&self.container, &self.blob, Vec::new(), "text/plain", true).await {
			Ok(PutOutcome::Written) => {
				tracing::info!(resource = %self.resource(), "Created lock blob.");

				true
			},
			Ok(PutOutcome::AlreadyExists) => true,
			Err(e) => {
				tracing::warn!(resource = %self.resource(), error = %e, "Failed to create lock blob.");

				false
			},
		}
	}

	async fn acquire_within(&self, timeout: Duration) -> Option<LockHandle> {
		let Some(deadline) = OffsetDateTime::now_utc().checked_add(timeout) else {
			tracing::warn!(
				resource = %self.resource(),
				timeout_secs = timeout.whole_seconds(),
				"Lease timeout is out of range; proceeding without the lock."
			);

			return None;
		};
		let mut created = false;

		loop {
			match self.client.acquire_lease(&self.container, &self.blob, self.lease_secs).await {
				Ok(LeaseAttempt::Acquired(lease_id)) =>
					return Some(LockHandle { resource: self.resource(), lease_id }),
				Ok(LeaseAttempt::Missing) if !created => {
					created = true;

					if !self.create_lock_blob().await {
						return None;
					}

					continue;
				},
				Ok(LeaseAttempt::Missing) => {
					tracing::warn!(resource = %self.resource(), "Lock blob vanished after creation.");

					return None;
				},
				Ok(LeaseAttempt::Held) => {},
				Err(e) => {
					tracing::warn!(resource = %self.resource(), error = %e, "Lease acquisition failed.");

					return None;
				},
			}

			let remaining = deadline - OffsetDateTime::now_utc();

			if !remaining.is_positive() {
				tracing::warn!(
					resource = %self.resource(),
					timeout_secs = timeout.whole_seconds(),
					"Timed out waiting for the refresh lease."
				);

				return None;
			}

			let pause = StdDuration::from_millis(
				rand::rng().random_range(Self::POLL_MIN_MS..=Self::POLL_MAX_MS),
			)
			.min(remaining.unsigned_abs());

			tokio::time::sleep(pause).await;
		}
	}
}
impl LockProvider for BlobLeaseLock {
	fn acquire(&self, timeout: Duration) -> LockFuture<'_, Option<LockHandle>> {
		Box::pin(self.acquire_within(timeout))
	}

	fn release(&self, handle: LockHandle) -> LockFuture<'_, ()> {
		Box::pin(async move {
			if let Err(e) =
				self.client.release_lease(&self.container, &self.blob, &handle.lease_id).await
			{
				tracing::warn!(
					resource = %handle.resource,
					error = %e,
					"Failed to release the refresh lease; it will expire on its own."
				);
			}
		})
	}
}
