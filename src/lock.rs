//! Best-effort distributed locks that serialize token refreshes across instances.
//!
//! Acquisition is optional-return: a provider that cannot grant the lock within the timeout (or
//! whose backing service is unavailable) yields `None`, and callers continue without mutual
//! exclusion. Release never fails; an abandoned lease expires on its own.

pub mod blob;
pub mod memory;

pub use blob::BlobLeaseLock;
pub use memory::MemoryLock;

// self
use crate::_prelude::*;

/// Boxed future returned by [`LockProvider`] operations.
pub type LockFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// Proof of a held lease.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LockHandle {
	/// Name of the locked resource.
	pub resource: String,
	/// Provider-issued lease identifier.
	pub lease_id: String,
}

/// Timeout-bounded lease over one named resource.
pub trait LockProvider
where
	Self: Send + Sync,
{
	/// Waits up to `timeout` for the lease; `None` means "proceed without the lock".
	fn acquire(&self, timeout: Duration) -> LockFuture<'_, Option<LockHandle>>;

	/// Releases a lease. Idempotent; failures are logged and swallowed.
	fn release(&self, handle: LockHandle) -> LockFuture<'_, ()>;
}

/// Scoped acquisition that guarantees the lease is handed back.
///
/// Call [`LockScope::release`] on every path that completes normally. When the scope is dropped
/// while still holding a lease (the surrounding future was cancelled), release is spawned on the
/// current Tokio runtime instead.
pub struct LockScope {
	provider: Arc<dyn LockProvider>,
	handle: Option<LockHandle>,
}
impl LockScope {
	/// Acquires the provider's lease, returning a scope that may or may not hold it.
	pub async fn acquire(provider: Arc<dyn LockProvider>, timeout: Duration) -> Self {
		let handle = provider.acquire(timeout).await;

		Self { provider, handle }
	}

	/// Returns `true` when the lease was granted.
	pub fn is_held(&self) -> bool {
		self.handle.is_some()
	}

	/// Releases the lease, if any.
	pub async fn release(mut self) {
		if let Some(handle) = self.handle.take() {
			self.provider.release(handle).await;
		}
	}
}
impl Drop for LockScope {
	fn drop(&mut self) {
		let Some(handle) = self.handle.take() else {
			return;
		};

		match tokio::runtime::Handle::try_current() {
			Ok(runtime) => {
				let provider = self.provider.clone();

				runtime.spawn(async move { provider.release(handle).await });
			},
			Err(_) => tracing::warn!(
				resource = %handle.resource,
				"Lock scope dropped outside a runtime; the lease will expire on its own."
			),
		}
	}
}
impl Debug for LockScope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LockScope").field("handle", &self.handle).finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[derive(Default)]
	struct CountingLock {
		released: AtomicUsize,
	}
	impl LockProvider for CountingLock {
		fn acquire(&self, _timeout: Duration) -> LockFuture<'_, Option<LockHandle>> {
			Box::pin(async {
				Some(LockHandle { resource: "counting".into(), lease_id: "lease-1".into() })
			})
		}

		fn release(&self, _handle: LockHandle) -> LockFuture<'_, ()> {
			self.released.fetch_add(1, Ordering::SeqCst);

			Box::pin(async {})
		}
	}

	#[tokio::test]
	async fn explicit_release_hands_back_once() {
		let lock = Arc::new(CountingLock::default());
		let scope = LockScope::acquire(lock.clone(), Duration::seconds(1)).await;

		assert!(scope.is_held());

		scope.release().await;

		assert_eq!(lock.released.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn dropped_scope_releases_in_background() {
		let lock = Arc::new(CountingLock::default());
		let scope = LockScope::acquire(lock.clone(), Duration::seconds(1)).await;

		drop(scope);
		tokio::task::yield_now().await;

		for _ in 0..10 {
			if lock.released.load(Ordering::SeqCst) == 1 {
				break;
			}

			tokio::time::sleep(std::time::Duration::from_millis(10)).await;
		}

		assert_eq!(lock.released.load(Ordering::SeqCst), 1);
	}
}
