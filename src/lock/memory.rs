//! In-process [`LockProvider`] for single-instance deployments and tests.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{
	_prelude::*,
	lock::{LockFuture, LockHandle, LockProvider},
};

/// Async mutex with timeout-bounded acquisition; outstanding guards are parked by lease id.
#[derive(Debug)]
pub struct MemoryLock {
	resource: String,
	gate: Arc<AsyncMutex<()>>,
	held: Mutex<HashMap<String, MutexGuardArc<()>>>,
	next_lease: AtomicU64,
}
impl MemoryLock {
	/// Creates an unlocked lock for `resource`.
	pub fn new(resource: impl Into<String>) -> Self {
		Self {
			resource: resource.into(),
			gate: Arc::new(AsyncMutex::new(())),
			held: Mutex::new(HashMap::new()),
			next_lease: AtomicU64::new(1),
		}
	}
}
impl Default for MemoryLock {
	fn default() -> Self {
		Self::new("token-state")
	}
}
impl LockProvider for MemoryLock {
	fn acquire(&self, timeout: Duration) -> LockFuture<'_, Option<LockHandle>> {
		Box::pin(async move {
			let guard = tokio::time::timeout(timeout.unsigned_abs(), self.gate.lock_arc()).await.ok()?;
			let lease_id = format!("memory-{}", self.next_lease.fetch_add(1, Ordering::Relaxed));

			self.held.lock().insert(lease_id.clone(), guard);

			Some(LockHandle { resource: self.resource.clone(), lease_id })
		})
	}

	fn release(&self, handle: LockHandle) -> LockFuture<'_, ()> {
		let guard = self.held.lock().remove(&handle.lease_id);

		drop(guard);

		Box::pin(async {})
	}
}
