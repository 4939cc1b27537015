// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for access-token requests.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	requests: AtomicU64,
	cache_hits: AtomicU64,
	exchanges: AtomicU64,
	failures: AtomicU64,
	unlocked: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the total number of access-token requests.
	pub fn requests(&self) -> u64 {
		self.requests.load(Ordering::Relaxed)
	}

	/// Returns how many requests were served from the stored state (with or without the lease).
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns how many refresh exchanges were attempted against the token endpoint.
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Returns the number of failed requests.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns how many refresh attempts proceeded without the lease.
	pub fn unlocked(&self) -> u64 {
		self.unlocked.load(Ordering::Relaxed)
	}

	pub(crate) fn record_request(&self) {
		self.requests.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_exchange(&self) {
		self.exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_unlocked(&self) {
		self.unlocked.fetch_add(1, Ordering::Relaxed);
	}
}
