//! Token orchestration: cached reads, lease-guarded refreshes, and refresh-token rotation.

pub mod refresh;

pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	lock::LockProvider,
	oauth::TokenRefresher,
	store::TokenStore,
};

/// Produces currently-valid access tokens for the contacts API.
///
/// The manager owns the token store, the distributed lock, and the refresher so a single call to
/// [`TokenManager::valid_access_token`] can serve the cached token or coordinate a refresh with
/// every other instance sharing the same store. All collaborators are injected; the manager keeps
/// no process-wide state of its own.
#[derive(Clone)]
pub struct TokenManager {
	/// Durable home of the shared token state.
	pub store: Arc<dyn TokenStore>,
	/// Lease that serializes refreshes across instances.
	pub lock: Arc<dyn LockProvider>,
	/// Token endpoint client.
	pub refresher: Arc<dyn TokenRefresher>,
	/// Refresh token used when the stored state does not hold one.
	pub fallback_refresh_token: Option<TokenSecret>,
	/// How long to wait for the refresh lease before refreshing without it.
	pub lock_timeout: Duration,
	/// Counters describing cache hits and refresh exchanges.
	pub refresh_metrics: Arc<RefreshMetrics>,
}
impl TokenManager {
	/// Lease wait used unless overridden.
	pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::seconds(15);

	/// Creates a manager with no fallback refresh token and the default lock timeout.
	pub fn new(
		store: Arc<dyn TokenStore>,
		lock: Arc<dyn LockProvider>,
		refresher: Arc<dyn TokenRefresher>,
	) -> Self {
		Self {
			store,
			lock,
			refresher,
			fallback_refresh_token: None,
			lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
			refresh_metrics: Default::default(),
		}
	}

	/// Sets the configured refresh token used before any rotation has been persisted.
	pub fn with_fallback_refresh_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.fallback_refresh_token = Some(token.into()).filter(|token| !token.is_empty());

		self
	}

	/// Overrides the lease wait (negative values are treated as zero).
	pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
		self.lock_timeout = if timeout.is_negative() { Duration::ZERO } else { timeout };

		self
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("fallback_refresh_token_set", &self.fallback_refresh_token.is_some())
			.field("lock_timeout", &self.lock_timeout)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}
