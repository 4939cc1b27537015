//! Access-token resolution with double-checked, lease-guarded refreshes.
//!
//! [`TokenManager::valid_access_token`] first serves the stored token when it is still valid.
//! Otherwise it takes the distributed lease, reloads the state (another instance may have
//! refreshed while this one waited), and only then exchanges the refresh token. Rotated refresh
//! tokens are persisted before the lease is released, so the next exchange anywhere uses them.
//! When the lease cannot be obtained the refresh still runs, unsynchronized.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	flows::TokenManager,
	lock::LockScope,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl TokenManager {
	/// Returns a currently-valid access token, refreshing it when needed or when forced.
	///
	/// Fails with [`Error::NoRefreshToken`] when neither the stored state nor the configuration
	/// provides a refresh token, and propagates token-endpoint failures unchanged.
	pub async fn valid_access_token(&self, force_refresh: bool) -> Result<TokenSecret> {
		const KIND: FlowKind = FlowKind::AccessToken;

		let span = FlowSpan::new(KIND, "valid_access_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.resolve_access_token(force_refresh)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn resolve_access_token(&self, force_refresh: bool) -> Result<TokenSecret> {
		self.refresh_metrics.record_request();

		if !force_refresh {
			let state = self.store.load().await;

			if let Some(token) = state.valid_access_token_at(OffsetDateTime::now_utc()) {
				self.refresh_metrics.record_cache_hit();
				tracing::debug!(expires_at = state.expires_at, "Using cached access token.");

				return Ok(token.clone());
			}
		}

		let scope = LockScope::acquire(self.lock.clone(), self.lock_timeout).await;

		if !scope.is_held() {
			self.refresh_metrics.record_unlocked();
			tracing::warn!("Refresh lease unavailable; refreshing without mutual exclusion.");
		}

		let result = self.refresh_under_lease(force_refresh).await;

		scope.release().await;

		result
	}

	async fn refresh_under_lease(&self, force_refresh: bool) -> Result<TokenSecret> {
		let mut state = self.store.load().await;

		if !force_refresh {
			if let Some(token) = state.valid_access_token_at(OffsetDateTime::now_utc()) {
				self.refresh_metrics.record_cache_hit();
				tracing::info!("Access token was refreshed by another instance while waiting.");

				return Ok(token.clone());
			}
		}

		let refresh_token = state
			.refresh_token()
			.or(self.fallback_refresh_token.as_ref())
			.cloned()
			.ok_or_else(|| {
				self.refresh_metrics.record_failure();

				Error::NoRefreshToken
			})?;

		tracing::info!(force_refresh, "Refreshing access token.");
		self.refresh_metrics.record_exchange();

		let grant = self.refresher.exchange(&refresh_token).await.inspect_err(|e| {
			self.refresh_metrics.record_failure();
			tracing::warn!(error = %e, "Refresh token exchange failed.");
		})?;
		let rotated = grant.refresh_token.is_some();
		let applied = state.apply_refresh(
			OffsetDateTime::now_utc(),
			grant.access_token.clone(),
			grant.expires_in,
			grant.refresh_token,
			refresh_token,
		);
		let expires_at = state.expires_at;

		// Saved even when the lifetime was rejected; the refresh token may be rotated.
		if let Err(e) = self.store.save(state).await {
			tracing::error!(error = %e, rotated, "Failed to persist refreshed token state.");
		}
		if let Err(e) = applied {
			self.refresh_metrics.record_failure();
			tracing::warn!(error = %e, rotated, "Token endpoint returned an unusable lifetime.");

			return Err(e.into());
		}

		tracing::info!(rotated, expires_at, "Access token refreshed.");

		Ok(grant.access_token)
	}
}
