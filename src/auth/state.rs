//! Persisted token state shared by every relay instance.

// crates.io
use serde::Deserializer;
// self
use crate::{_prelude::*, auth::TokenSecret, error::TransientError};

/// Seconds subtracted from the provider's `expires_in` before persisting `expires_at`.
pub const EXPIRY_SAFETY_MARGIN: Duration = Duration::seconds(60);

/// Token state persisted as a single JSON object.
///
/// `expires_at` is stored in whole seconds since the Unix epoch and already includes the
/// [`EXPIRY_SAFETY_MARGIN`]. Unknown fields written by older relays are ignored on load.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
	/// Bearer credential for the contacts API.
	#[serde(default)]
	pub access_token: Option<TokenSecret>,
	/// Unix timestamp after which `access_token` must be treated as invalid.
	#[serde(default, deserialize_with = "deserialize_epoch_seconds")]
	pub expires_at: i64,
	/// Refresh credential, rotated whenever the provider issues a new one.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
}
impl TokenState {
	/// Returns the cached access token if it is present, non-empty, and unexpired at `now`.
	pub fn valid_access_token_at(&self, now: OffsetDateTime) -> Option<&TokenSecret> {
		self.access_token
			.as_ref()
			.filter(|token| !token.is_empty() && self.expires_at > now.unix_timestamp())
	}

	/// Returns `true` if the cached access token can be served at `now`.
	pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
		self.valid_access_token_at(now).is_some()
	}

	/// Returns the persisted refresh token, ignoring empty values.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref().filter(|token| !token.is_empty())
	}

	/// Records a successful exchange performed at `now`.
	///
	/// The refresh token only changes when the provider rotated it; otherwise `used_refresh` is
	/// kept so later refreshes do not fall back to a stale configured value.
	///
	/// When `expires_in` pushes the expiry outside the representable range, the refresh token is
	/// still recorded, the access token is cleared, and the lifetime is reported as an error.
	pub fn apply_refresh(
		&mut self,
		now: OffsetDateTime,
		access_token: TokenSecret,
		expires_in: Duration,
		rotated_refresh: Option<TokenSecret>,
		used_refresh: TokenSecret,
	) -> Result<(), TransientError> {
		self.refresh_token = Some(rotated_refresh.unwrap_or(used_refresh));

		let Some(expires_at) = now
			.checked_add(expires_in)
			.and_then(|at| at.checked_sub(EXPIRY_SAFETY_MARGIN))
		else {
			self.access_token = None;
			self.expires_at = 0;

			return Err(TransientError::InvalidExpiresIn { expires_in: expires_in.whole_seconds() });
		};

		self.access_token = Some(access_token);
		self.expires_at = expires_at.unix_timestamp();

		Ok(())
	}
}
impl Debug for TokenState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenState")
			.field("access_token_set", &self.access_token.is_some())
			.field("expires_at", &self.expires_at)
			.field("refresh_token_set", &self.refresh_token.is_some())
			.finish()
	}
}

// Older writers stored fractional seconds.
fn deserialize_epoch_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: Deserializer<'de>,
{
	let value = <Option<f64>>::deserialize(deserializer)?;

	Ok(value.filter(|secs| secs.is_finite()).map(|secs| secs.floor() as i64).unwrap_or_default())
}
