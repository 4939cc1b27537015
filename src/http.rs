//! Shared HTTP client construction and response helpers.

// crates.io
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

const BODY_PREVIEW_LIMIT: usize = 2_048;

/// Builds the reqwest client shared by the token, contacts, and blob layers.
///
/// Redirects are not followed.
pub fn build_client(timeout: Duration) -> Result<ReqwestClient, ConfigError> {
	ReqwestClient::builder()
		.timeout(timeout.unsigned_abs())
		.redirect(Policy::none())
		.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
		.build()
		.map_err(ConfigError::http_client_build)
}

/// Renders an upstream response body for error messages, truncated on a char boundary.
pub fn body_preview(body: &[u8]) -> String {
	let mut text = String::from_utf8_lossy(body).into_owned();

	if text.len() > BODY_PREVIEW_LIMIT {
		let cut =
			(0..=BODY_PREVIEW_LIMIT).rev().find(|idx| text.is_char_boundary(*idx)).unwrap_or(0);

		text.truncate(cut);
		text.push('…');
	}

	text
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn short_bodies_are_kept_verbatim() {
		assert_eq!(body_preview(b"{\"error\":\"invalid_grant\"}"), "{\"error\":\"invalid_grant\"}");
	}

	#[test]
	fn long_bodies_are_truncated() {
		let body = "é".repeat(BODY_PREVIEW_LIMIT);
		let preview = body_preview(body.as_bytes());

		assert!(preview.len() <= BODY_PREVIEW_LIMIT + '…'.len_utf8());
		assert!(preview.ends_with('…'));
	}

	#[test]
	fn client_builds_with_timeout() {
		assert!(build_client(Duration::seconds(5)).is_ok());
	}
}
