//! Request-level orchestration: token resolution, contact paging, and the reauth retry.
//!
//! The retry policy is a small state machine. A fetch starts in [`FetchState::Fetching`]; the
//! first [`Error::AuthExpired`] moves it to [`FetchState::RetryingAfterReauth`], which forces a
//! token refresh before fetching again. Any error in that state, including a second
//! `AuthExpired`, is final.

// self
use crate::{
	_prelude::*,
	contacts::{ContactSet, ContactsClient, DEFAULT_PAGE_SIZE},
	flows::TokenManager,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Position of a relay invocation in the reauth retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchState {
	/// First attempt with the cached (or freshly refreshed) token.
	Fetching,
	/// Upstream rejected the first token; this attempt runs with a forced refresh.
	RetryingAfterReauth,
}
impl FetchState {
	fn force_refresh(self) -> bool {
		matches!(self, Self::RetryingAfterReauth)
	}

	/// Returns the next state for a failed attempt, or `None` when the error is final.
	fn on_error(self, error: &Error) -> Option<Self> {
		match (self, error) {
			(Self::Fetching, Error::AuthExpired) => Some(Self::RetryingAfterReauth),
			_ => None,
		}
	}
}

/// HTTP-agnostic response produced for every invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayResponse {
	/// HTTP status code.
	pub status: u16,
	/// JSON body.
	pub body: Value,
}
impl RelayResponse {
	/// Builds the response for a relay outcome.
	pub fn from_result(result: Result<ContactSet>) -> Self {
		match result {
			Ok(set) => Self { status: 200, body: serde_json::json!({ "contacts": set.contacts }) },
			Err(e) => {
				let status = if e.is_upstream() { 502 } else { 500 };

				Self { status, body: serde_json::json!({ "error": e.to_string() }) }
			},
		}
	}
}

/// Serves one contacts request per call; safe to share across concurrent invocations.
#[derive(Clone, Debug)]
pub struct ContactsRelay {
	tokens: TokenManager,
	contacts: ContactsClient,
	page_size: usize,
}
impl ContactsRelay {
	/// Creates a relay with the default page size.
	pub fn new(tokens: TokenManager, contacts: ContactsClient) -> Self {
		Self { tokens, contacts, page_size: DEFAULT_PAGE_SIZE }
	}

	/// Overrides the contacts page size.
	pub fn with_page_size(mut self, page_size: usize) -> Self {
		self.page_size = page_size;

		self
	}

	/// Returns the token manager backing this relay.
	pub fn tokens(&self) -> &TokenManager {
		&self.tokens
	}

	/// Fetches every contact, retrying once with a forced refresh when upstream answers 401.
	pub async fn fetch_contacts(&self) -> Result<ContactSet> {
		const KIND: FlowKind = FlowKind::Relay;

		let span = FlowSpan::new(KIND, "fetch_contacts");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.run()).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Runs [`ContactsRelay::fetch_contacts`] and maps the outcome to a response; never fails.
	pub async fn respond(&self) -> RelayResponse {
		let result = self.fetch_contacts().await;

		if let Err(e) = &result {
			tracing::error!(error = %e, upstream = e.is_upstream(), "Contacts relay failed.");
		}

		RelayResponse::from_result(result)
	}

	async fn run(&self) -> Result<ContactSet> {
		let mut state = FetchState::Fetching;

		loop {
			let outcome = self.attempt(state).await;

			match outcome {
				Ok(contacts) => return Ok(ContactSet { contacts }),
				Err(e) => match state.on_error(&e) {
					Some(next) => {
						tracing::warn!("Upstream rejected the access token; forcing a refresh.");

						state = next;
					},
					None => return Err(e),
				},
			}
		}
	}

	async fn attempt(&self, state: FetchState) -> Result<Vec<Value>> {
		let token = self.tokens.valid_access_token(state.force_refresh()).await?;

		self.contacts.fetch_all(&token, self.page_size).await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ConfigError;

	#[test]
	fn only_the_first_auth_expiry_is_retried() {
		assert_eq!(
			FetchState::Fetching.on_error(&Error::AuthExpired),
			Some(FetchState::RetryingAfterReauth)
		);
		assert_eq!(FetchState::RetryingAfterReauth.on_error(&Error::AuthExpired), None);
		assert_eq!(
			FetchState::Fetching.on_error(&Error::Upstream { status: 500, body: String::new() }),
			None
		);
		assert!(!FetchState::Fetching.force_refresh());
		assert!(FetchState::RetryingAfterReauth.force_refresh());
	}

	#[test]
	fn responses_map_success_and_error_classes() {
		let ok = RelayResponse::from_result(Ok(ContactSet {
			contacts: vec![serde_json::json!({ "id": 1 })],
		}));

		assert_eq!(ok.status, 200);
		assert_eq!(ok.body, serde_json::json!({ "contacts": [{ "id": 1 }] }));

		let upstream = RelayResponse::from_result(Err(Error::Upstream {
			status: 503,
			body: "unavailable".into(),
		}));

		assert_eq!(upstream.status, 502);
		assert_eq!(upstream.body, serde_json::json!({ "error": "Upstream error 503: unavailable" }));

		let internal = RelayResponse::from_result(Err(Error::NoRefreshToken));

		assert_eq!(internal.status, 500);

		let config = RelayResponse::from_result(Err(ConfigError::InvalidPageSize.into()));

		assert_eq!(config.status, 500);
	}
}
