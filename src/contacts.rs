//! Paginated client for the upstream contacts API.

// crates.io
use reqwest::header::{ACCEPT, AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransientError, TransportError},
	http,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Page size used by the relay unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Aggregated contacts, serialized as `{"contacts": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactSet {
	/// Opaque contact records in upstream order.
	pub contacts: Vec<Value>,
}

#[derive(Deserialize)]
struct ContactPage {
	#[serde(default)]
	value: Vec<Value>,
}

/// Reqwest-backed client for `GET API_URL?limit=N&offset=M`.
#[derive(Clone)]
pub struct ContactsClient {
	http: ReqwestClient,
	api_url: Url,
	api_key: TokenSecret,
}
impl ContactsClient {
	/// Creates a client for `api_url` sending `api_key` as `x-api-key`.
	pub fn new(http: ReqwestClient, api_url: Url, api_key: impl Into<TokenSecret>) -> Self {
		Self { http, api_url, api_key: api_key.into() }
	}

	/// Fetches every page and concatenates the records in order.
	///
	/// Paging stops at the first page holding fewer than `page_size` records, so a full final
	/// page costs one extra (empty) request. A 401 yields [`Error::AuthExpired`]; any other
	/// non-success status yields [`Error::Upstream`].
	pub async fn fetch_all(&self, access_token: &TokenSecret, page_size: usize) -> Result<Vec<Value>> {
		const KIND: FlowKind = FlowKind::Contacts;

		let span = FlowSpan::new(KIND, "fetch_all");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.fetch_pages(access_token, page_size)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn fetch_pages(&self, access_token: &TokenSecret, page_size: usize) -> Result<Vec<Value>> {
		if page_size == 0 {
			return Err(ConfigError::InvalidPageSize.into());
		}

		let mut contacts = Vec::new();
		let mut offset = 0;

		loop {
			let page = self.fetch_page(access_token, page_size, offset).await?;
			let received = page.len();

			obs::record_contacts_page(received);
			contacts.extend(page);

			if received < page_size {
				break;
			}

			offset += page_size;
		}

		tracing::info!(total = contacts.len(), "Fetched all contacts.");

		Ok(contacts)
	}

	async fn fetch_page(
		&self,
		access_token: &TokenSecret,
		limit: usize,
		offset: usize,
	) -> Result<Vec<Value>> {
		let response = self
			.http
			.get(self.api_url.clone())
			.query(&[("limit", limit), ("offset", offset)])
			.header("x-api-key", self.api_key.expose())
			.header(AUTHORIZATION, format!("Bearer {}", access_token.expose()))
			.header(ACCEPT, "application/json")
			.send()
			.await
			.map_err(|e| TransportError::network("the contacts API", e))?;
		let status = response.status();

		tracing::info!(offset, status = status.as_u16(), "Fetching contacts.");

		if status == StatusCode::UNAUTHORIZED {
			return Err(Error::AuthExpired);
		}

		let body =
			response.bytes().await.map_err(|e| TransportError::network("the contacts API", e))?;

		if !status.is_success() {
			return Err(Error::Upstream { status: status.as_u16(), body: http::body_preview(&body) });
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&body);
		let page: ContactPage = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| TransientError::ContactsResponseParse { source, offset })?;

		Ok(page.value)
	}
}
impl Debug for ContactsClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ContactsClient")
			.field("api_url", &self.api_url.as_str())
			.field("api_key", &self.api_key)
			.finish()
	}
}
