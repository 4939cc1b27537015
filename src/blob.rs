//! Minimal Azure Blob Storage REST client: blob reads/writes and blob leases.
//!
//! Only the operations the relay needs are covered. Requests are signed with the account's
//! Shared Key (see [`credential`]) and carry a fixed `x-ms-version`.

pub mod credential;

pub use credential::StorageAccount;

// crates.io
use reqwest::{Method, header::CONTENT_TYPE};
use time::macros::format_description;
// self
use crate::{_prelude::*, blob::credential::CanonicalRequest, http};

/// Storage service version sent with every request.
pub const STORAGE_API_VERSION: &str = "2021-08-06";

/// Failures raised by [`BlobClient`].
#[derive(Debug, ThisError)]
pub enum BlobError {
	/// Network failure while talking to the storage service.
	#[error("Blob storage request failed: {0}")]
	Transport(#[from] ReqwestError),
	/// Storage service answered with an unexpected status.
	#[error("Blob storage returned {status} ({}): {message}", .code.as_deref().unwrap_or("no error code"))]
	Status {
		/// HTTP status code.
		status: u16,
		/// Value of the `x-ms-error-code` header, when present.
		code: Option<String>,
		/// Response body preview.
		message: String,
	},
	/// Request date could not be formatted.
	#[error("Failed to format the request date.")]
	Date(#[from] time::error::Format),
}
impl BlobError {
	/// Returns the `x-ms-error-code` reported by the service, if any.
	pub fn code(&self) -> Option<&str> {
		match self {
			Self::Status { code, .. } => code.as_deref(),
			_ => None,
		}
	}
}

/// Outcome of a conditional blob creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
	/// The blob was written.
	Written,
	/// `If-None-Match: *` was requested and the blob already exists.
	AlreadyExists,
}

/// Outcome of a lease acquisition attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaseAttempt {
	/// Lease granted with the returned lease id.
	Acquired(String),
	/// Another holder owns the lease.
	Held,
	/// The blob (or its container) does not exist yet.
	Missing,
}

/// Signed REST client scoped to one storage account.
#[derive(Clone, Debug)]
pub struct BlobClient {
	http: ReqwestClient,
	account: Arc<StorageAccount>,
}
impl BlobClient {
	/// Creates a client that reuses `http` for every request.
	pub fn new(http: ReqwestClient, account: StorageAccount) -> Self {
		Self { http, account: Arc::new(account) }
	}

	/// Returns the storage account this client signs for.
	pub fn account(&self) -> &StorageAccount {
		&self.account
	}

	/// Downloads a blob; `None` when the blob or container does not exist.
	pub async fn get_blob(&self, container: &str, blob: &str) -> Result<Option<Vec<u8>>, BlobError> {
		let response = self.send(BlobRequest::new(Method::GET, self.blob_url(container, blob))).await?;

		match response.status {
			StatusCode::OK => Ok(Some(response.body)),
			StatusCode::NOT_FOUND => Ok(None),
			_ => Err(response.into_error()),
		}
	}

	/// Uploads `body` as a block blob.
	///
	/// With `only_if_absent`, an existing blob is left untouched and reported as
	/// [`PutOutcome::AlreadyExists`].
	pub async fn put_blob(
		&self,
		container: &str,
		blob: &str,
		body: Vec<u8>,
		content_type: &'static str,
		only_if_absent: bool,
	) -> Result<PutOutcome, BlobError> {
		let mut request = BlobRequest::new(Method::PUT, self.blob_url(container, blob))
			.header("x-ms-blob-type", "BlockBlob")
			.body(body, content_type);

		if only_if_absent {
			request.if_none_match = Some("*");
		}

		let response = self.send(request).await?;

		match response.status {
			StatusCode::CREATED => Ok(PutOutcome::Written),
			StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED if only_if_absent =>
				Ok(PutOutcome::AlreadyExists),
			_ => Err(response.into_error()),
		}
	}

	/// Creates a container; an existing container is not an error.
	pub async fn create_container(&self, container: &str) -> Result<(), BlobError> {
		let mut url = self.container_url(container);

		url.query_pairs_mut().append_pair("restype", "container");

		let response = self.send(BlobRequest::new(Method::PUT, url)).await?;

		match response.status {
			StatusCode::CREATED | StatusCode::CONFLICT => Ok(()),
			_ => Err(response.into_error()),
		}
	}

	/// Tries once to acquire a lease of `duration_secs` on a blob.
	pub async fn acquire_lease(
		&self,
		container: &str,
		blob: &str,
		duration_secs: u32,
	) -> Result<LeaseAttempt, BlobError> {
		let request = BlobRequest::new(Method::PUT, self.lease_url(container, blob))
			.header("x-ms-lease-action", "acquire")
			.header("x-ms-lease-duration", duration_secs.to_string());
		let response = self.send(request).await?;

		match response.status {
			StatusCode::CREATED => match response.lease_id {
				Some(lease_id) => Ok(LeaseAttempt::Acquired(lease_id)),
				None => Err(BlobError::Status {
					status: response.status.as_u16(),
					code: None,
					message: "Lease response did not include x-ms-lease-id.".into(),
				}),
			},
			StatusCode::CONFLICT => Ok(LeaseAttempt::Held),
			StatusCode::NOT_FOUND => Ok(LeaseAttempt::Missing),
			_ => Err(response.into_error()),
		}
	}

	/// Releases a lease previously returned by [`BlobClient::acquire_lease`].
	pub async fn release_lease(
		&self,
		container: &str,
		blob: &str,
		lease_id: &str,
	) -> Result<(), BlobError> {
		let request = BlobRequest::new(Method::PUT, self.lease_url(container, blob))
			.header("x-ms-lease-action", "release")
			.header("x-ms-lease-id", lease_id);
		let response = self.send(request).await?;

		match response.status {
			StatusCode::OK => Ok(()),
			_ => Err(response.into_error()),
		}
	}

	fn container_url(&self, container: &str) -> Url {
		let mut url = self.account.blob_endpoint().clone();

		if let Ok(mut segments) = url.path_segments_mut() {
			segments.pop_if_empty().push(container);
		}

		url
	}

	fn blob_url(&self, container: &str, blob: &str) -> Url {
		let mut url = self.container_url(container);

		if let Ok(mut segments) = url.path_segments_mut() {
			segments.push(blob);
		}

		url
	}

	fn lease_url(&self, container: &str, blob: &str) -> Url {
		let mut url = self.blob_url(container, blob);

		url.query_pairs_mut().append_pair("comp", "lease");

		url
	}

	async fn send(&self, mut request: BlobRequest) -> Result<BlobResponse, BlobError> {
		let date = OffsetDateTime::now_utc().format(format_description!(
			"[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
		))?;

		request.ms_headers.insert("x-ms-date".into(), date);
		request.ms_headers.insert("x-ms-version".into(), STORAGE_API_VERSION.into());

		let authorization = self.account.authorization(&CanonicalRequest {
			method: request.method.as_str(),
			url: &request.url,
			content_length: request.body.len(),
			content_type: request.content_type,
			if_none_match: request.if_none_match,
			ms_headers: &request.ms_headers,
		});
		let mut builder = self
			.http
			.request(request.method.clone(), request.url.clone())
			.header("authorization", authorization);

		for (name, value) in &request.ms_headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if let Some(content_type) = request.content_type {
			builder = builder.header(CONTENT_TYPE, content_type);
		}
		if let Some(condition) = request.if_none_match {
			builder = builder.header("if-none-match", condition);
		}
		if request.method == Method::PUT {
			builder = builder.body(request.body);
		}

		let response = builder.send().await?;
		let status = response.status();
		let header = |name: &str| {
			response.headers().get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
		};
		let code = header("x-ms-error-code");
		let lease_id = header("x-ms-lease-id");
		let body = response.bytes().await?.to_vec();

		tracing::debug!(
			method = %request.method,
			path = request.url.path(),
			status = status.as_u16(),
			code = code.as_deref().unwrap_or_default(),
			"Blob storage request completed."
		);

		Ok(BlobResponse { status, code, lease_id, body })
	}
}

struct BlobRequest {
	method: Method,
	url: Url,
	ms_headers: BTreeMap<String, String>,
	body: Vec<u8>,
	content_type: Option<&'static str>,
	if_none_match: Option<&'static str>,
}
impl BlobRequest {
	fn new(method: Method, url: Url) -> Self {
		Self {
			method,
			url,
			ms_headers: BTreeMap::new(),
			body: Vec::new(),
			content_type: None,
			if_none_match: None,
		}
	}

	fn header(mut self, name: &str, value: impl Into<String>) -> Self {
		self.ms_headers.insert(name.to_ascii_lowercase(), value.into());

		self
	}

	fn body(mut self, body: Vec<u8>, content_type: &'static str) -> Self {
		self.body = body;
		self.content_type = Some(content_type);

		self
	}
}

struct BlobResponse {
	status: StatusCode,
	code: Option<String>,
	lease_id: Option<String>,
	body: Vec<u8>,
}
impl BlobResponse {
	fn into_error(self) -> BlobError {
		let message = http::body_preview(&self.body);

		BlobError::Status { status: self.status.as_u16(), code: self.code, message }
	}
}
