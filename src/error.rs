//! Relay-level error types shared across the token, contacts, and storage layers.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Upstream answered with a payload the relay could not understand.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Neither the persisted state nor the configuration holds a refresh token.
	#[error("No refresh token is available from the token state or configuration.")]
	NoRefreshToken,
	/// Token endpoint rejected the refresh exchange.
	#[error("Failed to refresh token: {status} - {body}")]
	UpstreamAuth {
		/// HTTP status returned by the token endpoint.
		status: u16,
		/// Raw response body for diagnostics.
		body: String,
	},
	/// Contacts API rejected the access token with HTTP 401.
	#[error("Upstream rejected the access token (401).")]
	AuthExpired,
	/// Contacts API returned a non-success status other than 401.
	#[error("Upstream error {status}: {body}")]
	Upstream {
		/// HTTP status returned by the contacts API.
		status: u16,
		/// Raw response body for diagnostics.
		body: String,
	},
}
impl Error {
	/// Returns `true` when the failure originated from an upstream service rather than from
	/// local configuration or storage.
	pub fn is_upstream(&self) -> bool {
		matches!(
			self,
			Self::UpstreamAuth { .. }
				| Self::AuthExpired
				| Self::Upstream { .. }
				| Self::Transient(_)
				| Self::Transport(_)
		)
	}
}

/// Configuration and validation failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Required environment variable is absent or empty.
	#[error("Environment variable `{name}` is required.")]
	MissingVar {
		/// Variable name.
		name: &'static str,
	},
	/// Environment variable holds a value that cannot be used.
	#[error("Environment variable `{name}` is invalid: {reason}.")]
	InvalidVar {
		/// Variable name.
		name: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
	/// Configured URL cannot be parsed.
	#[error("`{name}` is not a valid URL.")]
	InvalidUrl {
		/// Setting that carried the URL.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Storage connection string is malformed or incomplete.
	#[error("Storage connection string is invalid: {reason}.")]
	InvalidConnectionString {
		/// Why the connection string was rejected.
		reason: String,
	},
	/// Contacts page size must be positive.
	#[error("Page size must be greater than zero.")]
	InvalidPageSize,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Upstream payloads that could not be decoded.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Contacts API responded with malformed JSON.
	#[error("Contacts API returned malformed JSON at offset {offset}.")]
	ContactsResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// Offset of the page that failed to parse.
		offset: usize,
	},
	/// Token endpoint reported an access-token lifetime the relay cannot represent.
	#[error("Token endpoint returned an unusable expires_in of {expires_in} seconds.")]
	InvalidExpiresIn {
		/// Lifetime as reported by the provider.
		expires_in: i64,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Which upstream was being called.
		target: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(target: &'static str, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { target, source: Box::new(src) }
	}
}
