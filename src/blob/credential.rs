//! Storage account credentials and Azure Shared Key request signing.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::{_prelude::*, error::ConfigError};

const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
	"Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// Storage account name, key, and blob endpoint parsed from a connection string.
#[derive(Clone)]
pub struct StorageAccount {
	name: String,
	mac: Hmac<Sha256>,
	blob_endpoint: Url,
}
impl StorageAccount {
	/// Builds an account from explicit parts; `key` is the base64 account key.
	pub fn new(
		name: impl Into<String>,
		key: &str,
		blob_endpoint: Url,
	) -> Result<Self, ConfigError> {
		let key = STANDARD.decode(key.trim()).map_err(|e| ConfigError::InvalidConnectionString {
			reason: format!("AccountKey is not valid base64 ({e})"),
		})?;
		let mac = <Hmac<Sha256> as Mac>::new_from_slice(&key).map_err(|_| {
			ConfigError::InvalidConnectionString { reason: "AccountKey has an unusable length".into() }
		})?;

		Ok(Self { name: name.into(), mac, blob_endpoint })
	}

	/// Parses an Azure storage connection string.
	///
	/// Supports `UseDevelopmentStorage=true` (Azurite defaults) and `AccountName` +
	/// `AccountKey` with either `BlobEndpoint` or `DefaultEndpointsProtocol` + `EndpointSuffix`.
	pub fn from_connection_string(raw: &str) -> Result<Self, ConfigError> {
		let mut parts = HashMap::new();

		for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
			let (key, value) = segment.split_once('=').ok_or_else(|| {
				ConfigError::InvalidConnectionString {
					reason: format!("segment `{}` is not a key=value pair", redact_segment(segment)),
				}
			})?;

			parts.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
		}

		if parts.get("usedevelopmentstorage").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
			return Self::new(DEV_ACCOUNT_NAME, DEV_ACCOUNT_KEY, parse_endpoint(DEV_BLOB_ENDPOINT)?);
		}

		let name = parts.get("accountname").filter(|v| !v.is_empty()).ok_or_else(|| {
			ConfigError::InvalidConnectionString { reason: "AccountName is missing".into() }
		})?;
		let key = parts.get("accountkey").filter(|v| !v.is_empty()).ok_or_else(|| {
			ConfigError::InvalidConnectionString { reason: "AccountKey is missing".into() }
		})?;
		let endpoint = match parts.get("blobendpoint") {
			Some(endpoint) => parse_endpoint(endpoint)?,
			None => {
				let protocol =
					parts.get("defaultendpointsprotocol").map(String::as_str).unwrap_or("https");
				let suffix =
					parts.get("endpointsuffix").map(String::as_str).unwrap_or("core.windows.net");

				parse_endpoint(&format!("{protocol}://{name}.blob.{suffix}"))?
			},
		};

		Self::new(name.as_str(), key, endpoint)
	}

	/// Returns the account name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the blob service endpoint.
	pub fn blob_endpoint(&self) -> &Url {
		&self.blob_endpoint
	}

	/// Computes the `Authorization` header value for a canonical request.
	pub(crate) fn authorization(&self, request: &CanonicalRequest) -> String {
		let string_to_sign = request.string_to_sign(&self.name);
		let mut mac = self.mac.clone();

		mac.update(string_to_sign.as_bytes());

		format!("SharedKey {}:{}", self.name, STANDARD.encode(mac.finalize().into_bytes()))
	}
}
impl Debug for StorageAccount {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StorageAccount")
			.field("name", &self.name)
			.field("key", &"<redacted>")
			.field("blob_endpoint", &self.blob_endpoint.as_str())
			.finish()
	}
}

/// Request fields covered by the Shared Key signature.
#[derive(Debug)]
pub(crate) struct CanonicalRequest<'a> {
	pub method: &'a str,
	pub url: &'a Url,
	pub content_length: usize,
	pub content_type: Option<&'a str>,
	pub if_none_match: Option<&'a str>,
	/// `x-ms-*` headers, keyed by lowercase name.
	pub ms_headers: &'a BTreeMap<String, String>,
}
impl CanonicalRequest<'_> {
	pub(crate) fn string_to_sign(&self, account: &str) -> String {
		let content_length =
			if self.content_length == 0 { String::new() } else { self.content_length.to_string() };
		// Encoding, language, length, MD5, type, date, and the four conditional headers plus range.
		let standard = [
			self.method,
			"",
			"",
			content_length.as_str(),
			"",
			self.content_type.unwrap_or_default(),
			"",
			"",
			"",
			self.if_none_match.unwrap_or_default(),
			"",
			"",
		];
		let mut out = standard.join("\n");

		out.push('\n');

		for (name, value) in self.ms_headers {
			out.push_str(name);
			out.push(':');
			out.push_str(value.trim());
			out.push('\n');
		}

		out.push('/');
		out.push_str(account);
		out.push_str(self.url.path());

		let mut query = <BTreeMap<String, Vec<String>>>::new();

		for (name, value) in self.url.query_pairs() {
			query.entry(name.to_ascii_lowercase()).or_default().push(value.into_owned());
		}
		for (name, mut values) in query {
			values.sort();
			out.push('\n');
			out.push_str(&name);
			out.push(':');
			out.push_str(&values.join(","));
		}

		out
	}
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|e| ConfigError::InvalidConnectionString {
		reason: format!("blob endpoint `{raw}` is not a valid URL ({e})"),
	})
}

fn redact_segment(segment: &str) -> &str {
	segment.get(..segment.len().min(16)).unwrap_or_default()
}
