//! Environment-sourced configuration and wiring of the relay's collaborators.

// std
use std::{env, path::PathBuf, str::FromStr};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	blob::{BlobClient, StorageAccount},
	contacts::{ContactsClient, DEFAULT_PAGE_SIZE},
	error::ConfigError,
	flows::TokenManager,
	http,
	lock::{BlobLeaseLock, LockProvider, MemoryLock},
	oauth::{ClientCredentials, OAuthTokenRefresher},
	relay::ContactsRelay,
	store::{BlobStore, FileStore, TokenStore},
};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::seconds(30);

/// Where the shared token state and refresh lease live.
#[derive(Clone, Debug)]
pub enum StateBackend {
	/// Azure Blob Storage state blob plus a blob lease lock.
	Blob {
		/// Parsed storage account.
		account: StorageAccount,
		/// Container of the state blob.
		token_container: String,
		/// State blob name.
		token_blob: String,
		/// Container of the lock blob.
		lock_container: String,
		/// Lock blob name.
		lock_blob: String,
		/// Lease duration in seconds.
		lease_secs: u32,
	},
	/// Local JSON file guarded by an in-process lock.
	File {
		/// State file path.
		path: PathBuf,
	},
}

/// Relay configuration.
#[derive(Clone)]
pub struct Config {
	/// OAuth 2.0 token endpoint.
	pub token_url: Url,
	/// Contacts endpoint.
	pub api_url: Url,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: TokenSecret,
	/// Refresh token used until a rotated one is persisted.
	pub refresh_token: Option<TokenSecret>,
	/// Value of the `x-api-key` header.
	pub api_key: TokenSecret,
	/// Token state backend.
	pub backend: StateBackend,
	/// Lease wait before refreshing without the lock.
	pub lock_timeout: Duration,
	/// Contacts page size.
	pub page_size: usize,
	/// Per-request HTTP timeout.
	pub http_timeout: Duration,
}
impl Config {
	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Reads the configuration through `lookup`, which returns a variable's value if set.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let vars = Vars(lookup);
		let token_container = vars.or("TOKEN_CONTAINER", "tokens");
		let backend = match vars
			.optional("TOKEN_STORAGE_CONNECTION_STRING")
			.or_else(|| vars.optional("AzureWebJobsStorage"))
		{
			Some(connection_string) => StateBackend::Blob {
				account: StorageAccount::from_connection_string(&connection_string)?,
				lock_container: vars.or("LOCK_CONTAINER", &token_container),
				token_blob: vars.or("TOKEN_BLOB", "smokeball_token.json"),
				lock_blob: vars.or("LOCK_BLOB", "smokeball_token.lock"),
				lease_secs: vars.parse("LOCK_LEASE_SECS", BlobLeaseLock::DEFAULT_LEASE_SECS)?,
				token_container,
			},
			None => StateBackend::File {
				path: vars.or("ACCESS_TOKEN_FILE", "smokeball_access_token.json").into(),
			},
		};
		let page_size = vars.parse("PAGE_SIZE", DEFAULT_PAGE_SIZE)?;

		if page_size == 0 {
			return Err(ConfigError::InvalidVar {
				name: "PAGE_SIZE",
				reason: "must be greater than zero".into(),
			});
		}

		Ok(Self {
			token_url: vars.url("TOKEN_URL")?,
			api_url: vars.url("API_URL")?,
			client_id: vars.required("CLIENT_ID")?,
			client_secret: vars.required("CLIENT_SECRET")?.into(),
			refresh_token: vars.optional("REFRESH_TOKEN").map(TokenSecret::from),
			api_key: vars.required("API_KEY")?.into(),
			backend,
			lock_timeout: vars
				.positive_secs("LOCK_TIMEOUT_SECS", TokenManager::DEFAULT_LOCK_TIMEOUT)?,
			page_size,
			http_timeout: vars.positive_secs("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT)?,
		})
	}

	/// Builds the relay and every collaborator it needs.
	pub fn build_relay(&self) -> Result<ContactsRelay, ConfigError> {
		let client = http::build_client(self.http_timeout)?;
		let (store, lock): (Arc<dyn TokenStore>, Arc<dyn LockProvider>) = match &self.backend {
			StateBackend::Blob {
				account,
				token_container,
				token_blob,
				lock_container,
				lock_blob,
				lease_secs,
			} => {
				let blobs = BlobClient::new(client.clone(), account.clone());

				(
					Arc::new(BlobStore::new(blobs.clone(), token_container, token_blob)),
					Arc::new(
						BlobLeaseLock::new(blobs, lock_container, lock_blob)
							.with_lease_secs(*lease_secs),
					),
				)
			},
			StateBackend::File { path } => (
				Arc::new(FileStore::new(path)),
				Arc::new(MemoryLock::new(path.display().to_string())),
			),
		};
		let refresher = OAuthTokenRefresher::new(
			client.clone(),
			self.token_url.clone(),
			ClientCredentials {
				client_id: self.client_id.clone(),
				client_secret: self.client_secret.clone(),
			},
		);
		let mut tokens =
			TokenManager::new(store, lock, Arc::new(refresher)).with_lock_timeout(self.lock_timeout);

		if let Some(refresh_token) = &self.refresh_token {
			tokens = tokens.with_fallback_refresh_token(refresh_token.clone());
		}

		let contacts = ContactsClient::new(client, self.api_url.clone(), self.api_key.clone());

		Ok(ContactsRelay::new(tokens, contacts).with_page_size(self.page_size))
	}
}
impl Debug for Config {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Config")
			.field("token_url", &self.token_url.as_str())
			.field("api_url", &self.api_url.as_str())
			.field("client_id", &self.client_id)
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("backend", &self.backend)
			.field("lock_timeout", &self.lock_timeout)
			.field("page_size", &self.page_size)
			.field("http_timeout", &self.http_timeout)
			.finish()
	}
}

struct Vars<F>(F);
impl<F> Vars<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn optional(&self, name: &str) -> Option<String> {
		(self.0)(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
	}

	fn or(&self, name: &str, default: &str) -> String {
		self.optional(name).unwrap_or_else(|| default.to_owned())
	}

	fn required(&self, name: &'static str) -> Result<String, ConfigError> {
		self.optional(name).ok_or(ConfigError::MissingVar { name })
	}

	fn url(&self, name: &'static str) -> Result<Url, ConfigError> {
		Url::parse(&self.required(name)?).map_err(|source| ConfigError::InvalidUrl { name, source })
	}

	fn positive_secs(&self, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
		match self.parse(name, default.whole_seconds())? {
			secs if secs > 0 => Ok(Duration::seconds(secs)),
			_ => Err(ConfigError::InvalidVar { name, reason: "must be greater than zero".into() }),
		}
	}

	fn parse<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
	where
		T: FromStr,
		T::Err: Display,
	{
		match self.optional(name) {
			Some(raw) => raw
				.parse()
				.map_err(|e: T::Err| ConfigError::InvalidVar { name, reason: e.to_string() }),
			None => Ok(default),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
		move |name| pairs.iter().find(|(key, _)| *key == name).map(|(_, value)| value.to_string())
	}

	const BASE: &[(&str, &str)] = &[
		("TOKEN_URL", "https://auth.example.com/oauth2/token"),
		("API_URL", "https://api.example.com/contacts"),
		("CLIENT_ID", "client"),
		("CLIENT_SECRET", "secret"),
		("API_KEY", "key"),
	];

	#[test]
	fn defaults_select_file_backend() {
		let config = Config::from_lookup(lookup(BASE)).expect("Base configuration should load.");

		assert_eq!(config.page_size, 500);
		assert_eq!(config.lock_timeout, Duration::seconds(15));
		assert_eq!(config.http_timeout, Duration::seconds(30));
		assert!(config.refresh_token.is_none());
		assert!(matches!(
			&config.backend,
			StateBackend::File { path } if path == &PathBuf::from("smokeball_access_token.json")
		));
		assert!(config.build_relay().is_ok());
	}

	#[test]
	fn connection_string_selects_blob_backend() {
		const VARS: &[(&str, &str)] = &[
			("TOKEN_URL", "https://auth.example.com/oauth2/token"),
			("API_URL", "https://api.example.com/contacts"),
			("CLIENT_ID", "client"),
			("CLIENT_SECRET", "secret"),
			("API_KEY", "key"),
			("REFRESH_TOKEN", "seed-refresh"),
			("AzureWebJobsStorage", "UseDevelopmentStorage=true"),
			("TOKEN_CONTAINER", "relay"),
			("LOCK_LEASE_SECS", "30"),
		];

		let config = Config::from_lookup(lookup(VARS)).expect("Blob configuration should load.");

		match &config.backend {
			StateBackend::Blob {
				token_container,
				token_blob,
				lock_container,
				lock_blob,
				lease_secs,
				..
			} => {
				assert_eq!(token_container, "relay");
				assert_eq!(lock_container, "relay");
				assert_eq!(token_blob, "smokeball_token.json");
				assert_eq!(lock_blob, "smokeball_token.lock");
				assert_eq!(*lease_secs, 30);
			},
			other => panic!("Unexpected backend: {other:?}"),
		}
		assert_eq!(config.refresh_token.as_ref().map(TokenSecret::expose), Some("seed-refresh"));
		assert!(config.build_relay().is_ok());
	}

	#[test]
	fn missing_required_variable_is_named() {
		let err = Config::from_lookup(lookup(&[("TOKEN_URL", "https://auth.example.com/token")]))
			.expect_err("Incomplete configuration should be rejected.");

		assert!(matches!(err, ConfigError::MissingVar { name: "API_URL" }));
	}

	#[test]
	fn invalid_numbers_are_rejected() {
		const VARS: &[(&str, &str)] = &[
			("TOKEN_URL", "https://auth.example.com/oauth2/token"),
			("API_URL", "https://api.example.com/contacts"),
			("CLIENT_ID", "client"),
			("CLIENT_SECRET", "secret"),
			("API_KEY", "key"),
			("PAGE_SIZE", "lots"),
		];

		let err = Config::from_lookup(lookup(VARS)).expect_err("Non-numeric page size should fail.");

		assert!(matches!(err, ConfigError::InvalidVar { name: "PAGE_SIZE", .. }));

		const ZERO: &[(&str, &str)] = &[
			("TOKEN_URL", "https://auth.example.com/oauth2/token"),
			("API_URL", "https://api.example.com/contacts"),
			("CLIENT_ID", "client"),
			("CLIENT_SECRET", "secret"),
			("API_KEY", "key"),
			("PAGE_SIZE", "0"),
		];

		let err = Config::from_lookup(lookup(ZERO)).expect_err("Zero page size should fail.");

		assert!(matches!(err, ConfigError::InvalidVar { name: "PAGE_SIZE", .. }));
	}

	#[test]
	fn non_positive_timeouts_are_rejected() {
		const ZERO_HTTP: &[(&str, &str)] = &[
			("TOKEN_URL", "https://auth.example.com/oauth2/token"),
			("API_URL", "https://api.example.com/contacts"),
			("CLIENT_ID", "client"),
			("CLIENT_SECRET", "secret"),
			("API_KEY", "key"),
			("HTTP_TIMEOUT_SECS", "0"),
		];
		const NEGATIVE_LOCK: &[(&str, &str)] = &[
			("TOKEN_URL", "https://auth.example.com/oauth2/token"),
			("API_URL", "https://api.example.com/contacts"),
			("CLIENT_ID", "client"),
			("CLIENT_SECRET", "secret"),
			("API_KEY", "key"),
			("LOCK_TIMEOUT_SECS", "-5"),
		];

		let err = Config::from_lookup(lookup(ZERO_HTTP)).expect_err("Zero HTTP timeout should fail.");

		assert!(matches!(err, ConfigError::InvalidVar { name: "HTTP_TIMEOUT_SECS", .. }));

		let err =
			Config::from_lookup(lookup(NEGATIVE_LOCK)).expect_err("Negative lock timeout should fail.");

		assert!(matches!(err, ConfigError::InvalidVar { name: "LOCK_TIMEOUT_SECS", .. }));
	}
}
