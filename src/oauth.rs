//! OAuth 2.0 refresh-token exchange against the provider's token endpoint.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{TransientError, TransportError},
	http,
};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: Duration = Duration::seconds(3_600);
/// Longest access-token lifetime accepted from the token endpoint.
pub const MAX_EXPIRES_IN: Duration = Duration::days(365);

/// Boxed future returned by [`TokenRefresher::exchange`].
pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<RefreshGrant>> + 'a + Send>>;

/// Result of a successful refresh exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshGrant {
	/// Newly minted access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token, when the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Lifetime of the access token as reported by the provider.
	pub expires_in: Duration,
}

/// Exchanges refresh tokens for access tokens.
///
/// Implementations perform exactly one network exchange per call; retry policy belongs to the
/// caller.
pub trait TokenRefresher
where
	Self: Send + Sync,
{
	/// Performs a `grant_type=refresh_token` exchange.
	fn exchange<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a>;
}

/// Client credentials sent in the form body of every exchange.
#[derive(Clone)]
pub struct ClientCredentials {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: TokenSecret,
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.finish()
	}
}

/// Reqwest-backed [`TokenRefresher`] posting `application/x-www-form-urlencoded` bodies.
#[derive(Clone, Debug)]
pub struct OAuthTokenRefresher {
	http: ReqwestClient,
	token_url: Url,
	credentials: ClientCredentials,
}
impl OAuthTokenRefresher {
	/// Creates a refresher for `token_url`.
	pub fn new(http: ReqwestClient, token_url: Url, credentials: ClientCredentials) -> Self {
		Self { http, token_url, credentials }
	}

	async fn exchange_once(&self, refresh_token: &TokenSecret) -> Result<RefreshGrant> {
		let form = [
			("grant_type", "refresh_token"),
			("refresh_token", refresh_token.expose()),
			("client_id", self.credentials.client_id.as_str()),
			("client_secret", self.credentials.client_secret.expose()),
		];
		let response = self
			.http
			.post(self.token_url.clone())
			.form(&form)
			.send()
			.await
			.map_err(|e| TransportError::network("the token endpoint", e))?;
		let status = response.status();
		let body = response
			.bytes()
			.await
			.map_err(|e| TransportError::network("the token endpoint", e))?;

		tracing::debug!(status = status.as_u16(), "Token endpoint responded.");

		if !status.is_success() {
			return Err(Error::UpstreamAuth {
				status: status.as_u16(),
				body: http::body_preview(&body),
			});
		}

		parse_token_response(status.as_u16(), &body)
	}
}
impl TokenRefresher for OAuthTokenRefresher {
	fn exchange<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a> {
		Box::pin(self.exchange_once(refresh_token))
	}
}

#[derive(Deserialize)]
struct TokenEndpointResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
}

fn parse_token_response(status: u16, body: &[u8]) -> Result<RefreshGrant> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let response: TokenEndpointResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| TransientError::TokenResponseParse { source, status })?;
	let expires_in = match response.expires_in {
		Some(secs) if secs <= 0 || secs > MAX_EXPIRES_IN.whole_seconds() =>
			return Err(TransientError::InvalidExpiresIn { expires_in: secs }.into()),
		Some(secs) => Duration::seconds(secs),
		None => DEFAULT_EXPIRES_IN,
	};

	Ok(RefreshGrant {
		access_token: TokenSecret::new(response.access_token),
		refresh_token: response.refresh_token.filter(|token| !token.is_empty()).map(TokenSecret::new),
		expires_in,
	})
}
