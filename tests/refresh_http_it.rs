// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use contacts_relay::{
	auth::TokenSecret,
	error::{Error, TransientError},
	http,
	oauth::{ClientCredentials, OAuthTokenRefresher, TokenRefresher},
	url::Url,
};

fn refresher(server: &MockServer) -> OAuthTokenRefresher {
	let client = http::build_client(Duration::seconds(5)).expect("HTTP client should build.");
	let token_url =
		Url::parse(&server.url("/oauth2/token")).expect("Mock token endpoint should parse.");

	OAuthTokenRefresher::new(
		client,
		token_url,
		ClientCredentials { client_id: "relay-client".into(), client_secret: "s3cr3t".into() },
	)
}

#[tokio::test]
async fn exchange_posts_the_refresh_form_and_reads_rotation() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.body_includes("grant_type=refresh_token")
				.body_includes("refresh_token=old-refresh")
				.body_includes("client_id=relay-client")
				.body_includes("client_secret=s3cr3t");
			then.status(200).header("content-type", "application/json").json_body(
				serde_json::json!({
					"access_token": "new-access",
					"refresh_token": "new-refresh",
					"expires_in": 1800,
					"token_type": "Bearer"
				}),
			);
		})
		.await;
	let grant = refresher(&server)
		.exchange(&TokenSecret::new("old-refresh"))
		.await
		.expect("Exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(grant.access_token.expose(), "new-access");
	assert_eq!(grant.refresh_token.as_ref().map(TokenSecret::expose), Some("new-refresh"));
	assert_eq!(grant.expires_in, Duration::seconds(1_800));
}

#[tokio::test]
async fn exchange_without_rotation_or_lifetime_uses_defaults() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).json_body(serde_json::json!({ "access_token": "new-access" }));
		})
		.await;

	let grant = refresher(&server)
		.exchange(&TokenSecret::new("old-refresh"))
		.await
		.expect("Exchange should succeed.");

	assert!(grant.refresh_token.is_none());
	assert_eq!(grant.expires_in, Duration::hours(1));
}

#[tokio::test]
async fn rejected_exchange_keeps_status_and_body() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(400).body(r#"{"error":"invalid_grant"}"#);
		})
		.await;

	let err = refresher(&server)
		.exchange(&TokenSecret::new("revoked"))
		.await
		.expect_err("Rejected exchange should fail.");

	match &err {
		Error::UpstreamAuth { status, body } => {
			assert_eq!(*status, 400);
			assert_eq!(body, r#"{"error":"invalid_grant"}"#);
		},
		other => panic!("Unexpected error: {other:?}"),
	}
	assert!(err.to_string().starts_with("Failed to refresh token: 400"));
	assert!(err.is_upstream());
}

#[tokio::test]
async fn malformed_success_body_is_a_parse_error() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).body(r#"{"token":"nope"}"#);
		})
		.await;

	let err = refresher(&server)
		.exchange(&TokenSecret::new("old-refresh"))
		.await
		.expect_err("Body without access_token should fail.");

	assert!(matches!(err, Error::Transient(_)));
}

#[tokio::test]
async fn unusable_lifetime_is_an_upstream_failure() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).body(r#"{"access_token":"a","expires_in":9000000000000000}"#);
		})
		.await;

	let err = refresher(&server)
		.exchange(&TokenSecret::new("old-refresh"))
		.await
		.expect_err("Oversized lifetime should fail.");

	assert!(matches!(
		err,
		Error::Transient(TransientError::InvalidExpiresIn { expires_in: 9_000_000_000_000_000 })
	));
	assert!(err.is_upstream());
}
