// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
use time::Duration;
// self
use contacts_relay::{
	auth::TokenSecret,
	contacts::ContactsClient,
	error::{ConfigError, Error},
	http,
	url::Url,
};

fn client(server: &MockServer) -> ContactsClient {
	let http = http::build_client(Duration::seconds(5)).expect("HTTP client should build.");
	let api_url = Url::parse(&server.url("/contacts")).expect("Mock contacts URL should parse.");

	ContactsClient::new(http, api_url, "api-key-1")
}

fn page(start: usize, len: usize) -> Value {
	json!({ "value": (start..start + len).map(|id| json!({ "id": id })).collect::<Vec<_>>() })
}

#[tokio::test]
async fn pages_are_fetched_until_a_short_page() {
	let server = MockServer::start_async().await;
	let mut mocks = Vec::new();

	for (offset, len) in [(0, 500), (500, 500), (1_000, 500), (1_500, 300)] {
		let mock = server
			.mock_async(|when, then| {
				when.method(GET)
					.path("/contacts")
					.query_param("limit", "500")
					.query_param("offset", offset.to_string())
					.header("x-api-key", "api-key-1")
					.header("authorization", "Bearer access-1");
				then.status(200).json_body(page(offset, len));
			})
			.await;

		mocks.push(mock);
	}

	let contacts = client(&server)
		.fetch_all(&TokenSecret::new("access-1"), 500)
		.await
		.expect("Pagination should succeed.");

	for mock in &mocks {
		mock.assert_calls_async(1).await;
	}

	assert_eq!(contacts.len(), 1_800);
	assert_eq!(contacts.first(), Some(&json!({ "id": 0 })));
	assert_eq!(contacts.last(), Some(&json!({ "id": 1_799 })));
}

#[tokio::test]
async fn full_final_page_costs_one_empty_request() {
	let server = MockServer::start_async().await;
	let full = server
		.mock_async(|when, then| {
			when.method(GET).path("/contacts").query_param("offset", "0");
			then.status(200).json_body(page(0, 2));
		})
		.await;
	let empty = server
		.mock_async(|when, then| {
			when.method(GET).path("/contacts").query_param("offset", "2");
			then.status(200).json_body(json!({ "value": [] }));
		})
		.await;
	let contacts = client(&server)
		.fetch_all(&TokenSecret::new("access-1"), 2)
		.await
		.expect("Pagination should succeed.");

	full.assert_calls_async(1).await;
	empty.assert_calls_async(1).await;

	assert_eq!(contacts.len(), 2);
}

#[tokio::test]
async fn missing_value_field_is_an_empty_page() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/contacts");
			then.status(200).json_body(json!({ "total": 0 }));
		})
		.await;

	let contacts = client(&server)
		.fetch_all(&TokenSecret::new("access-1"), 500)
		.await
		.expect("Page without records should succeed.");

	assert!(contacts.is_empty());
}

#[tokio::test]
async fn unauthorized_page_reports_auth_expiry() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/contacts");
			then.status(401).body("expired");
		})
		.await;

	let err = client(&server)
		.fetch_all(&TokenSecret::new("stale"), 500)
		.await
		.expect_err("401 should fail.");

	assert!(matches!(err, Error::AuthExpired));
}

#[tokio::test]
async fn failing_second_page_discards_partial_results() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/contacts").query_param("offset", "0");
			then.status(200).json_body(page(0, 3));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/contacts").query_param("offset", "3");
			then.status(500).body("boom");
		})
		.await;

	let err = client(&server)
		.fetch_all(&TokenSecret::new("access-1"), 3)
		.await
		.expect_err("Server error should fail.");

	match err {
		Error::Upstream { status, body } => {
			assert_eq!(status, 500);
			assert_eq!(body, "boom");
		},
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn zero_page_size_is_rejected_before_any_request() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/contacts");
			then.status(200).json_body(page(0, 1));
		})
		.await;
	let err = client(&server)
		.fetch_all(&TokenSecret::new("access-1"), 0)
		.await
		.expect_err("Zero page size should fail.");

	mock.assert_calls_async(0).await;

	assert!(matches!(err, Error::Config(ConfigError::InvalidPageSize)));
}
