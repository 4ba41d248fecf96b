// crates.io
use httpmock::prelude::*;
// self
use server_client::{
	_preludet::*,
	auth::ClientStatus,
	client::{ServerClient, check_initialization, get_access_token},
	error::{ConfigError, TransportError},
	http::ReqwestHttpClient,
	oauth2::http::Method,
};

async fn mock_token_endpoint<'a>(
	server: &'a MockServer,
	status: u16,
	body: &str,
) -> httpmock::Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TEST_TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded")
				.form_urlencoded_tuple("grant_type", "password")
				.form_urlencoded_tuple("client_id", TEST_CLIENT_ID)
				.form_urlencoded_tuple("client_secret", TEST_CLIENT_SECRET)
				.form_urlencoded_tuple("username", TEST_USERNAME)
				.form_urlencoded_tuple("password", TEST_PASSWORD);
			then.status(status).header("content-type", "application/json").body(body);
		})
		.await
}

async fn ready_client(server: &MockServer) -> ServerClient<ReqwestHttpClient> {
	let client = build_test_client(test_config(&server.base_url()));

	client.initialize().await.expect("Initialization against the mock server should succeed.");

	client
}

#[tokio::test]
async fn initialize_authenticates_and_schedules_refresh() {
	let server = MockServer::start_async().await;
	let token = mock_token_endpoint(&server, 200, valid_grant_json()).await;
	let client = build_test_client(test_config(&server.base_url()));

	assert!(check_initialization(&client).is_err());

	client.initialize().await.expect("Initialization against the mock server should succeed.");

	let expected_refresh_at = OffsetDateTime::now_utc() + Duration::seconds(3420);
	let drift = (client.refresh_at() - expected_refresh_at).abs();

	assert!(drift <= Duration::seconds(1), "refresh_at drifted by {drift}.");
	assert_eq!(client.access_token().expose(), "GJJGFDGJJGFGJHHJF");
	assert_eq!(client.token_type(), "Bearer");
	assert_eq!(client.refresh_token().expose(), "YHGFDSETGJKHFDD");
	assert_eq!(client.access_scope(), "this.is.some.dummy.scope");
	assert_eq!(client.expires_in(), 3600);
	assert_eq!(client.status(), ClientStatus::Ready);
	assert!(check_initialization(&client).is_ok());

	token.assert_calls_async(1).await;
}

#[tokio::test]
async fn invalid_config_is_rejected_before_any_call() {
	let server = MockServer::start_async().await;
	let token = mock_token_endpoint(&server, 200, valid_grant_json()).await;
	let client = build_test_client(test_config_builder(&server.base_url()).client_id("").build());
	let err = client.initialize().await.expect_err("Blank client id must be rejected.");

	assert!(matches!(err, Error::Config(ConfigError::InvalidClientId { .. })));
	assert!(err.to_string().contains("clientId"));
	assert!(!client.is_initialized());

	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn token_endpoint_failures_report_the_status() {
	let server = MockServer::start_async().await;
	let token = mock_token_endpoint(&server, 500, "{\"error\":\"boom\"}").await;
	let client = build_test_client(test_config(&server.base_url()));
	let err = client.initialize().await.expect_err("Server errors must fail initialization.");

	assert_eq!(err.to_string(), "server error status: 500");
	assert!(!client.is_initialized());

	token.assert_calls_async(1).await;
}

#[tokio::test]
async fn authenticate_reports_server_errors() {
	let server = MockServer::start_async().await;
	let token = mock_token_endpoint(&server, 500, "{\"error\":\"boom\"}").await;
	let client = build_test_client(test_config(&server.base_url()));
	let err = client.authenticate().await.expect_err("Server errors must fail authentication.");

	assert!(matches!(err, Error::AuthServer { status: 500, ref body } if body.contains("boom")));
	assert_eq!(err.to_string(), "server error status: 500");
	assert_eq!(client.access_token().expose(), "");

	token.assert_calls_async(1).await;
}

#[tokio::test]
async fn oversized_lifetimes_initialize_without_overflow() {
	let server = MockServer::start_async().await;
	let grant = valid_grant_json().replace("\"expires_in\":3600", "\"expires_in\":1000000000000");
	let _token = mock_token_endpoint(&server, 200, &grant).await;
	let client = ready_client(&server).await;

	assert_eq!(client.expires_in(), 1_000_000_000_000);
	assert!(client.refresh_at() > OffsetDateTime::now_utc() + Duration::days(365 * 1000));
	assert_eq!(client.status(), ClientStatus::Ready);
}

#[tokio::test]
async fn malformed_grants_are_decode_errors() {
	let server = MockServer::start_async().await;
	let _token = mock_token_endpoint(&server, 200, "{\"access_token\": 42}").await;
	let client = build_test_client(test_config(&server.base_url()));
	let err = client.authenticate().await.expect_err("Malformed grant must be rejected.");

	assert!(matches!(err, Error::Decode(_)));
	assert!(err.to_string().contains("access_token"));
}

#[tokio::test]
async fn empty_grants_fail_postconditions_and_leave_the_client_unusable() {
	let server = MockServer::start_async().await;
	let _token = mock_token_endpoint(&server, 200, "{}").await;
	let client = build_test_client(test_config(&server.base_url()));
	let err = client.initialize().await.expect_err("Empty grant must fail postconditions.");

	assert_eq!(err.to_string(), "invalid access token after EDIAPIClient initialization");
	assert!(!client.is_initialized());

	let err = client
		.make_request(Method::GET, &server.url("/v1/items/"), None)
		.await
		.expect_err("Uninitialized clients must not dispatch.");

	assert!(matches!(err, Error::Uninitialized));
}

#[tokio::test]
async fn uninitialized_clients_refuse_to_refresh_or_dispatch() {
	let server = MockServer::start_async().await;
	let token = mock_token_endpoint(&server, 200, valid_grant_json()).await;
	let client = build_test_client(test_config(&server.base_url()));
	let err = client.refresh().await.expect_err("Refresh requires initialization.");

	assert_eq!(err.to_string(), "cannot Refresh API tokens on an uninitialized client");

	let err = client
		.make_request(Method::GET, &server.url("/v1/items/"), None)
		.await
		.expect_err("Requests require initialization.");

	assert_eq!(
		err.to_string(),
		"the EDI httpClient is not correctly initialized. Please use the `.Initialize` constructor."
	);

	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn requests_carry_bearer_json_and_extra_headers() {
	let server = MockServer::start_async().await;
	let _token = mock_token_endpoint(&server, 200, valid_grant_json()).await;
	let resource = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/items/")
				.header("authorization", "Bearer GJJGFDGJJGFGJHHJF")
				.header("accept", "application/json")
				.header("content-type", "application/json")
				.header("x-workstation", "ws-42")
				.body("{\"name\":\"widget\"}");
			then.status(201).header("content-type", "application/json").body("{\"id\":7}");
		})
		.await;
	let config = test_config_builder(&server.base_url()).header("X-WORKSTATION", "ws-42").build();
	let client = build_test_client(config);

	client.initialize().await.expect("Initialization against the mock server should succeed.");

	let response = client
		.make_request(
			Method::POST,
			&server.url("/v1/items/"),
			Some(b"{\"name\":\"widget\"}".to_vec()),
		)
		.await
		.expect("Resource request should succeed.");

	assert_eq!(response.status().as_u16(), 201);
	assert_eq!(response.body(), b"{\"id\":7}");

	resource.assert_calls_async(1).await;
}

#[tokio::test]
async fn due_tokens_are_refreshed_once_before_the_request() {
	let server = MockServer::start_async().await;
	let token = mock_token_endpoint(&server, 200, valid_grant_json()).await;
	let resource = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/user/me/");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let client = ready_client(&server).await;

	client.update_auth(valid_grant(1));
	client
		.make_request(Method::GET, &server.url("/v1/user/me/"), None)
		.await
		.expect("Request after refresh should succeed.");

	assert_eq!(client.refresh_metrics.attempts(), 1);
	assert_eq!(client.refresh_metrics.successes(), 1);
	assert!(client.refresh_at() > OffsetDateTime::now_utc() + Duration::minutes(50));

	token.assert_calls_async(2).await;
	resource.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_requests_share_one_refresh() {
	let server = MockServer::start_async().await;
	let token = mock_token_endpoint(&server, 200, valid_grant_json()).await;
	let resource = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/items/");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let client = ready_client(&server).await;
	let url = server.url("/v1/items/");

	client.update_auth(valid_grant(1));

	let (first, second, third) = tokio::join!(
		client.make_request(Method::GET, &url, None),
		client.make_request(Method::GET, &url, None),
		client.make_request(Method::GET, &url, None),
	);

	first.expect("First concurrent request should succeed.");
	second.expect("Second concurrent request should succeed.");
	third.expect("Third concurrent request should succeed.");

	assert_eq!(client.refresh_metrics.attempts(), 1);

	token.assert_calls_async(2).await;
	resource.assert_calls_async(3).await;
}

#[tokio::test]
async fn non_json_responses_are_rejected() {
	let server = MockServer::start_async().await;
	let _token = mock_token_endpoint(&server, 200, valid_grant_json()).await;
	let _plain = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/plain/");
			then.status(200).header("content-type", "text/plain").body("hello");
		})
		.await;
	let _charset = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/charset/");
			then.status(200).header("content-type", "application/json; charset=utf-8").body("{}");
		})
		.await;
	let client = ready_client(&server).await;
	let err = client
		.make_request(Method::GET, &server.url("/v1/plain/"), None)
		.await
		.expect_err("Plain text responses must be rejected.");

	assert_eq!(err.to_string(), "expected application/json Content-Type, got text/plain");

	let err = client
		.make_request(Method::GET, &server.url("/v1/charset/"), None)
		.await
		.expect_err("Only the exact JSON media type is accepted.");

	assert!(matches!(err, Error::ContentType { .. }));
}

#[tokio::test]
async fn failed_refresh_degrades_until_a_later_refresh_succeeds() {
	let server = MockServer::start_async().await;
	let mut token = mock_token_endpoint(&server, 200, valid_grant_json()).await;
	let resource = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/items/");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let client = ready_client(&server).await;
	let url = server.url("/v1/items/");

	token.delete_async().await;

	let mut outage = mock_token_endpoint(&server, 503, "{}").await;

	client.update_auth(valid_grant(1));

	for _ in 0..2 {
		let err = client
			.make_request(Method::GET, &url, None)
			.await
			.expect_err("Refresh failures must surface to the caller.");

		assert_eq!(err.to_string(), "server error status: 503");
		assert_eq!(client.status(), ClientStatus::Degraded);
	}

	resource.assert_calls_async(0).await;
	outage.delete_async().await;

	let _recovered = mock_token_endpoint(&server, 200, valid_grant_json()).await;

	client.make_request(Method::GET, &url, None).await.expect("Recovered refresh should succeed.");

	assert_eq!(client.status(), ClientStatus::Ready);
	assert_eq!(client.refresh_metrics.failures(), 2);
	assert_eq!(client.refresh_metrics.successes(), 1);

	resource.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_requests_share_one_failed_refresh() {
	let server = MockServer::start_async().await;
	let mut token = mock_token_endpoint(&server, 200, valid_grant_json()).await;
	let resource = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/items/");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let client = ready_client(&server).await;
	let url = server.url("/v1/items/");

	token.delete_async().await;

	let outage = mock_token_endpoint(&server, 503, "{}").await;

	client.update_auth(valid_grant(1));

	let (first, second, third) = tokio::join!(
		client.make_request(Method::GET, &url, None),
		client.make_request(Method::GET, &url, None),
		client.make_request(Method::GET, &url, None),
	);

	for result in [first, second, third] {
		let err = result.expect_err("Every queued request must see the refresh failure.");

		assert_eq!(err.to_string(), "server error status: 503");
	}

	assert_eq!(client.status(), ClientStatus::Degraded);
	assert_eq!(client.refresh_metrics.attempts(), 1);
	assert_eq!(client.refresh_metrics.failures(), 1);
	assert_eq!(client.refresh_metrics.coalesced(), 2);

	outage.assert_calls_async(1).await;
	resource.assert_calls_async(0).await;

	client
		.make_request(Method::GET, &url, None)
		.await
		.expect_err("Later requests retry the refresh on their own.");

	assert_eq!(client.refresh_metrics.attempts(), 2);

	outage.assert_calls_async(2).await;
}

#[tokio::test]
async fn bare_refresh_stores_the_grant_without_postconditions() {
	let server = MockServer::start_async().await;
	let mut token = mock_token_endpoint(&server, 200, valid_grant_json()).await;
	let client = ready_client(&server).await;

	token.delete_async().await;

	let empty = mock_token_endpoint(&server, 200, "{}").await;

	client.refresh().await.expect("Refresh does not re-check the grant.");

	assert_eq!(client.access_token().expose(), "");
	assert_eq!(client.token_type(), "");
	assert_eq!(client.expires_in(), 0);
	assert_eq!(client.status(), ClientStatus::Ready);
	assert_eq!(client.refresh_metrics.successes(), 1);

	empty.assert_calls_async(1).await;
}

#[tokio::test]
async fn transport_failures_surface_as_transport_errors() {
	let config = test_config_builder("http://127.0.0.1:9").build();
	let client = build_test_client(config);
	let err = client.initialize().await.expect_err("Closed ports must fail.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
	assert!(!client.is_initialized());
}

#[tokio::test]
async fn get_access_token_connects_and_returns_the_token() {
	let server = MockServer::start_async().await;
	let token = mock_token_endpoint(&server, 200, valid_grant_json()).await;
	let access_token = get_access_token(test_config(&server.base_url()))
		.await
		.expect("Connecting against the mock server should succeed.");

	assert_eq!(access_token.expose(), "GJJGFDGJJGFGJHHJF");

	token.assert_calls_async(1).await;
}

#[tokio::test]
async fn me_url_follows_the_token_endpoint_origin() {
	let server = MockServer::start_async().await;
	let client = build_test_client(test_config(&server.base_url()));

	assert_eq!(
		client.me_url().expect("Token URL should parse."),
		format!("{}/v1/user/me/?format=json", server.base_url())
	);
}
