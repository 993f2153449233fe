// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::{Duration, macros::datetime};
// self
use foundry_token_provider::{
	auth::Host,
	clock::ManualClock,
	error::{ConfigError, Error},
	oauth::TOKEN_PATH,
	provider::{CachedTokenProvider, OAuthSettings, OAuthStrategy, Strategy, TokenProvider},
	registry::{OAUTH_PROVIDER, ProviderEnvironment, ProviderRegistry, ProviderSettings},
};

const CLIENT_ID: &str = "abc";
const CLIENT_SECRET: &str = "xyz";
// base64("abc:xyz")
const BASIC_AUTHORIZATION: &str = "Basic YWJjOnh5eg==";

fn clock() -> ManualClock {
	ManualClock::new(datetime!(2024-01-01 00:00 UTC))
}

fn host(server: &MockServer) -> Host {
	Host::new(server.address().to_string()).with_scheme("http")
}

fn environment(clock: &ManualClock) -> ProviderEnvironment {
	ProviderEnvironment::try_default()
		.expect("Default environment should build for tests.")
		.with_clock(Arc::new(clock.clone()))
}

fn provider(
	server: &MockServer,
	clock: &ManualClock,
	settings: OAuthSettings,
) -> CachedTokenProvider {
	let env = environment(clock);
	let host = host(server);
	let strategy =
		OAuthStrategy::new(settings, env.user_credentials_client(&host), env.http_client().clone())
			.expect("Client-credentials settings should be valid.");

	CachedTokenProvider::new(host, Strategy::from(strategy))
		.with_clock(env.clock().clone())
}

fn client_credentials() -> OAuthSettings {
	OAuthSettings::new(CLIENT_ID).with_client_secret(CLIENT_SECRET).with_grant("client_credentials")
}

#[tokio::test]
async fn token_is_cached_until_skew_window_and_after_invalidation_refetched() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("authorization", BASIC_AUTHORIZATION)
				.header("content-type", "application/x-www-form-urlencoded")
				.body("grant_type=client_credentials");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"T1\",\"expires_in\":3600}");
		})
		.await;
	let provider = provider(&server, &clock, client_credentials());

	assert_eq!(provider.token().await.expect("First token should be fetched.").expose(), "T1");

	clock.advance(Duration::seconds(3590));

	assert_eq!(provider.token().await.expect("Token should still be cached.").expose(), "T1");

	mock.assert_calls_async(1).await;

	provider.invalidate_cache().await.expect("Invalidation never fails.");

	assert_eq!(provider.token().await.expect("Token should be fetched again.").expose(), "T1");

	mock.assert_calls_async(2).await;

	let record = provider.cached_record().await.expect("A record should be cached.");

	assert_eq!(record.expires_at, datetime!(2024-01-01 00:59:50 UTC) + Duration::hours(1));
}

#[tokio::test]
async fn configured_scopes_are_space_joined() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.body("grant_type=client_credentials&scope=api%3Aread-data+compass%3Aview");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"scoped\",\"expires_in\":600}");
		})
		.await;
	let provider =
		provider(&server, &clock, client_credentials().with_scopes(["api:read-data", "compass:view"]));

	assert_eq!(provider.token().await.expect("Scoped token should be fetched.").expose(), "scoped");

	mock.assert_async().await;
}

#[tokio::test]
async fn error_payload_surfaces_as_api_error_and_leaves_cache_empty() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let failing = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let provider = provider(&server, &clock, client_credentials());
	let err = provider.token().await.expect_err("Error payloads must fail.");

	match err {
		Error::Api(api) => {
			assert_eq!(api.status, Some(401));
			assert_eq!(api.oauth_error(), Some("invalid_client"));
			assert_eq!(api.body, serde_json::json!({ "error": "invalid_client" }));
		},
		other => panic!("Expected an API error, got {other:?}."),
	}

	assert!(provider.cached_record().await.is_none());

	failing.assert_calls_async(1).await;
	failing.delete_async().await;

	let succeeding = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"T2\",\"expires_in\":3600}");
		})
		.await;

	assert_eq!(provider.token().await.expect("Retry should succeed.").expose(), "T2");

	succeeding.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_callers_share_one_request() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body("{\"access_token\":\"guard-token\",\"expires_in\":900}");
		})
		.await;
	let provider = provider(&server, &clock, client_credentials());
	let (first, second, third) = tokio::join!(provider.token(), provider.token(), provider.token());

	for token in [first, second, third] {
		assert_eq!(token.expect("Concurrent callers should succeed.").expose(), "guard-token");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn registry_builds_client_credentials_provider() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).header("authorization", BASIC_AUTHORIZATION);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"registry-token\",\"expires_in\":3600}");
		})
		.await;
	let registry = ProviderRegistry::builtin();
	let env = environment(&clock);
	let settings = ProviderSettings::new()
		.with("client_id", CLIENT_ID)
		.with("client_secret", CLIENT_SECRET)
		.with("grant_type", "client_credentials");
	let provider = registry
		.resolve(OAUTH_PROVIDER, host(&server), &settings, &env)
		.expect("The oauth provider should resolve.");
	let url = reqwest::Url::parse(&server.url("/compass/api/resources"))
		.expect("Request URL should parse.");
	let request = provider
		.attach_auth(reqwest::Request::new(reqwest::Method::GET, url))
		.await
		.expect("Bearer header should be attached.");

	assert_eq!(
		request.headers().get("authorization").expect("Authorization header should be set."),
		"Bearer registry-token",
	);

	mock.assert_async().await;

	let err = registry
		.resolve(
			OAUTH_PROVIDER,
			host(&server),
			&ProviderSettings::new()
				.with("client_id", CLIENT_ID)
				.with("grant_type", "client_credentials"),
			&env,
		)
		.expect_err("Missing secret must fail at construction.");

	assert!(matches!(err, Error::Config(ConfigError::MissingClientSecret { .. })));
}

#[tokio::test]
async fn token_endpoint_redirects_are_not_followed() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let redirect = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(302).header("location", "/elsewhere");
		})
		.await;
	let elsewhere = server
		.mock_async(|when, then| {
			when.path("/elsewhere");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"REDIRECTED\",\"expires_in\":3600}");
		})
		.await;
	let settings = ProviderSettings::new()
		.with("client_id", CLIENT_ID)
		.with("client_secret", CLIENT_SECRET)
		.with("grant_type", "client_credentials");
	let provider = ProviderRegistry::builtin()
		.resolve(OAUTH_PROVIDER, host(&server), &settings, &environment(&clock))
		.expect("The oauth provider should resolve.");
	let err = provider.token().await.expect_err("A redirect is not a token response.");

	assert!(matches!(err, Error::Transient(_)), "Unexpected error: {err:?}.");

	redirect.assert_calls_async(1).await;
	elsewhere.assert_calls_async(0).await;
}
