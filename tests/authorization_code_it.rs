// std
use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use httpmock::prelude::*;
use time::{Duration, macros::datetime};
use url::Url;
// self
use foundry_token_provider::{
	auth::{Host, Scopes},
	clock::ManualClock,
	error::Error,
	http::ReqwestHttpClient,
	oauth::{
		CodePrompt, HeadlessUserCredentialsClient, TOKEN_PATH, UserCredentialsClient,
		UserCredentialsRequest,
	},
	provider::{DEFAULT_OAUTH_SCOPES, TokenFuture},
	registry::{OAUTH_PROVIDER, ProviderEnvironment, ProviderRegistry, ProviderSettings},
};

const CLIENT_ID: &str = "headless-client";

/// Answers every prompt with a redirect URL carrying `code` and the session's state.
#[derive(Default)]
struct PastingPrompt {
	calls: AtomicUsize,
	seen: parking_lot::Mutex<Vec<Url>>,
}
impl CodePrompt for PastingPrompt {
	fn authorization_code<'a>(&'a self, authorize_url: &'a Url) -> TokenFuture<'a, String> {
		Box::pin(async move {
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
			let pairs: HashMap<_, _> = authorize_url.query_pairs().into_owned().collect();
			let mut redirect =
				Url::parse(&pairs["redirect_uri"]).expect("Redirect URI should parse.");

			redirect
				.query_pairs_mut()
				.append_pair("code", &format!("C{n}"))
				.append_pair("state", &pairs["state"]);
			self.seen.lock().push(authorize_url.clone());

			Ok(redirect.to_string())
		})
	}
}

fn clock() -> ManualClock {
	ManualClock::new(datetime!(2024-01-01 00:00 UTC))
}

fn headless_client(
	prompt: Arc<PastingPrompt>,
	clock: &ManualClock,
) -> HeadlessUserCredentialsClient {
	let http_client =
		ReqwestHttpClient::try_default().expect("Reqwest client should build for tests.");

	HeadlessUserCredentialsClient::new(prompt, http_client)
		.with_scheme("http")
		.with_clock(Arc::new(clock.clone()))
}

fn token_body(access: &str, refresh: &str) -> String {
	format!(
		"{{\"access_token\":\"{access}\",\"refresh_token\":\"{refresh}\",\"token_type\":\"bearer\",\"expires_in\":3600}}"
	)
}

#[tokio::test]
async fn interactive_flow_builds_authorize_url_and_exchanges_code() {
	let server = MockServer::start_async().await;
	let hostname = server.address().to_string();
	let clock = clock();
	let prompt = Arc::new(PastingPrompt::default());
	let client = headless_client(prompt.clone(), &clock);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("A1", "R1"));
		})
		.await;
	let scopes = Scopes::new(["offline_access", "compass:view"]).expect("Scopes should be valid.");
	let credentials = client
		.user_credentials(UserCredentialsRequest {
			scopes: &scopes,
			hostname: &hostname,
			client_id: CLIENT_ID,
			client_secret: None,
			use_local_webserver: false,
		})
		.await
		.expect("Interactive flow should succeed.");

	mock.assert_async().await;

	assert_eq!(credentials.token.expose(), "A1");
	assert_eq!(credentials.expiry, datetime!(2024-01-01 01:00 UTC));
	assert!(client.has_refresh_token(&hostname, CLIENT_ID));

	let authorize_url = prompt.seen.lock()[0].clone();
	let pairs: HashMap<_, _> = authorize_url.query_pairs().into_owned().collect();

	assert_eq!(authorize_url.path(), "/multipass/api/oauth2/authorize");
	assert_eq!(pairs.get("response_type"), Some(&"code".into()));
	assert_eq!(pairs.get("client_id"), Some(&CLIENT_ID.into()));
	assert_eq!(
		pairs.get("redirect_uri"),
		Some(&format!("http://{hostname}/multipass/api/oauth2/callback"))
	);
	assert_eq!(pairs.get("scope"), Some(&"offline_access compass:view".into()));
	assert_eq!(pairs.get("code_challenge_method"), Some(&"S256".into()));
	assert_eq!(pairs.get("state").map(String::len), Some(32));
}

#[tokio::test]
async fn remembered_refresh_token_skips_the_prompt() {
	let server = MockServer::start_async().await;
	let hostname = server.address().to_string();
	let clock = clock();
	let prompt = Arc::new(PastingPrompt::default());
	let client = headless_client(prompt.clone(), &clock);
	let scopes = Scopes::default();
	let request = UserCredentialsRequest {
		scopes: &scopes,
		hostname: &hostname,
		client_id: CLIENT_ID,
		client_secret: None,
		use_local_webserver: false,
	};
	let first = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("A1", "R1"));
		})
		.await;

	client.user_credentials(request).await.expect("Interactive flow should succeed.");
	first.delete_async().await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("A2", "R2"));
		})
		.await;

	clock.advance(Duration::hours(2));

	let credentials = client.user_credentials(request).await.expect("Refresh should succeed.");

	refresh.assert_calls_async(1).await;

	assert_eq!(credentials.token.expose(), "A2");
	assert_eq!(credentials.expiry, datetime!(2024-01-01 03:00 UTC));
	assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_refresh_token_falls_back_to_the_prompt() {
	let server = MockServer::start_async().await;
	let hostname = server.address().to_string();
	let clock = clock();
	let prompt = Arc::new(PastingPrompt::default());
	let client = headless_client(prompt.clone(), &clock);
	let scopes = Scopes::default();
	let request = UserCredentialsRequest {
		scopes: &scopes,
		hostname: &hostname,
		client_id: CLIENT_ID,
		client_secret: None,
		use_local_webserver: false,
	};
	let first = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("A1", "R1"));
		})
		.await;

	client.user_credentials(request).await.expect("Interactive flow should succeed.");
	first.delete_async().await;

	let rejecting = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let err = client.user_credentials(request).await.expect_err("Both exchanges are rejected.");

	assert!(matches!(err, Error::Api(ref api) if api.oauth_error() == Some("invalid_grant")));

	rejecting.assert_calls_async(2).await;

	assert_eq!(prompt.calls.load(Ordering::SeqCst), 2);
	assert!(!client.has_refresh_token(&hostname, CLIENT_ID));
}

#[tokio::test]
async fn oauth_provider_caches_user_credentials() {
	let server = MockServer::start_async().await;
	let clock = clock();
	let prompt = Arc::new(PastingPrompt::default());
	let client = Arc::new(headless_client(prompt.clone(), &clock));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("A1", "R1"));
		})
		.await;
	let env = ProviderEnvironment::try_default()
		.expect("Default environment should build for tests.")
		.with_clock(Arc::new(clock.clone()))
		.with_user_credentials(client);
	let provider = ProviderRegistry::builtin()
		.resolve(
			OAUTH_PROVIDER,
			Host::new(server.address().to_string()).with_scheme("http"),
			&ProviderSettings::new().with("client_id", CLIENT_ID),
			&env,
		)
		.expect("Authorization-code provider should resolve.");

	assert_eq!(provider.token().await.expect("First token should be fetched.").expose(), "A1");
	assert_eq!(provider.token().await.expect("Token should be cached.").expose(), "A1");

	mock.assert_calls_async(1).await;

	let authorize_url = prompt.seen.lock()[0].clone();
	let pairs: HashMap<_, _> = authorize_url.query_pairs().into_owned().collect();

	assert_eq!(pairs.get("scope"), Some(&DEFAULT_OAUTH_SCOPES.join(" ")));
}
