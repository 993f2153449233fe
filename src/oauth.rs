//! User-credential acquisition for the authorization-code grant.
//!
//! [`UserCredentialsClient`] is the seam the OAuth strategy calls to obtain a user token.
//! [`HeadlessUserCredentialsClient`] is the built-in implementation: it reuses an in-memory
//! refresh token when one is known, and otherwise walks the user through an Authorization
//! Code + PKCE exchange by printing the authorize URL and reading back the redirect.

pub mod session;

pub use oauth2;
pub use session::*;

// std
use std::{
	io::{self, BufRead, Write},
	thread,
};
// crates.io
use async_lock::OnceCell as AsyncOnceCell;
use oauth2::{
	AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse,
	TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{Host, Scopes, TokenSecret},
	clock::{Clock, SystemClock},
	error::{ApiError, ConfigError, TransientError, TransportError},
	http::{ReqwestHttpClient, map_reqwest_error},
	obs::{AcquireSpan, ProviderKind},
	provider::TokenFuture,
};

/// Token endpoint path on a Foundry host.
pub const TOKEN_PATH: &str = "/multipass/api/oauth2/token";
/// Authorization endpoint path on a Foundry host.
pub const AUTHORIZE_PATH: &str = "/multipass/api/oauth2/authorize";
/// Default redirect path registered for headless clients.
pub const CALLBACK_PATH: &str = "/multipass/api/oauth2/callback";

type TokenEndpointClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Arguments passed to a [`UserCredentialsClient`].
#[derive(Clone, Copy, Debug)]
pub struct UserCredentialsRequest<'a> {
	/// Scopes requested for the user token.
	pub scopes: &'a Scopes,
	/// Domain of the Foundry host.
	pub hostname: &'a str,
	/// OAuth client identifier.
	pub client_id: &'a str,
	/// OAuth client secret, when the client is confidential.
	pub client_secret: Option<&'a TokenSecret>,
	/// Whether the flow may spawn a local webserver to catch the redirect.
	pub use_local_webserver: bool,
}

/// Token and absolute expiry reported by a [`UserCredentialsClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserCredentials {
	/// Access token.
	pub token: TokenSecret,
	/// Instant after which the token is no longer valid.
	pub expiry: OffsetDateTime,
}

/// Obtains user credentials on behalf of the authorization-code strategy.
pub trait UserCredentialsClient
where
	Self: Send + Sync,
{
	/// Returns a user token for the requested host, client, and scopes.
	fn user_credentials<'a>(
		&'a self,
		request: UserCredentialsRequest<'a>,
	) -> TokenFuture<'a, UserCredentials>;
}

/// Shows the authorize URL to a user and returns what they paste back.
pub trait CodePrompt
where
	Self: Send + Sync,
{
	/// Presents `authorize_url` and resolves to either the redirect URL or the raw code.
	fn authorization_code<'a>(&'a self, authorize_url: &'a Url) -> TokenFuture<'a, String>;
}

/// Prompt on stderr, answer on stdin.
///
/// The line is read on a dedicated thread, so waiting for the user never blocks an executor
/// worker. Dropping the future leaves that thread parked on stdin until a line arrives.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdinCodePrompt;
impl StdinCodePrompt {
	fn show(authorize_url: &Url) -> io::Result<()> {
		let mut stderr = io::stderr().lock();

		writeln!(stderr, "Open the following URL in your browser and sign in:")?;
		writeln!(stderr, "{authorize_url}")?;
		write!(stderr, "Paste the redirect URL or the authorization code: ")?;

		stderr.flush()
	}
}
impl CodePrompt for StdinCodePrompt {
	fn authorization_code<'a>(&'a self, authorize_url: &'a Url) -> TokenFuture<'a, String> {
		Box::pin(async move {
			Self::show(authorize_url).map_err(|source| ConfigError::Prompt { source })?;

			let answer = Arc::new(AsyncOnceCell::new());
			let reader = answer.clone();

			thread::Builder::new()
				.name("foundry-token-provider-stdin".into())
				.spawn(move || {
					let mut line = String::new();
					let read = io::stdin().lock().read_line(&mut line).map(|_| line);

					let _ = reader.set_blocking(read);
				})
				.map_err(|source| ConfigError::Prompt { source })?;

			match answer.wait().await {
				Ok(line) => Ok(line.clone()),
				Err(err) => Err(ConfigError::Prompt {
					source: io::Error::new(err.kind(), err.to_string()),
				}
				.into()),
			}
		})
	}
}

/// Authorization-code client that never needs a local webserver.
pub struct HeadlessUserCredentialsClient {
	http_client: ReqwestHttpClient,
	prompt: Arc<dyn CodePrompt>,
	clock: Arc<dyn Clock>,
	scheme: String,
	redirect: Option<Url>,
	refresh_tokens: Mutex<HashMap<(String, String), TokenSecret>>,
}
impl HeadlessUserCredentialsClient {
	/// Creates a client that asks `prompt` for authorization codes and exchanges them
	/// through `http_client`.
	///
	/// Pass a client built with [`ReqwestHttpClient::try_default`] so token exchanges never
	/// follow redirects.
	pub fn new(prompt: Arc<dyn CodePrompt>, http_client: ReqwestHttpClient) -> Self {
		Self {
			http_client,
			prompt,
			clock: Arc::new(SystemClock),
			scheme: Host::DEFAULT_SCHEME.into(),
			redirect: None,
			refresh_tokens: Mutex::new(HashMap::new()),
		}
	}

	/// Replaces the clock used to turn `expires_in` into an absolute expiry.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Overrides the URL scheme used to reach the host (defaults to `https`).
	pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.scheme = scheme.into();

		self
	}

	/// Overrides the redirect URI (defaults to the host's multipass callback).
	pub fn with_redirect_uri(mut self, redirect: Url) -> Self {
		self.redirect = Some(redirect);

		self
	}

	/// Returns true if a refresh token is remembered for the host and client.
	pub fn has_refresh_token(&self, hostname: &str, client_id: &str) -> bool {
		self.refresh_tokens.lock().contains_key(&(hostname.to_owned(), client_id.to_owned()))
	}

	/// Forgets every remembered refresh token.
	pub fn forget_refresh_tokens(&self) {
		self.refresh_tokens.lock().clear();
	}

	fn endpoints(&self, hostname: &str) -> Result<AuthorizationEndpoints> {
		let host = Host::new(hostname).with_scheme(self.scheme.clone());
		let redirect = match &self.redirect {
			Some(redirect) => redirect.clone(),
			None => host.endpoint(CALLBACK_PATH)?,
		};

		Ok(AuthorizationEndpoints {
			authorize: host.endpoint(AUTHORIZE_PATH)?,
			token: host.endpoint(TOKEN_PATH)?,
			redirect,
		})
	}

	fn oauth_client(
		&self,
		request: &UserCredentialsRequest<'_>,
		endpoints: &AuthorizationEndpoints,
	) -> TokenEndpointClient {
		let mut client = BasicClient::new(ClientId::new(request.client_id.to_owned()))
			.set_token_uri(TokenUrl::from_url(endpoints.token.clone()))
			.set_redirect_uri(RedirectUrl::from_url(endpoints.redirect.clone()));

		if let Some(secret) = request.client_secret {
			client = client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}

		client
	}

	async fn refresh(
		&self,
		client: &TokenEndpointClient,
		request: &UserCredentialsRequest<'_>,
		refresh_token: &TokenSecret,
	) -> Result<UserCredentials> {
		let refresh_token = RefreshToken::new(refresh_token.expose().to_owned());
		let mut exchange = client.exchange_refresh_token(&refresh_token);

		for scope in request.scopes.iter() {
			exchange = exchange.add_scope(Scope::new(scope.to_owned()));
		}

		let response = exchange.request_async(&self.http_client).await.map_err(map_request_error)?;

		self.store_response(request, response)
	}

	async fn authorize(
		&self,
		client: &TokenEndpointClient,
		request: &UserCredentialsRequest<'_>,
		endpoints: &AuthorizationEndpoints,
	) -> Result<UserCredentials> {
		let session = AuthorizationSession::start(endpoints, request.client_id, request.scopes);
		let input = self.prompt.authorization_code(&session.authorize_url).await?;
		let code = session.code_from_input(&input)?;
		let response = client
			.exchange_code(AuthorizationCode::new(code))
			.set_pkce_verifier(PkceCodeVerifier::new(session.verifier().to_owned()))
			.request_async(&self.http_client)
			.await
			.map_err(map_request_error)?;

		self.store_response(request, response)
	}

	fn store_response(
		&self,
		request: &UserCredentialsRequest<'_>,
		response: BasicTokenResponse,
	) -> Result<UserCredentials> {
		let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
		let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

		if expires_in <= 0 {
			return Err(ConfigError::NonPositiveExpiresIn.into());
		}

		let expiry = self
			.clock
			.now()
			.checked_add(Duration::seconds(expires_in))
			.ok_or(ConfigError::ExpiresInOutOfRange)?;

		if let Some(refresh) = response.refresh_token() {
			self.refresh_tokens.lock().insert(
				(request.hostname.to_owned(), request.client_id.to_owned()),
				TokenSecret::new(refresh.secret().to_owned()),
			);
		}

		Ok(UserCredentials {
			token: TokenSecret::new(response.access_token().secret().to_owned()),
			expiry,
		})
	}
}
impl UserCredentialsClient for HeadlessUserCredentialsClient {
	fn user_credentials<'a>(
		&'a self,
		request: UserCredentialsRequest<'a>,
	) -> TokenFuture<'a, UserCredentials> {
		Box::pin(async move {
			if request.use_local_webserver {
				return Err(ConfigError::LocalWebserverUnsupported.into());
			}

			let endpoints = self.endpoints(request.hostname)?;
			let client = self.oauth_client(&request, &endpoints);
			let key = (request.hostname.to_owned(), request.client_id.to_owned());
			let remembered = self.refresh_tokens.lock().get(&key).cloned();

			if let Some(refresh_token) = remembered {
				let span = AcquireSpan::new(ProviderKind::AuthorizationCode, request.hostname, "refresh");

				match span.instrument(self.refresh(&client, &request, &refresh_token)).await {
					Ok(credentials) => return Ok(credentials),
					Err(err @ Error::Api(_)) => {
						span.record_failure(&err);
						self.refresh_tokens.lock().remove(&key);
					},
					Err(err) => return Err(err),
				}
			}

			AcquireSpan::new(ProviderKind::AuthorizationCode, request.hostname, "authorize")
				.instrument(self.authorize(&client, &request, &endpoints))
				.await
		})
	}
}
impl Debug for HeadlessUserCredentialsClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HeadlessUserCredentialsClient")
			.field("scheme", &self.scheme)
			.field("redirect", &self.redirect)
			.field("remembered_refresh_tokens", &self.refresh_tokens.lock().len())
			.finish()
	}
}

fn map_request_error(err: BasicRequestTokenError<HttpClientError<ReqwestError>>) -> Error {
	match err {
		RequestTokenError::ServerResponse(response) => ApiError {
			status: None,
			body: serde_json::to_value(&response).unwrap_or(serde_json::Value::Null),
		}
		.into(),
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) => map_reqwest_error(*inner),
		RequestTokenError::Request(HttpClientError::Http(inner)) => ConfigError::from(inner).into(),
		RequestTokenError::Request(HttpClientError::Io(inner)) => TransportError::Io(inner).into(),
		RequestTokenError::Request(other) => TransientError::TokenEndpoint {
			message: format!("HTTP client error occurred while calling the token endpoint: {other}"),
			status: None,
		}
		.into(),
		RequestTokenError::Parse(source, _body) =>
			TransientError::TokenResponseParse { source, status: None }.into(),
		RequestTokenError::Other(message) =>
			TransientError::TokenEndpoint { message, status: None }.into(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[test]
	fn oauth_error_payload_becomes_api_error() {
		let response: oauth2::basic::BasicErrorResponse =
			serde_json::from_value(serde_json::json!({ "error": "invalid_grant" }))
				.expect("Error payload fixture should deserialize.");
		let err = map_request_error(RequestTokenError::ServerResponse(response));

		match err {
			Error::Api(api) => assert_eq!(api.oauth_error(), Some("invalid_grant")),
			other => panic!("Expected an API error, got {other:?}."),
		}
	}

	#[tokio::test]
	async fn local_webserver_is_refused() {
		let client =
			HeadlessUserCredentialsClient::new(Arc::new(StdinCodePrompt), test_reqwest_http_client());
		let scopes = Scopes::default();
		let err = client
			.user_credentials(UserCredentialsRequest {
				scopes: &scopes,
				hostname: "stack.example.com",
				client_id: "client",
				client_secret: None,
				use_local_webserver: true,
			})
			.await
			.expect_err("Local webserver flows are unsupported.");

		assert!(matches!(err, Error::Config(ConfigError::LocalWebserverUnsupported)));
	}

	#[test]
	fn default_endpoints_follow_host_and_scheme() {
		let client =
			HeadlessUserCredentialsClient::new(Arc::new(StdinCodePrompt), test_reqwest_http_client())
				.with_scheme("http");
		let endpoints = client.endpoints("127.0.0.1:8080").expect("Endpoints should build.");

		assert_eq!(endpoints.token.as_str(), "http://127.0.0.1:8080/multipass/api/oauth2/token");
		assert_eq!(
			endpoints.authorize.as_str(),
			"http://127.0.0.1:8080/multipass/api/oauth2/authorize"
		);
		assert_eq!(
			endpoints.redirect.as_str(),
			"http://127.0.0.1:8080/multipass/api/oauth2/callback"
		);
	}
}
