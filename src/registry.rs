//! Name-to-constructor registry for token providers.
//!
//! [`ProviderRegistry::builtin`] knows the `jwt`, `oauth`, and `app_service` providers.
//! Applications extend it with [`ProviderPlugin`]s whose entries are merged at load time and
//! replace built-ins that share a key. Constructors receive the target [`Host`], the raw
//! [`ProviderSettings`], and the [`ProviderEnvironment`] holding injected collaborators.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::Host,
	clock::{Clock, SystemClock},
	error::ConfigError,
	http::ReqwestHttpClient,
	oauth::{CodePrompt, HeadlessUserCredentialsClient, StdinCodePrompt, UserCredentialsClient},
	provider::{
		CachedTokenProvider, HeaderSource, OAuthSettings, OAuthStrategy, StaticTokenProvider,
		StaticTokenSettings, Strategy, TokenProvider,
	},
};

/// Registry key of [`StaticTokenProvider`].
pub const JWT_PROVIDER: &str = "jwt";
/// Registry key of the OAuth provider.
pub const OAUTH_PROVIDER: &str = "oauth";
/// Registry key of the hosted-header provider.
pub const APP_SERVICE_PROVIDER: &str = "app_service";

/// Builds a provider from a host, its settings, and the injected environment.
pub type ProviderConstructor = Arc<
	dyn Fn(Host, &ProviderSettings, &ProviderEnvironment) -> Result<Arc<dyn TokenProvider>>
		+ Send
		+ Sync,
>;

/// Raw JSON settings handed to a provider constructor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderSettings(serde_json::Map<String, serde_json::Value>);
impl ProviderSettings {
	/// Creates empty settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds one setting.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.0.insert(key.into(), value.into());

		self
	}

	/// Looks up one setting.
	pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
		self.0.get(key)
	}

	/// Deserializes typed settings for `provider`, reporting the failing path on error.
	pub fn deserialize<T>(&self, provider: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(serde_json::Value::Object(self.0.clone())).map_err(
			|source| ConfigError::InvalidSettings { provider: provider.to_owned(), source }.into(),
		)
	}
}
impl From<serde_json::Map<String, serde_json::Value>> for ProviderSettings {
	fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
		Self(map)
	}
}

/// Collaborators injected into provider constructors.
#[derive(Clone)]
pub struct ProviderEnvironment {
	clock: Arc<dyn Clock>,
	http_client: ReqwestHttpClient,
	header_sources: Vec<Arc<dyn HeaderSource>>,
	user_credentials: Option<Arc<dyn UserCredentialsClient>>,
	code_prompt: Arc<dyn CodePrompt>,
}
impl ProviderEnvironment {
	/// Creates an environment around `http_client` with the system clock, no header sources,
	/// and the stdin prompt for authorization codes.
	pub fn new(http_client: ReqwestHttpClient) -> Self {
		Self {
			clock: Arc::new(SystemClock),
			http_client,
			header_sources: Vec::new(),
			user_credentials: None,
			code_prompt: Arc::new(StdinCodePrompt),
		}
	}

	/// Creates an environment whose HTTP client never follows redirects.
	pub fn try_default() -> Result<Self> {
		Ok(Self::new(ReqwestHttpClient::try_default()?))
	}

	/// Replaces the clock.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Replaces the HTTP client.
	pub fn with_http_client(mut self, http_client: ReqwestHttpClient) -> Self {
		self.http_client = http_client;

		self
	}

	/// Appends a hosting header source; sources are consulted in insertion order.
	pub fn with_header_source(mut self, source: Arc<dyn HeaderSource>) -> Self {
		self.header_sources.push(source);

		self
	}

	/// Replaces the user-credentials client used by the authorization-code grant.
	pub fn with_user_credentials(mut self, client: Arc<dyn UserCredentialsClient>) -> Self {
		self.user_credentials = Some(client);

		self
	}

	/// Replaces the prompt used by the implicit headless user-credentials client.
	pub fn with_code_prompt(mut self, prompt: Arc<dyn CodePrompt>) -> Self {
		self.code_prompt = prompt;

		self
	}

	/// Injected clock.
	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}

	/// Injected HTTP client.
	pub fn http_client(&self) -> &ReqwestHttpClient {
		&self.http_client
	}

	/// Injected hosting header sources.
	pub fn header_sources(&self) -> &[Arc<dyn HeaderSource>] {
		&self.header_sources
	}

	/// Injected user-credentials client, or a headless client for `host` that shares this
	/// environment's clock, HTTP client, and code prompt and speaks the host's scheme.
	pub fn user_credentials_client(&self, host: &Host) -> Arc<dyn UserCredentialsClient> {
		match &self.user_credentials {
			Some(client) => client.clone(),
			None => Arc::new(
				HeadlessUserCredentialsClient::new(self.code_prompt.clone(), self.http_client.clone())
					.with_clock(self.clock.clone())
					.with_scheme(host.scheme.clone()),
			),
		}
	}
}
impl Debug for ProviderEnvironment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderEnvironment")
			.field("http_client", &self.http_client)
			.field(
				"header_sources",
				&self.header_sources.iter().map(|source| source.label()).collect::<Vec<_>>(),
			)
			.field("user_credentials", &self.user_credentials.is_some())
			.finish()
	}
}

/// Contributes provider constructors to a [`ProviderRegistry`].
pub trait ProviderPlugin
where
	Self: Send + Sync,
{
	/// `(key, constructor)` pairs to register.
	fn providers(&self) -> Vec<(String, ProviderConstructor)>;
}

/// Maps registry keys to provider constructors.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
	constructors: BTreeMap<String, ProviderConstructor>,
}
impl ProviderRegistry {
	/// Creates a registry with no entries.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Creates a registry holding the built-in providers.
	pub fn builtin() -> Self {
		Self::empty()
			.register(JWT_PROVIDER, Arc::new(build_static_provider))
			.register(OAUTH_PROVIDER, Arc::new(build_oauth_provider))
			.register(APP_SERVICE_PROVIDER, Arc::new(build_hosted_provider))
	}

	/// Merges every entry contributed by `plugins`; later entries replace earlier ones.
	pub fn with_plugins<'a, I>(mut self, plugins: I) -> Self
	where
		I: IntoIterator<Item = &'a dyn ProviderPlugin>,
	{
		for plugin in plugins {
			for (key, constructor) in plugin.providers() {
				self.constructors.insert(key, constructor);
			}
		}

		self
	}

	/// Registers one constructor under `key`, replacing any existing entry.
	pub fn register(mut self, key: impl Into<String>, constructor: ProviderConstructor) -> Self {
		self.constructors.insert(key.into(), constructor);

		self
	}

	/// Looks up the constructor registered under `key`.
	pub fn get(&self, key: &str) -> Option<&ProviderConstructor> {
		self.constructors.get(key)
	}

	/// Registered keys in sorted order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.constructors.keys().map(String::as_str)
	}

	/// Builds the provider registered under `key`.
	pub fn resolve(
		&self,
		key: &str,
		host: Host,
		settings: &ProviderSettings,
		env: &ProviderEnvironment,
	) -> Result<Arc<dyn TokenProvider>> {
		let constructor = self
			.get(key)
			.ok_or_else(|| ConfigError::UnknownProvider { name: key.to_owned() })?;

		constructor(host, settings, env)
	}
}
impl Debug for ProviderRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderRegistry").field("keys", &self.keys().collect::<Vec<_>>()).finish()
	}
}

fn build_static_provider(
	host: Host,
	settings: &ProviderSettings,
	_env: &ProviderEnvironment,
) -> Result<Arc<dyn TokenProvider>> {
	let settings: StaticTokenSettings = settings.deserialize(JWT_PROVIDER)?;

	Ok(Arc::new(StaticTokenProvider::from_settings(host, settings)))
}

fn build_oauth_provider(
	host: Host,
	settings: &ProviderSettings,
	env: &ProviderEnvironment,
) -> Result<Arc<dyn TokenProvider>> {
	let settings: OAuthSettings = settings.deserialize(OAUTH_PROVIDER)?;
	let strategy =
		OAuthStrategy::new(settings, env.user_credentials_client(&host), env.http_client.clone())?;
	let provider =
		CachedTokenProvider::new(host, Strategy::from(strategy)).with_clock(env.clock.clone());

	Ok(Arc::new(provider))
}

fn build_hosted_provider(
	host: Host,
	_settings: &ProviderSettings,
	env: &ProviderEnvironment,
) -> Result<Arc<dyn TokenProvider>> {
	let provider =
		CachedTokenProvider::from_hosting_headers(host, &env.header_sources, env.clock.clone())?;

	Ok(Arc::new(provider))
}
