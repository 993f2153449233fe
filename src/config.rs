//! Serde-backed credentials configuration.
//!
//! ```json
//! {
//!   "host": { "domain": "stack.palantirfoundry.com" },
//!   "token_provider": { "name": "oauth", "settings": { "client_id": "..." } }
//! }
//! ```
//!
//! `host` may also be a plain domain or a base URL string. When `token_provider` is omitted
//! the `jwt` provider is used with empty settings.

// crates.io
use serde::{Deserializer, de::Error as DeError};
// self
use crate::{
	_prelude::*,
	auth::Host,
	error::ConfigError,
	provider::TokenProvider,
	registry::{JWT_PROVIDER, ProviderEnvironment, ProviderRegistry, ProviderSettings},
};

/// Provider selection inside [`CredentialsConfig`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenProviderConfig {
	/// Registry key.
	#[serde(default = "default_provider_name")]
	pub name: String,
	/// Settings forwarded to the provider constructor.
	#[serde(default)]
	pub settings: ProviderSettings,
}
impl Default for TokenProviderConfig {
	fn default() -> Self {
		Self { name: default_provider_name(), settings: ProviderSettings::default() }
	}
}

/// Host plus token provider selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredentialsConfig {
	/// Target Foundry stack.
	#[serde(deserialize_with = "deserialize_host")]
	pub host: Host,
	/// Provider selection.
	#[serde(default)]
	pub token_provider: TokenProviderConfig,
}
impl CredentialsConfig {
	/// Creates a config that uses the default provider for `host`.
	pub fn new(host: Host) -> Self {
		Self { host, token_provider: TokenProviderConfig::default() }
	}

	/// Selects the provider registered under `name` with `settings`.
	pub fn with_provider(mut self, name: impl Into<String>, settings: ProviderSettings) -> Self {
		self.token_provider = TokenProviderConfig { name: name.into(), settings };

		self
	}

	/// Parses a JSON document, reporting the failing path on error.
	pub fn from_json_str(json: &str) -> Result<Self> {
		let mut deserializer = serde_json::Deserializer::from_str(json);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::InvalidConfig { source }.into())
	}

	/// Builds the configured provider through `registry`.
	pub fn build(
		&self,
		registry: &ProviderRegistry,
		env: &ProviderEnvironment,
	) -> Result<Arc<dyn TokenProvider>> {
		registry.resolve(
			&self.token_provider.name,
			self.host.clone(),
			&self.token_provider.settings,
			env,
		)
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HostRepr {
	Url(String),
	Parts(Host),
}

fn deserialize_host<'de, D>(deserializer: D) -> Result<Host, D::Error>
where
	D: Deserializer<'de>,
{
	match HostRepr::deserialize(deserializer)? {
		HostRepr::Url(raw) => raw.parse().map_err(DeError::custom),
		HostRepr::Parts(host) => Ok(host),
	}
}

fn default_provider_name() -> String {
	JWT_PROVIDER.into()
}
