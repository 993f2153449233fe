//! Provider for a token supplied up front (registry key `jwt`).

// self
use crate::{
	_prelude::*,
	auth::{Host, TokenSecret},
	obs::ProviderKind,
	provider::{TokenFuture, TokenProvider},
};

/// Settings accepted by the `jwt` registry entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaticTokenSettings {
	/// Token returned on every call.
	pub jwt: TokenSecret,
}

/// Returns the same token forever; it never expires and never contacts the network.
#[derive(Clone, Debug)]
pub struct StaticTokenProvider {
	host: Host,
	token: TokenSecret,
}
impl StaticTokenProvider {
	/// Creates a provider returning `token` for `host`.
	pub fn new(host: Host, token: impl Into<TokenSecret>) -> Self {
		Self { host, token: token.into() }
	}

	/// Creates a provider from registry settings.
	pub fn from_settings(host: Host, settings: StaticTokenSettings) -> Self {
		Self::new(host, settings.jwt)
	}
}
impl TokenProvider for StaticTokenProvider {
	fn host(&self) -> &Host {
		&self.host
	}

	fn kind(&self) -> ProviderKind {
		ProviderKind::Static
	}

	fn token(&self) -> TokenFuture<'_, TokenSecret> {
		Box::pin(async move { Ok(self.token.clone()) })
	}
}
