//! Target service identity (domain + scheme).

// self
use crate::{_prelude::*, error::ConfigError};

/// Identifies the Foundry stack a provider issues tokens for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
	/// Domain, optionally with a port (`example.palantirfoundry.com`, `127.0.0.1:8080`).
	pub domain: String,
	/// URL scheme, `https` unless overridden.
	#[serde(default = "default_scheme")]
	pub scheme: String,
}
impl Host {
	/// Scheme used when none is configured.
	pub const DEFAULT_SCHEME: &'static str = "https";

	/// Creates a host for `domain` using the default scheme.
	pub fn new(domain: impl Into<String>) -> Self {
		Self { domain: domain.into(), scheme: Self::DEFAULT_SCHEME.into() }
	}

	/// Overrides the URL scheme.
	pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.scheme = scheme.into();

		self
	}

	/// Parses a base URL such as `https://example.palantirfoundry.com`.
	pub fn parse(url: &str) -> Result<Self, ConfigError> {
		let parsed =
			Url::parse(url).map_err(|source| ConfigError::InvalidHost { host: url.into(), source })?;
		let domain = parsed.host_str().ok_or_else(|| ConfigError::InvalidHost {
			host: url.into(),
			source: url::ParseError::EmptyHost,
		})?;
		let domain = match parsed.port() {
			Some(port) => format!("{domain}:{port}"),
			None => domain.to_owned(),
		};

		Ok(Self { domain, scheme: parsed.scheme().to_owned() })
	}

	/// Base URL without a trailing slash.
	pub fn url(&self) -> String {
		format!("{}://{}", self.scheme, self.domain)
	}

	/// Joins an absolute `path` (starting with `/`) onto the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let raw = format!("{}{path}", self.url());

		Url::parse(&raw).map_err(|source| ConfigError::InvalidHost { host: raw, source })
	}
}
impl Display for Host {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.url())
	}
}
impl FromStr for Host {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.contains("://") { Self::parse(s) } else { Ok(Self::new(s)) }
	}
}

fn default_scheme() -> String {
	Host::DEFAULT_SCHEME.into()
}
