//! Tokens forwarded by a hosting web application (registry key `app_service`).
//!
//! The hosting app authenticates the user and forwards the access token in the
//! `X-Foundry-AccessToken` header. The token is read once, at construction, and cached for
//! one hour; it cannot be renewed from here, so acquisition always asks the user to reload.

// crates.io
use reqwest::header::HeaderMap;
// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, Host},
	clock::Clock,
	error::ConfigError,
	obs::{AcquireOutcome, AcquireSpan, ProviderKind},
	provider::{AcquireStrategy, CachedTokenProvider, Strategy, TokenFuture},
};

/// Header carrying the forwarded access token.
pub const ACCESS_TOKEN_HEADER: &str = "X-Foundry-AccessToken";
/// Lifetime assumed for a forwarded token.
pub const HOSTED_TOKEN_LIFETIME: Duration = Duration::hours(1);

/// Read-only view over the headers of one inbound request or session.
pub trait HeaderSource
where
	Self: Send + Sync,
{
	/// Short label used in diagnostics (`websocket`, `request`, ...).
	fn label(&self) -> &str;

	/// Returns the value of `name`, matched case-insensitively.
	fn header(&self, name: &str) -> Option<String>;
}
impl HeaderSource for HeaderMap {
	fn label(&self) -> &str {
		"header_map"
	}

	fn header(&self, name: &str) -> Option<String> {
		self.get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
	}
}

/// Owned name/value list for frameworks that do not expose an `http::HeaderMap`.
#[derive(Clone, Debug, Default)]
pub struct StaticHeaders {
	label: String,
	entries: Vec<(String, String)>,
}
impl StaticHeaders {
	/// Creates an empty source with a diagnostic label.
	pub fn new(label: impl Into<String>) -> Self {
		Self { label: label.into(), entries: Vec::new() }
	}

	/// Appends one header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.entries.push((name.into(), value.into()));

		self
	}
}
impl HeaderSource for StaticHeaders {
	fn label(&self) -> &str {
		&self.label
	}

	fn header(&self, name: &str) -> Option<String> {
		self.entries
			.iter()
			.find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.clone())
	}
}

/// Acquisition strategy for header-forwarded tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostedHeaderStrategy;
impl HostedHeaderStrategy {
	/// Builds the initial record from the first source carrying a non-empty token.
	///
	/// Sources are consulted in order; the record expires [`HOSTED_TOKEN_LIFETIME`] after `now`.
	pub fn extract(
		sources: &[Arc<dyn HeaderSource>],
		now: OffsetDateTime,
	) -> Result<CredentialRecord> {
		sources
			.iter()
			.filter_map(|source| source.header(ACCESS_TOKEN_HEADER))
			.find(|token| !token.is_empty())
			.map(|token| CredentialRecord::expiring_in(token, now, HOSTED_TOKEN_LIFETIME))
			.ok_or_else(|| ConfigError::HostedTokenUnavailable.into())
	}
}
impl AcquireStrategy for HostedHeaderStrategy {
	fn kind(&self) -> ProviderKind {
		ProviderKind::HostedHeader
	}

	fn acquire<'a>(
		&'a self,
		_host: &'a Host,
		_now: OffsetDateTime,
	) -> TokenFuture<'a, CredentialRecord> {
		Box::pin(async { Err(ConfigError::HostedTokenExpired.into()) })
	}
}

impl CachedTokenProvider<Strategy> {
	/// Creates a provider seeded from the hosting application's headers.
	///
	/// Fails with [`ConfigError::HostedTokenUnavailable`] when no source yields the token.
	pub fn from_hosting_headers(
		host: Host,
		sources: &[Arc<dyn HeaderSource>],
		clock: Arc<dyn Clock>,
	) -> Result<Self> {
		let span = AcquireSpan::new(ProviderKind::HostedHeader, &host.domain, "extract");
		let record = span
			.in_scope(|| HostedHeaderStrategy::extract(sources, clock.now()))
			.inspect_err(|err| span.record_failure(err))?;

		span.record_outcome(AcquireOutcome::Success);

		Ok(Self::seeded(host, HostedHeaderStrategy.into(), record).with_clock(clock))
	}
}
