//! Optional observability helpers for token acquisition.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `foundry_token_provider.acquire` with `provider`,
//!   `host`, `stage`, and `outcome` fields, plus a warning event when acquisition fails.
//! - Enable `metrics` to increment `foundry_token_provider_acquire_total` (labeled by
//!   `provider` and `outcome`) and to record freshly acquired token lifetimes in the
//!   `foundry_token_provider_token_lifetime_seconds` histogram.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Token provider kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
	/// Static token supplied at construction.
	Static,
	/// OAuth authorization-code grant.
	AuthorizationCode,
	/// OAuth client-credentials grant.
	ClientCredentials,
	/// OAuth grant type that is not recognized.
	UnsupportedGrant,
	/// Token forwarded by a hosting web application.
	HostedHeader,
	/// Strategy contributed outside this crate.
	External,
}
impl ProviderKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProviderKind::Static => "static",
			ProviderKind::AuthorizationCode => "authorization_code",
			ProviderKind::ClientCredentials => "client_credentials",
			ProviderKind::UnsupportedGrant => "unsupported_grant",
			ProviderKind::HostedHeader => "hosted_header",
			ProviderKind::External => "external",
		}
	}
}
impl Display for ProviderKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each `token()` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireOutcome {
	/// Entry to a provider's `token()`.
	Attempt,
	/// Cached record was fresh; no acquisition happened.
	CacheHit,
	/// Acquisition completed.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl AcquireOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AcquireOutcome::Attempt => "attempt",
			AcquireOutcome::CacheHit => "cache_hit",
			AcquireOutcome::Success => "success",
			AcquireOutcome::Failure => "failure",
		}
	}
}
impl Display for AcquireOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
