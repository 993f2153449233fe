//! Immutable credential records and their freshness checks.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Token paired with the absolute instant it stops being valid.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
	/// Bearer token; callers must avoid logging it.
	pub token: TokenSecret,
	/// Absolute expiry instant.
	pub expires_at: OffsetDateTime,
}
impl CredentialRecord {
	/// Creates a record from a token and its absolute expiry.
	pub fn new(token: impl Into<TokenSecret>, expires_at: OffsetDateTime) -> Self {
		Self { token: token.into(), expires_at }
	}

	/// Creates a record that expires `lifetime` after `issued_at`.
	pub fn expiring_in(
		token: impl Into<TokenSecret>,
		issued_at: OffsetDateTime,
		lifetime: Duration,
	) -> Self {
		Self::new(token, issued_at + lifetime)
	}

	/// Returns `true` if the record can still be handed out at `now`, keeping `skew` in reserve.
	///
	/// Empty tokens are never considered fresh.
	pub fn is_fresh_at(&self, now: OffsetDateTime, skew: Duration) -> bool {
		!self.token.is_empty() && self.expires_at >= now + skew
	}

	/// Remaining lifetime relative to `now` (negative once expired).
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_at - now
	}
}
impl Debug for CredentialRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialRecord")
			.field("token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
