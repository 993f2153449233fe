//! Expiry-aware token cache with a single-flight guard around pluggable acquisition.
//!
//! [`CachedTokenProvider`] owns at most one [`CredentialRecord`]. Every `token()` call takes
//! the provider's async mutex, compares the cached expiry against `now + skew`, and only
//! calls [`AcquireStrategy::acquire`] when the record is missing or about to expire.
//! Concurrent callers therefore piggy-back on one in-flight acquisition instead of
//! stampeding the token endpoint. A failed acquisition leaves the cache untouched.

// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, Host, TokenSecret},
	clock::{Clock, SystemClock},
	obs::{self, AcquireOutcome, AcquireSpan, ProviderKind},
	provider::{HostedHeaderStrategy, OAuthStrategy, TokenFuture, TokenProvider},
};

/// Margin kept in reserve before a cached token's expiry.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::seconds(10);

/// Produces fresh credentials for a [`CachedTokenProvider`].
pub trait AcquireStrategy
where
	Self: Send + Sync,
{
	/// Strategy label used for observability.
	fn kind(&self) -> ProviderKind {
		ProviderKind::External
	}

	/// Fetches a new credential; `now` comes from the provider's clock.
	fn acquire<'a>(
		&'a self,
		host: &'a Host,
		now: OffsetDateTime,
	) -> TokenFuture<'a, CredentialRecord> {
		let _ = (host, now);

		Box::pin(async { Err(Error::NotImplemented { operation: "AcquireStrategy::acquire" }) })
	}
}

/// Closed set of acquisition strategies selectable through the registry.
pub enum Strategy {
	/// OAuth authorization-code or client-credentials grant.
	OAuth(OAuthStrategy),
	/// Token forwarded by the hosting web application.
	HostedHeader(HostedHeaderStrategy),
	/// Strategy contributed outside this crate.
	External(Arc<dyn AcquireStrategy>),
}
impl AcquireStrategy for Strategy {
	fn kind(&self) -> ProviderKind {
		match self {
			Strategy::OAuth(strategy) => strategy.kind(),
			Strategy::HostedHeader(strategy) => strategy.kind(),
			Strategy::External(strategy) => strategy.kind(),
		}
	}

	fn acquire<'a>(
		&'a self,
		host: &'a Host,
		now: OffsetDateTime,
	) -> TokenFuture<'a, CredentialRecord> {
		match self {
			Strategy::OAuth(strategy) => strategy.acquire(host, now),
			Strategy::HostedHeader(strategy) => strategy.acquire(host, now),
			Strategy::External(strategy) => strategy.acquire(host, now),
		}
	}
}
impl From<OAuthStrategy> for Strategy {
	fn from(strategy: OAuthStrategy) -> Self {
		Self::OAuth(strategy)
	}
}
impl From<HostedHeaderStrategy> for Strategy {
	fn from(strategy: HostedHeaderStrategy) -> Self {
		Self::HostedHeader(strategy)
	}
}
impl From<Arc<dyn AcquireStrategy>> for Strategy {
	fn from(strategy: Arc<dyn AcquireStrategy>) -> Self {
		Self::External(strategy)
	}
}
impl Debug for Strategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Strategy").field(&self.kind()).finish()
	}
}

/// Caching decorator around an [`AcquireStrategy`].
pub struct CachedTokenProvider<S = Strategy>
where
	S: AcquireStrategy,
{
	host: Host,
	strategy: S,
	clock: Arc<dyn Clock>,
	clock_skew: Duration,
	cached: AsyncMutex<Option<CredentialRecord>>,
}
impl<S> CachedTokenProvider<S>
where
	S: AcquireStrategy,
{
	/// Creates a provider with an empty cache, the system clock, and the default skew.
	pub fn new(host: Host, strategy: S) -> Self {
		Self {
			host,
			strategy,
			clock: Arc::new(SystemClock),
			clock_skew: DEFAULT_CLOCK_SKEW,
			cached: AsyncMutex::new(None),
		}
	}

	/// Creates a provider whose cache starts with `record`.
	pub fn seeded(host: Host, strategy: S, record: CredentialRecord) -> Self {
		let mut provider = Self::new(host, strategy);

		provider.cached = AsyncMutex::new(Some(record));

		provider
	}

	/// Replaces the clock consulted for freshness checks.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Overrides the skew margin (defaults to 10 seconds); negative values clamp to zero.
	pub fn with_clock_skew(mut self, skew: Duration) -> Self {
		self.clock_skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Configured skew margin.
	pub fn clock_skew(&self) -> Duration {
		self.clock_skew
	}

	/// Strategy backing this provider.
	pub fn strategy(&self) -> &S {
		&self.strategy
	}

	/// Snapshot of the cached record, if any.
	pub async fn cached_record(&self) -> Option<CredentialRecord> {
		self.cached.lock().await.clone()
	}

	/// Returns the cached token or acquires a new one under the single-flight guard.
	pub async fn cached_token(&self) -> Result<TokenSecret> {
		let kind = self.strategy.kind();
		let span = AcquireSpan::new(kind, &self.host.domain, "token");

		obs::record_acquire_outcome(kind, AcquireOutcome::Attempt);

		let result: Result<(TokenSecret, AcquireOutcome)> = span
			.instrument(async {
				let mut cached = self.cached.lock().await;
				let now = self.clock.now();

				if let Some(current) =
					cached.as_ref().filter(|record| record.is_fresh_at(now, self.clock_skew))
				{
					return Ok((current.token.clone(), AcquireOutcome::CacheHit));
				}

				let record = self.strategy.acquire(&self.host, now).await?;
				let token = record.token.clone();

				obs::record_token_lifetime(kind, record.expires_at - now);

				*cached = Some(record);

				Ok((token, AcquireOutcome::Success))
			})
			.await;

		match result {
			Ok((token, outcome)) => {
				span.record_outcome(outcome);
				obs::record_acquire_outcome(kind, outcome);

				Ok(token)
			},
			Err(err) => {
				span.record_failure(&err);
				obs::record_acquire_outcome(kind, AcquireOutcome::Failure);

				Err(err)
			},
		}
	}

	/// Clears the cached record unconditionally.
	pub async fn clear(&self) {
		*self.cached.lock().await = None;
	}
}
impl<S> TokenProvider for CachedTokenProvider<S>
where
	S: AcquireStrategy,
{
	fn host(&self) -> &Host {
		&self.host
	}

	fn kind(&self) -> ProviderKind {
		self.strategy.kind()
	}

	fn token(&self) -> TokenFuture<'_, TokenSecret> {
		Box::pin(self.cached_token())
	}

	fn invalidate_cache(&self) -> TokenFuture<'_, ()> {
		Box::pin(async move {
			self.clear().await;

			Ok(())
		})
	}
}
impl<S> Debug for CachedTokenProvider<S>
where
	S: AcquireStrategy,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedTokenProvider")
			.field("host", &self.host)
			.field("kind", &self.strategy.kind())
			.field("clock_skew", &self.clock_skew)
			.finish()
	}
}
