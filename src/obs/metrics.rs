// self
use crate::{
	_prelude::*,
	obs::{AcquireOutcome, ProviderKind},
};

/// Counts `token()` calls per provider kind and outcome when `metrics` is enabled.
pub fn record_acquire_outcome(kind: ProviderKind, outcome: AcquireOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"foundry_token_provider_acquire_total",
			"provider" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records how long a freshly acquired token stays valid, in seconds.
///
/// Lifetimes shorter than the cache skew show up as repeated acquisitions; the histogram
/// makes those visible per provider kind. Negative lifetimes are recorded as zero.
pub fn record_token_lifetime(kind: ProviderKind, lifetime: Duration) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!(
			"foundry_token_provider_token_lifetime_seconds",
			"provider" => kind.as_str()
		)
		.record(lifetime.as_seconds_f64().max(0.));
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, lifetime);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_accept_every_label() {
		for outcome in [
			AcquireOutcome::Attempt,
			AcquireOutcome::CacheHit,
			AcquireOutcome::Success,
			AcquireOutcome::Failure,
		] {
			record_acquire_outcome(ProviderKind::HostedHeader, outcome);
		}

		record_token_lifetime(ProviderKind::ClientCredentials, Duration::hours(1));
		record_token_lifetime(ProviderKind::External, Duration::seconds(-5));
	}
}
