// self
use crate::{
	_prelude::*,
	obs::{AcquireOutcome, ProviderKind},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedAcquire<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedAcquire<F> = F;

/// Span covering one token acquisition against a host.
///
/// The span is opened with `provider`, `host`, and `stage`; the `outcome` field stays empty
/// until [`AcquireSpan::record_outcome`] or [`AcquireSpan::record_failure`] fills it in.
#[derive(Clone, Debug)]
pub struct AcquireSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl AcquireSpan {
	/// Opens a span for `kind` acquiring a token from `host` at `stage`.
	pub fn new(kind: ProviderKind, host: &str, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"foundry_token_provider.acquire",
				provider = kind.as_str(),
				host,
				stage,
				outcome = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, host, stage);

			Self {}
		}
	}

	/// Runs a synchronous section inside the span.
	pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
		#[cfg(feature = "tracing")]
		{
			self.span.in_scope(f)
		}
		#[cfg(not(feature = "tracing"))]
		{
			f()
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedAcquire<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}

	/// Stores the terminal outcome on the span.
	pub fn record_outcome(&self, outcome: AcquireOutcome) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("outcome", outcome.as_str());
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = outcome;
		}
	}

	/// Marks the span failed and emits a warning carrying the error.
	pub fn record_failure(&self, err: &Error) {
		self.record_outcome(AcquireOutcome::Failure);

		#[cfg(feature = "tracing")]
		{
			tracing::warn!(parent: &self.span, error = %err, "Token acquisition failed.");
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = err;
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ConfigError;

	#[test]
	fn sync_sections_return_their_value() {
		let span = AcquireSpan::new(ProviderKind::HostedHeader, "stack.example.com", "extract");

		assert_eq!(span.in_scope(|| "H1"), "H1");

		span.record_failure(&ConfigError::HostedTokenUnavailable.into());
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = AcquireSpan::new(ProviderKind::ClientCredentials, "stack.example.com", "token");
		let value = span.instrument(async { 42 }).await;

		span.record_outcome(AcquireOutcome::Success);

		assert_eq!(value, 42);
	}
}
