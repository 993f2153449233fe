//! Bearer token providers for Foundry API clients: static tokens, OAuth grants, and
//! hosted-app headers behind one expiry-aware, single-flight cache.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod registry;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::Host,
		clock::{Clock, ManualClock},
		http::ReqwestHttpClient,
		registry::ProviderEnvironment,
	};

	/// Fixed instant used as the starting point of simulated clocks in tests.
	pub const TEST_EPOCH: OffsetDateTime = time::macros::datetime!(2024-01-01 00:00 UTC);

	/// Builds a manual clock pinned to [`TEST_EPOCH`].
	pub fn test_clock() -> ManualClock {
		ManualClock::new(TEST_EPOCH)
	}

	/// Builds a plain-HTTP host pointing at a local mock server address.
	pub fn test_host(address: impl Display) -> Host {
		Host::new(address.to_string()).with_scheme("http")
	}

	/// Builds a reqwest HTTP client suitable for talking to `httpmock` servers.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::try_default().expect("Failed to build Reqwest client for tests.")
	}

	/// Constructs a [`ProviderEnvironment`] backed by the provided simulated clock and the
	/// reqwest transport used across integration tests.
	pub fn build_test_environment(clock: &ManualClock) -> ProviderEnvironment {
		let clock: Arc<dyn Clock> = Arc::new(clock.clone());

		ProviderEnvironment::new(test_reqwest_http_client()).with_clock(clock)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
