//! Token provider capability and its concrete implementations.
//!
//! [`TokenProvider`] is the single seam API clients depend on. `cached` holds the
//! expiry-aware, single-flight [`CachedTokenProvider`] and the [`AcquireStrategy`] hook it
//! delegates to; `static_token`, `oauth`, and `hosted` supply the built-in strategies.

pub mod cached;
pub mod hosted;
pub mod oauth;
pub mod static_token;

pub use cached::*;
pub use hosted::*;
pub use oauth::*;
pub use static_token::*;

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{Host, TokenSecret},
	error::ConfigError,
	obs::ProviderKind,
};

/// Boxed future returned by provider and strategy operations.
pub type TokenFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Supplies bearer tokens for one [`Host`] and decorates outgoing requests with them.
///
/// Implementations are shared across tasks (`Send + Sync`), so every operation returns a
/// boxed `Send` future. Only [`host`](TokenProvider::host) and
/// [`kind`](TokenProvider::kind) are mandatory; the default
/// [`token`](TokenProvider::token) fails with [`Error::NotImplemented`].
pub trait TokenProvider
where
	Self: Send + Sync + Debug,
{
	/// Service the tokens are issued for.
	fn host(&self) -> &Host;

	/// Strategy label used for observability.
	fn kind(&self) -> ProviderKind;

	/// Returns a token that is valid for at least the provider's skew margin.
	fn token(&self) -> TokenFuture<'_, TokenSecret> {
		Box::pin(async { Err(Error::NotImplemented { operation: "TokenProvider::token" }) })
	}

	/// Drops any cached credential so the next [`token`](TokenProvider::token) call
	/// re-acquires. Providers without a cache ignore this.
	fn invalidate_cache(&self) -> TokenFuture<'_, ()> {
		Box::pin(async { Ok(()) })
	}

	/// Inserts `authorization: Bearer <token>` unless an authorization header is present.
	///
	/// When the header already exists no token is fetched and the map is left untouched.
	fn authorize_headers<'a>(&'a self, headers: &'a mut HeaderMap) -> TokenFuture<'a, ()> {
		Box::pin(async move {
			if headers.contains_key(AUTHORIZATION) {
				return Ok(());
			}

			let token = self.token().await?;

			headers.insert(AUTHORIZATION, bearer_header_value(&token)?);

			Ok(())
		})
	}

	/// Applies [`authorize_headers`](TokenProvider::authorize_headers) to a request.
	fn attach_auth(&self, mut request: reqwest::Request) -> TokenFuture<'_, reqwest::Request> {
		Box::pin(async move {
			self.authorize_headers(request.headers_mut()).await?;

			Ok(request)
		})
	}
}

/// Builds a sensitive `Bearer <token>` header value.
pub fn bearer_header_value(token: &TokenSecret) -> Result<HeaderValue> {
	let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
		.map_err(|_| ConfigError::InvalidTokenHeader)?;

	value.set_sensitive(true);

	Ok(value)
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::{Method, header::HeaderName};
	// self
	use super::*;

	#[derive(Debug)]
	struct Bare(Host);
	impl TokenProvider for Bare {
		fn host(&self) -> &Host {
			&self.0
		}

		fn kind(&self) -> ProviderKind {
			ProviderKind::External
		}
	}

	#[tokio::test]
	async fn base_token_is_not_implemented() {
		let provider = Bare(Host::new("stack.example.com"));
		let err = provider.token().await.expect_err("Base provider must not produce tokens.");

		assert!(matches!(err, Error::NotImplemented { .. }));
		assert!(provider.invalidate_cache().await.is_ok());
	}

	#[tokio::test]
	async fn existing_authorization_header_skips_token_lookup() {
		let provider = Bare(Host::new("stack.example.com"));
		let url = Url::parse("https://stack.example.com/api").expect("Request URL should parse.");
		let mut request = reqwest::Request::new(Method::GET, url);
		let name = HeaderName::from_bytes(b"Authorization").expect("Header name should parse.");

		request.headers_mut().insert(name, HeaderValue::from_static("Basic abc"));

		let request = provider
			.attach_auth(request)
			.await
			.expect("Existing headers must be kept without fetching a token.");

		assert_eq!(
			request.headers().get(AUTHORIZATION),
			Some(&HeaderValue::from_static("Basic abc")),
		);
	}

	#[test]
	fn bearer_value_is_sensitive_and_validated() {
		let value = bearer_header_value(&TokenSecret::new("T1")).expect("Plain tokens are valid.");

		assert_eq!(value, "Bearer T1");
		assert!(value.is_sensitive());
		assert!(bearer_header_value(&TokenSecret::new("bad\ntoken")).is_err());
	}
}
