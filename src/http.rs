//! Transport primitives for token endpoint exchanges.
//!
//! [`ReqwestHttpClient`] is the crate's only dependency on an HTTP stack. It posts the
//! client-credentials form directly and implements [`AsyncHttpClient`] so the `oauth2`
//! crate can drive the authorization-code and refresh exchanges through the same client.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{
	header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue},
	redirect::Policy,
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransientError, TransportError},
};

/// Fixed timeout applied to token endpoint requests issued by this crate.
pub const TOKEN_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token requests must not follow redirects; token endpoints answer directly. Build one
/// with [`ReqwestHttpClient::try_default`], or disable redirects on any custom client passed
/// to [`ReqwestHttpClient::with_client`].
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that never follows redirects.
	pub fn try_default() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Posts a form-encoded body and returns the raw response.
	///
	/// The request carries the provided `authorization` header and the crate-wide
	/// [`TOKEN_REQUEST_TIMEOUT`].
	pub(crate) async fn post_form(
		&self,
		url: Url,
		authorization: HeaderValue,
		form: &[(&str, String)],
	) -> Result<RawResponse> {
		let body = url::form_urlencoded::Serializer::new(String::new())
			.extend_pairs(form.iter().map(|(key, value)| (*key, value.as_str())))
			.finish();
		let response = self
			.0
			.post(url)
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(AUTHORIZATION, authorization)
			.timeout(TOKEN_REQUEST_TIMEOUT)
			.body(body)
			.send()
			.await
			.map_err(map_reqwest_error)?;
		let status = response.status().as_u16();
		let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

		Ok(RawResponse { status, body })
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Debug for ReqwestHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestHttpClient(..)")
	}
}
impl<'c> AsyncHttpClient<'c> for ReqwestHttpClient {
	type Error = HttpClientError<ReqwestError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let mut request: reqwest::Request = request.try_into().map_err(Box::new)?;

			*request.timeout_mut() = Some(TOKEN_REQUEST_TIMEOUT);

			let response = self.0.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Status code and body captured from a token endpoint.
#[derive(Clone, Debug)]
pub(crate) struct RawResponse {
	pub(crate) status: u16,
	pub(crate) body: Vec<u8>,
}

/// Classifies reqwest failures: builder problems are configuration errors, timeouts are
/// transient, everything else is a transport failure.
pub(crate) fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::TokenEndpoint {
			message: "Request timed out while calling the token endpoint.".into(),
			status: err.status().map(|code| code.as_u16()),
		}
		.into();
	}

	TransportError::from(err).into()
}
