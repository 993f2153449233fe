//! Client-credentials exchange against the Foundry token endpoint.
//!
//! The body is parsed as JSON whatever the HTTP status is: an `error` member turns into
//! [`ApiError`] carrying the full payload, anything else must hold `access_token` and
//! `expires_in`.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::header::HeaderValue;
// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, Host, Scopes, TokenSecret},
	error::{ApiError, ConfigError, TransientError},
	http::ReqwestHttpClient,
	oauth::TOKEN_PATH,
};

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<i64>,
}

/// Performs one `client_credentials` grant and returns the issued record.
///
/// Expiry is `now + expires_in`; nothing is cached or retried here.
pub async fn exchange(
	http_client: &ReqwestHttpClient,
	host: &Host,
	client_id: &str,
	client_secret: &TokenSecret,
	scopes: &Scopes,
	now: OffsetDateTime,
) -> Result<CredentialRecord> {
	let url = host.endpoint(TOKEN_PATH)?;
	let authorization = basic_authorization(client_id, client_secret)?;
	let mut form = vec![("grant_type", "client_credentials".to_owned())];

	if let Some(scope_value) = scopes.joined() {
		form.push(("scope", scope_value));
	}

	let response = http_client.post_form(url, authorization, &form).await?;

	parse_token_response(response.status, &response.body, now)
}

/// Builds `Basic base64(latin1(client_id:client_secret))`.
pub fn basic_authorization(client_id: &str, client_secret: &TokenSecret) -> Result<HeaderValue> {
	let credentials = format!("{client_id}:{}", client_secret.expose());
	let latin1 = credentials
		.chars()
		.map(|c| u8::try_from(u32::from(c)).map_err(|_| ConfigError::NonLatin1Credentials))
		.collect::<Result<Vec<_>, _>>()?;
	let mut value = HeaderValue::from_str(&format!("Basic {}", STANDARD.encode(latin1)))
		.map_err(|_| ConfigError::InvalidTokenHeader)?;

	value.set_sensitive(true);

	Ok(value)
}

fn parse_token_response(status: u16, body: &[u8], now: OffsetDateTime) -> Result<CredentialRecord> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let payload: serde_json::Value = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| TransientError::TokenResponseParse { source, status: Some(status) })?;

	if payload.get("error").is_some() {
		return Err(ApiError { status: Some(status), body: payload }.into());
	}

	let TokenResponse { access_token, expires_in } = serde_path_to_error::deserialize(payload)
		.map_err(|source| TransientError::TokenResponseParse { source, status: Some(status) })?;
	let expires_in = expires_in.ok_or(ConfigError::MissingExpiresIn)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let expires_at =
		now.checked_add(Duration::seconds(expires_in)).ok_or(ConfigError::ExpiresInOutOfRange)?;

	Ok(CredentialRecord::new(access_token, expires_at))
}
