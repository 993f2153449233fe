//! Crate-level error types shared across providers, strategies, and the registry.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token endpoint answered with an explicit error payload.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Base capability invoked directly instead of through a concrete provider.
	#[error("{operation} is not implemented by this token provider.")]
	NotImplemented {
		/// Operation that was invoked.
		operation: &'static str,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Host cannot be turned into a valid endpoint URL.
	#[error("Host `{host}` does not form a valid URL.")]
	InvalidHost {
		/// Offending host URL.
		host: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Requested scopes are invalid.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token value cannot be carried in an HTTP header.
	#[error("Token contains characters that are not allowed in an HTTP header.")]
	InvalidTokenHeader,
	/// Client credentials cannot be encoded as ISO-8859-1.
	#[error("Client id and secret must only contain ISO-8859-1 characters.")]
	NonLatin1Credentials,

	/// Grant requires a client secret but none was configured.
	#[error("You need to provide a client secret for the {grant} grant type.")]
	MissingClientSecret {
		/// Grant label.
		grant: String,
	},
	/// Grant type is not recognized.
	#[error("Grant type `{grant}` is not implemented.")]
	UnsupportedGrant {
		/// Grant label as configured.
		grant: String,
	},
	/// The interactive flow was asked to spawn a local webserver.
	#[error("Local webserver authorization is not supported; use the headless flow.")]
	LocalWebserverUnsupported,
	/// The authorization prompt could not read user input.
	#[error("Unable to read the authorization code.")]
	Prompt {
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The pasted redirect URL did not contain an authorization code.
	#[error("Redirect URL does not contain an authorization code.")]
	MissingAuthorizationCode,
	/// The pasted redirect URL carried an unexpected `state`.
	#[error("Authorization state mismatch.")]
	AuthorizationStateMismatch,

	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,

	/// No hosting header source yielded an access token.
	#[error("Could not obtain the access token from the hosting application's headers.")]
	HostedTokenUnavailable,
	/// Header-sourced tokens cannot be renewed by the provider.
	#[error("Token is expired. Please refresh the web page.")]
	HostedTokenExpired,

	/// Registry has no constructor for the requested key.
	#[error("Token provider `{name}` is not registered.")]
	UnknownProvider {
		/// Requested registry key.
		name: String,
	},
	/// Credentials configuration document failed to deserialize.
	#[error("Credentials configuration is invalid.")]
	InvalidConfig {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Provider settings failed to deserialize.
	#[error("Settings for token provider `{provider}` are invalid.")]
	InvalidSettings {
		/// Registry key of the provider.
		provider: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Explicit error payload returned by a token endpoint.
#[derive(Clone, Debug, ThisError)]
#[error("Token endpoint returned an error: {body}.")]
pub struct ApiError {
	/// HTTP status code, when available.
	pub status: Option<u16>,
	/// Full JSON response body.
	pub body: serde_json::Value,
}
impl ApiError {
	/// Returns the OAuth `error` code carried by the payload, if any.
	pub fn oauth_error(&self) -> Option<&str> {
		self.body.get("error").and_then(serde_json::Value::as_str)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
