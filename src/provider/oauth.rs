//! OAuth acquisition strategy (registry key `oauth`).
//!
//! One strategy covers both grants Foundry supports. The authorization-code grant delegates
//! to an injected [`UserCredentialsClient`]; the client-credentials grant talks to the token
//! endpoint directly (see [`client_credentials`]).

pub mod client_credentials;

// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, Host, Scopes, TokenSecret},
	error::ConfigError,
	http::ReqwestHttpClient,
	oauth::{UserCredentialsClient, UserCredentialsRequest},
	obs::ProviderKind,
	provider::{AcquireStrategy, TokenFuture},
};

/// Scopes requested by the authorization-code grant when none are configured.
pub const DEFAULT_OAUTH_SCOPES: [&str; 7] = [
	"offline_access",
	"compass:view",
	"compass:edit",
	"compass:discover",
	"api:write-data",
	"api:read-data",
	"build2:run-build-using-service",
];

/// OAuth grant selected by configuration.
///
/// Unknown grant strings are kept verbatim so construction succeeds and acquisition reports
/// them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OAuthGrant {
	/// `authorization_code`.
	#[default]
	AuthorizationCode,
	/// `client_credentials`.
	ClientCredentials,
	/// Any other grant string.
	Unsupported(String),
}
impl OAuthGrant {
	/// Wire label of the grant.
	pub fn as_str(&self) -> &str {
		match self {
			OAuthGrant::AuthorizationCode => "authorization_code",
			OAuthGrant::ClientCredentials => "client_credentials",
			OAuthGrant::Unsupported(grant) => grant,
		}
	}

	/// Strategy label used for observability.
	pub fn kind(&self) -> ProviderKind {
		match self {
			OAuthGrant::AuthorizationCode => ProviderKind::AuthorizationCode,
			OAuthGrant::ClientCredentials => ProviderKind::ClientCredentials,
			OAuthGrant::Unsupported(_) => ProviderKind::UnsupportedGrant,
		}
	}
}
impl From<String> for OAuthGrant {
	fn from(grant: String) -> Self {
		match grant.as_str() {
			"authorization_code" => Self::AuthorizationCode,
			"client_credentials" => Self::ClientCredentials,
			_ => Self::Unsupported(grant),
		}
	}
}
impl From<&str> for OAuthGrant {
	fn from(grant: &str) -> Self {
		grant.to_owned().into()
	}
}
impl From<OAuthGrant> for String {
	fn from(grant: OAuthGrant) -> Self {
		grant.as_str().to_owned()
	}
}
impl Display for OAuthGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Settings accepted by the `oauth` registry entry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OAuthSettings {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret; mandatory for `client_credentials`.
	#[serde(default)]
	pub client_secret: Option<TokenSecret>,
	/// Grant type; defaults to `authorization_code`.
	#[serde(default)]
	pub grant_type: Option<OAuthGrant>,
	/// Requested scopes; the default depends on the grant.
	#[serde(default)]
	pub scopes: Option<Vec<String>>,
}
impl OAuthSettings {
	/// Creates settings for `client_id` with every optional field unset.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), ..Default::default() }
	}

	/// Sets the client secret.
	pub fn with_client_secret(mut self, secret: impl Into<TokenSecret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the grant type.
	pub fn with_grant(mut self, grant: impl Into<OAuthGrant>) -> Self {
		self.grant_type = Some(grant.into());

		self
	}

	/// Sets the requested scopes.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = Some(scopes.into_iter().map(Into::into).collect());

		self
	}
}

/// Acquires tokens through an OAuth grant.
pub struct OAuthStrategy {
	grant: OAuthGrant,
	client_id: String,
	client_secret: Option<TokenSecret>,
	scopes: Scopes,
	user_credentials: Arc<dyn UserCredentialsClient>,
	http_client: ReqwestHttpClient,
}
impl OAuthStrategy {
	/// Validates `settings` and builds the strategy.
	///
	/// Fails with [`ConfigError::MissingClientSecret`] when the client-credentials grant has
	/// no secret. Unrecognized grants are accepted here and rejected by
	/// [`acquire`](AcquireStrategy::acquire).
	pub fn new(
		settings: OAuthSettings,
		user_credentials: Arc<dyn UserCredentialsClient>,
		http_client: ReqwestHttpClient,
	) -> Result<Self> {
		let OAuthSettings { client_id, client_secret, grant_type, scopes } = settings;
		let grant = grant_type.unwrap_or_default();

		if grant == OAuthGrant::ClientCredentials && client_secret.is_none() {
			return Err(ConfigError::MissingClientSecret { grant: grant.to_string() }.into());
		}

		let scopes = match (scopes, &grant) {
			(Some(scopes), _) => Scopes::new(scopes),
			(None, OAuthGrant::AuthorizationCode) => Scopes::new(DEFAULT_OAUTH_SCOPES),
			(None, _) => Ok(Scopes::default()),
		}
		.map_err(ConfigError::from)?;

		Ok(Self { grant, client_id, client_secret, scopes, user_credentials, http_client })
	}

	/// Configured grant.
	pub fn grant(&self) -> &OAuthGrant {
		&self.grant
	}

	/// OAuth client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Scopes sent with every acquisition.
	pub fn scopes(&self) -> &Scopes {
		&self.scopes
	}

	async fn acquire_user_credentials(&self, host: &Host) -> Result<CredentialRecord> {
		let credentials = self
			.user_credentials
			.user_credentials(UserCredentialsRequest {
				scopes: &self.scopes,
				hostname: &host.domain,
				client_id: &self.client_id,
				client_secret: self.client_secret.as_ref(),
				use_local_webserver: false,
			})
			.await?;

		Ok(CredentialRecord::new(credentials.token, credentials.expiry))
	}
}
impl AcquireStrategy for OAuthStrategy {
	fn kind(&self) -> ProviderKind {
		self.grant.kind()
	}

	fn acquire<'a>(
		&'a self,
		host: &'a Host,
		now: OffsetDateTime,
	) -> TokenFuture<'a, CredentialRecord> {
		Box::pin(async move {
			let secret = match (&self.grant, &self.client_secret) {
				(OAuthGrant::AuthorizationCode, _) =>
					return self.acquire_user_credentials(host).await,
				(grant, None) =>
					return Err(ConfigError::MissingClientSecret { grant: grant.to_string() }.into()),
				(_, Some(secret)) => secret,
			};

			match &self.grant {
				OAuthGrant::ClientCredentials =>
					client_credentials::exchange(
						&self.http_client,
						host,
						&self.client_id,
						secret,
						&self.scopes,
						now,
					)
					.await,
				grant => Err(ConfigError::UnsupportedGrant { grant: grant.to_string() }.into()),
			}
		})
	}
}
impl Debug for OAuthStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthStrategy")
			.field("grant", &self.grant)
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("scopes", &self.scopes)
			.finish()
	}
}
