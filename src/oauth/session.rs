//! Authorization Code + PKCE session state for the headless prompt.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::Scopes, error::ConfigError};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Endpoints used by one headless authorization-code exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationEndpoints {
	/// Authorization endpoint the user opens in a browser.
	pub authorize: Url,
	/// Token endpoint the code is exchanged at.
	pub token: Url,
	/// Redirect URI registered for the client.
	pub redirect: Url,
}

/// Authorization Code + PKCE handshake metadata for one interactive prompt.
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Opaque state value that must round-trip via the redirect.
	pub state: String,
	/// Fully-formed authorize URL shown to the user.
	pub authorize_url: Url,
	pkce: PkcePair,
}
impl AuthorizationSession {
	/// Generates state + PKCE material and the matching authorize URL.
	pub fn start(endpoints: &AuthorizationEndpoints, client_id: &str, scopes: &Scopes) -> Self {
		let state = random_string(STATE_LEN);
		let pkce = PkcePair::generate();
		let authorize_url = build_authorize_url(endpoints, client_id, scopes, &state, &pkce);

		Self { state, authorize_url, pkce }
	}

	/// PKCE code challenge derived from the secret verifier.
	pub fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	/// Extracts the authorization code from what the user pasted.
	///
	/// A pasted `http`/`https` redirect URL must carry a `code` and the session's `state`;
	/// anything else is taken verbatim as the code.
	pub fn code_from_input(&self, input: &str) -> Result<String> {
		let input = input.trim();

		if input.is_empty() {
			return Err(ConfigError::MissingAuthorizationCode.into());
		}

		let Some(redirect) = Url::parse(input)
			.ok()
			.filter(|url| matches!(url.scheme(), "http" | "https"))
		else {
			return Ok(input.to_owned());
		};
		let pairs: HashMap<_, _> = redirect.query_pairs().into_owned().collect();

		if pairs.get("state").map(String::as_str) != Some(self.state.as_str()) {
			return Err(ConfigError::AuthorizationStateMismatch.into());
		}

		pairs
			.get("code")
			.filter(|code| !code.is_empty())
			.cloned()
			.ok_or_else(|| ConfigError::MissingAuthorizationCode.into())
	}

	pub(super) fn verifier(&self) -> &str {
		&self.pkce.verifier
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("state", &self.state)
			.field("authorize_url", &self.authorize_url)
			.field("code_challenge", &self.pkce.challenge)
			.finish()
	}
}

#[derive(Clone)]
struct PkcePair {
	verifier: String,
	challenge: String,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge }
	}
}

fn build_authorize_url(
	endpoints: &AuthorizationEndpoints,
	client_id: &str,
	scopes: &Scopes,
	state: &str,
	pkce: &PkcePair,
) -> Url {
	let mut url = endpoints.authorize.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", endpoints.redirect.as_str());

	if let Some(scope_value) = scopes.joined() {
		pairs.append_pair("scope", &scope_value);
	}

	pairs.append_pair("state", state);
	pairs.append_pair("code_challenge", &pkce.challenge);
	pairs.append_pair("code_challenge_method", "S256");

	drop(pairs);

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(verifier.as_bytes());
	let digest = hasher.finalize();
	URL_SAFE_NO_PAD.encode(digest)
}
