//! Walks a user through the headless authorization-code flow against a Foundry stack.
//!
//! Usage: `cargo run --example headless_authorization -- <host> <client-id>`. The authorize
//! URL is printed to stderr; paste the redirect URL (or the bare code) back into the terminal.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use foundry_token_provider::{
	auth::Host,
	http::ReqwestHttpClient,
	oauth::{HeadlessUserCredentialsClient, StdinCodePrompt},
	registry::{OAUTH_PROVIDER, ProviderEnvironment, ProviderRegistry, ProviderSettings},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let mut args = env::args().skip(1);
	let host: Host = args.next().ok_or_else(|| eyre!("Missing <host> argument."))?.parse()?;
	let client_id = args.next().ok_or_else(|| eyre!("Missing <client-id> argument."))?;
	let http_client = ReqwestHttpClient::try_default()?;
	let user_credentials =
		HeadlessUserCredentialsClient::new(Arc::new(StdinCodePrompt), http_client.clone())
			.with_scheme(host.scheme.clone());
	let env =
		ProviderEnvironment::new(http_client).with_user_credentials(Arc::new(user_credentials));
	let provider = ProviderRegistry::builtin().resolve(
		OAUTH_PROVIDER,
		host,
		&ProviderSettings::new().with("client_id", client_id),
		&env,
	)?;
	let token = provider.token().await?;

	println!("Obtained a user token for {}: {token:?}.", provider.host());

	// The second call is served from the cache without prompting again.
	provider.token().await?;

	Ok(())
}
