//! Resolves a client-credentials provider from a JSON config and decorates an API request
//! with the cached service token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use foundry_token_provider::{
	clock::SystemClock,
	config::CredentialsConfig,
	http::ReqwestHttpClient,
	oauth::TOKEN_PATH,
	registry::{ProviderEnvironment, ProviderRegistry},
	reqwest::{Method, Request},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"expires_in\":900}");
		})
		.await;
	let config = CredentialsConfig::from_json_str(&format!(
		r#"{{
			"host": "http://{}",
			"token_provider": {{
				"name": "oauth",
				"settings": {{
					"client_id": "demo-client",
					"client_secret": "demo-secret",
					"grant_type": "client_credentials",
					"scopes": ["api:read-data"]
				}}
			}}
		}}"#,
		server.address()
	))?;
	let env = ProviderEnvironment::new(ReqwestHttpClient::try_default()?)
		.with_clock(Arc::new(SystemClock));
	let provider = config.build(&ProviderRegistry::builtin(), &env)?;

	for path in ["/compass/api/resources", "/foundry-catalog/api/catalog/datasets"] {
		let request = provider
			.attach_auth(Request::new(Method::GET, Url::parse(&server.url(path))?))
			.await?;

		println!(
			"{} {} carries {:?}.",
			request.method(),
			request.url().path(),
			request.headers().get("authorization")
		);
	}

	token_mock.assert_async().await;

	Ok(())
}
