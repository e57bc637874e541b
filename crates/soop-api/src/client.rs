use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use rustls::ClientConfig;
use rustls::crypto::aws_lc_rs;
use rustls_platform_verifier::BuilderVerifierExt;

use crate::error::ApiError;

/// SOOP rejects non-browser clients on the player APIs, so every call
/// carries the same desktop Chrome user agent as the web player.
pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36";

const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

fn tls_config() -> Result<ClientConfig, ApiError> {
    let provider = Arc::new(aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ApiError::Other(format!("failed to configure TLS protocol versions: {e}")))?
        .with_platform_verifier()
        .map_err(|e| ApiError::Other(format!("failed to load platform TLS verifier: {e}")))?
        .with_no_client_auth();
    Ok(config)
}

fn builder() -> Result<reqwest::ClientBuilder, ApiError> {
    Ok(Client::builder()
        .use_preconfigured_tls(tls_config()?)
        .user_agent(DEFAULT_UA)
        .timeout(CLIENT_TIMEOUT))
}

/// Client for a single metadata or resolution call. Dropped by the caller as
/// soon as the call returns, on success and failure alike.
pub fn short_lived_client() -> Result<Client, ApiError> {
    builder()?
        .build()
        .map_err(|e| ApiError::Other(format!("failed to create HTTP client: {e}")))
}

/// Long-lived client for repeated authenticated calls, optionally routed
/// through a proxy. Held by the scheduler for the process lifetime.
pub fn session_client(proxy: Option<reqwest::Proxy>) -> Result<Client, ApiError> {
    let mut builder = builder()?;
    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| ApiError::Other(format!("failed to create HTTP client: {e}")))
}
