use std::time::Duration;

use reqwest::Client;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::client;
use crate::error::ApiError;
use crate::models::PlayerLiveResponse;
use crate::proxy::{self, CallKind};
use crate::types::AccessToken;

const PLAYER_LIVE_API_URL: &str = "http://live.sooplive.co.kr/afreeca/player_live_api.php";
const TOKEN_TIMEOUT: Duration = Duration::from_secs(15);

/// `CHANNEL.RESULT` value for a granted token.
const RESULT_GRANTED: i64 = 1;

/// Negotiates the original-quality access token (AID).
///
/// This is the only proxy-routed call: the token endpoint rate-limits and
/// geofences by source IP. The underlying session lives as long as the
/// negotiator and is reused across polling cycles.
pub struct QualityNegotiator {
    client: Client,
    proxied: bool,
}

impl QualityNegotiator {
    pub fn new(proxy_endpoint: Option<&str>) -> Result<Self, ApiError> {
        let routed = proxy::proxy_for_call(CallKind::QualityAuth, proxy_endpoint);
        let proxy = routed.map(proxy::build_proxy).transpose()?;
        let proxied = proxy.is_some();

        Ok(Self {
            client: client::session_client(proxy)?,
            proxied,
        })
    }

    pub fn proxied(&self) -> bool {
        self.proxied
    }

    /// Request the original-quality token for one broadcast. The token is
    /// valid for a single recording attempt and must not be cached.
    pub async fn negotiate(
        &self,
        streamer_id: &str,
        broad_no: &str,
    ) -> Result<AccessToken, ApiError> {
        let mut form = FxHashMap::default();
        form.insert("bid", streamer_id);
        form.insert("mode", "landing");
        form.insert("player_type", "html5");
        form.insert("quality", "original");
        form.insert("type", "aid");

        debug!(broad_no, proxied = self.proxied, "requesting original-quality token");

        let response = self
            .client
            .post(PLAYER_LIVE_API_URL)
            .form(&form)
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        match parse_token_response(&body) {
            Err(ApiError::TokenNotGranted { code }) => {
                // The most actionable operator signal: a refusal here almost
                // always means the proxy/wireguard route is wrong, not that
                // the stream is offline.
                warn!(code, proxied = self.proxied, "quality token request refused");
                Err(ApiError::TokenNotGranted { code })
            }
            other => other,
        }
    }
}

fn parse_token_response(body: &str) -> Result<AccessToken, ApiError> {
    let parsed: PlayerLiveResponse = serde_json::from_str(body)?;

    if parsed.channel.result != RESULT_GRANTED {
        return Err(ApiError::TokenNotGranted {
            code: parsed.channel.result,
        });
    }

    parsed
        .channel
        .aid
        .filter(|aid| !aid.is_empty())
        .map(AccessToken::new)
        .ok_or(ApiError::MissingField("CHANNEL.AID"))
}
