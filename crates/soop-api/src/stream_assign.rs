use std::time::Duration;

use tracing::debug;

use crate::client;
use crate::error::ApiError;
use crate::models::StreamAssignResponse;
use crate::types::{AccessToken, BroadcastInfo, PlaybackDescriptor};

const STREAM_ASSIGN_URL: &str = "https://livestream-manager.sooplive.co.kr/broad_stream_assign.html";
const RETURN_TYPE: &str = "gcp_cdn";
const ASSIGN_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves the playable CDN address for a broadcast.
///
/// Always direct; content delivery is reachable without the proxy. Each
/// lookup opens a client scoped to that single call.
#[derive(Debug, Default)]
pub struct StreamResolver;

impl StreamResolver {
    pub fn new() -> Self {
        Self
    }

    pub async fn resolve(
        &self,
        broadcast: &BroadcastInfo,
        token: &AccessToken,
    ) -> Result<PlaybackDescriptor, ApiError> {
        let client = client::short_lived_client()?;
        let key = broad_key(&broadcast.broad_no);

        debug!(broad_key = %key, "resolving stream address");

        let response = client
            .get(STREAM_ASSIGN_URL)
            .query(&[("return_type", RETURN_TYPE), ("broad_key", key.as_str())])
            .timeout(ASSIGN_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        let assign: StreamAssignResponse = serde_json::from_str(&body)?;

        let view_url = assign
            .view_url
            .filter(|url| !url.is_empty())
            .ok_or(ApiError::MissingField("view_url"))?;

        Ok(PlaybackDescriptor {
            url: compose_playback_url(&view_url, token),
            title: broadcast.title.clone(),
        })
    }
}

/// Broadcast-scoped key for the stream assignment lookup; always the
/// original-quality HLS variant.
fn broad_key(broad_no: &str) -> String {
    format!("{broad_no}-common-original-hls")
}

/// The CDN address only plays with the access token attached as a query
/// parameter.
pub fn compose_playback_url(view_url: &str, token: &AccessToken) -> String {
    format!("{view_url}?aid={}", token.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broad_key_format() {
        assert_eq!(broad_key("12345"), "12345-common-original-hls");
    }

    #[test]
    fn test_compose_playback_url() {
        let token = AccessToken::new("tok-1");
        assert_eq!(
            compose_playback_url("https://cdn.example/hls/12345.m3u8", &token),
            "https://cdn.example/hls/12345.m3u8?aid=tok-1"
        );
    }
}
