use std::time::Duration;

use tracing::debug;

use crate::client;
use crate::error::ApiError;
use crate::models::StationResponse;
use crate::types::{BroadcastInfo, StreamerIdentity};

const STATION_URL_BASE: &str = "https://chapi.sooplive.co.kr/api";
const STATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Live-status probe against the channel/station metadata endpoint.
///
/// Always direct (never proxied); each probe opens a client scoped to that
/// single call.
#[derive(Debug, Default)]
pub struct StationProbe;

impl StationProbe {
    pub fn new() -> Self {
        Self
    }

    /// Check whether the streamer is live. Updates the display name from the
    /// station nickname as a side effect. `Ok(None)` means offline.
    pub async fn check_live(
        &self,
        identity: &mut StreamerIdentity,
    ) -> Result<Option<BroadcastInfo>, ApiError> {
        let client = client::short_lived_client()?;
        let url = format!("{STATION_URL_BASE}/{}/station", identity.id);

        let response = client
            .get(&url)
            .timeout(STATION_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        let station: StationResponse = serde_json::from_str(&body)?;

        identity.display_name = station
            .station
            .and_then(|s| s.user_nick)
            .filter(|nick| !nick.is_empty())
            .unwrap_or_else(|| identity.id.clone());

        let Some(broad) = station.broad else {
            debug!(streamer = %identity.id, "no live broadcast");
            return Ok(None);
        };

        Ok(Some(BroadcastInfo {
            broad_no: broad.broad_no,
            title: broad.broad_title,
        }))
    }
}
