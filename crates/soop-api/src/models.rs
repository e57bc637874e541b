//! Wire models for the SOOP endpoints.

use serde::{Deserialize, Deserializer};

/// `GET chapi.sooplive.co.kr/api/{id}/station`
#[derive(Debug, Clone, Deserialize)]
pub struct StationResponse {
    #[serde(default)]
    pub broad: Option<Broad>,
    #[serde(default)]
    pub station: Option<Station>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Broad {
    #[serde(deserialize_with = "string_or_number")]
    pub broad_no: String,
    #[serde(default)]
    pub broad_title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Station {
    #[serde(default)]
    pub user_nick: Option<String>,
}

/// `POST live.sooplive.co.kr/afreeca/player_live_api.php`
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerLiveResponse {
    #[serde(rename = "CHANNEL")]
    pub channel: Channel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    #[serde(rename = "RESULT")]
    pub result: i64,
    #[serde(rename = "AID", default)]
    pub aid: Option<String>,
}

/// `GET livestream-manager.sooplive.co.kr/broad_stream_assign.html`
#[derive(Debug, Clone, Deserialize)]
pub struct StreamAssignResponse {
    #[serde(default)]
    pub view_url: Option<String>,
}

/// The station endpoint serves `broad_no` as a JSON number; everything
/// downstream (broad_key, logging, filenames) treats it as text.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_station_live() {
        let raw = r#"{
          "broad": { "broad_no": 28227345, "broad_title": "Test Show" },
          "station": { "user_nick": "Tester" }
        }"#;

        let parsed: StationResponse = serde_json::from_str(raw).unwrap();
        let broad = parsed.broad.unwrap();
        assert_eq!(broad.broad_no, "28227345");
        assert_eq!(broad.broad_title, "Test Show");
        assert_eq!(parsed.station.unwrap().user_nick.as_deref(), Some("Tester"));
    }

    #[test]
    fn test_parse_station_broad_no_as_string() {
        let raw = r#"{ "broad": { "broad_no": "12345", "broad_title": "t" } }"#;
        let parsed: StationResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.broad.unwrap().broad_no, "12345");
    }

    #[test]
    fn test_parse_station_offline() {
        let raw = r#"{ "station": { "user_nick": "Tester" } }"#;
        let parsed: StationResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.broad.is_none());
    }

    #[test]
    fn test_parse_station_garbage_is_an_error() {
        assert!(serde_json::from_str::<StationResponse>("<html>busy</html>").is_err());
    }

    #[test]
    fn test_parse_player_live_granted() {
        let raw = r#"{"CHANNEL":{"RESULT":1,"AID":"tok-1"}}"#;
        let parsed: PlayerLiveResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.channel.result, 1);
        assert_eq!(parsed.channel.aid.as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_parse_player_live_refused_has_no_aid() {
        let raw = r#"{"CHANNEL":{"RESULT":0}}"#;
        let parsed: PlayerLiveResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.channel.result, 0);
        assert!(parsed.channel.aid.is_none());
    }

    #[test]
    fn test_parse_player_live_missing_channel_is_an_error() {
        assert!(serde_json::from_str::<PlayerLiveResponse>("{}").is_err());
    }

    #[test]
    fn test_parse_stream_assign() {
        let raw = r#"{"view_url":"https://cdn.example/hls/12345.m3u8"}"#;
        let parsed: StreamAssignResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.view_url.as_deref(),
            Some("https://cdn.example/hls/12345.m3u8")
        );
    }

    #[test]
    fn test_parse_stream_assign_missing_url() {
        let parsed: StreamAssignResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.view_url.is_none());
    }
}
