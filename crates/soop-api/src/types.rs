/// The watched account. `display_name` starts out equal to `id` and is
/// overwritten with the station nickname once metadata has been fetched;
/// only the single probe in flight ever writes it.
#[derive(Debug, Clone)]
pub struct StreamerIdentity {
    pub id: String,
    pub display_name: String,
}

impl StreamerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
        }
    }
}

/// One live broadcast, as reported by the station endpoint. Produced fresh
/// by every probe; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastInfo {
    pub broad_no: String,
    pub title: String,
}

/// Opaque quality-unlocking credential (AID), scoped to one broadcast and
/// one recording attempt. Never cached across polling cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolved CDN address with the access token attached, sufficient to start
/// recording. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackDescriptor {
    pub url: String,
    pub title: String,
}
