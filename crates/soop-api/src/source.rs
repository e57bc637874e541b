use async_trait::async_trait;

use crate::error::ApiError;
use crate::quality::QualityNegotiator;
use crate::station::StationProbe;
use crate::stream_assign::StreamResolver;
use crate::types::{AccessToken, BroadcastInfo, PlaybackDescriptor, StreamerIdentity};

/// One watched channel, from the scheduler's point of view: probe it,
/// negotiate a token for a detected broadcast, resolve the playable address.
///
/// The methods are separate so the caller controls sequencing: no token
/// negotiation or resolution happens unless a broadcast was detected, and no
/// resolution happens unless a token was granted.
#[async_trait]
pub trait BroadcastSource: Send {
    fn identity(&self) -> &StreamerIdentity;

    /// `Ok(None)` means offline. Side effect: refreshes the display name.
    async fn check_live(&mut self) -> Result<Option<BroadcastInfo>, ApiError>;

    async fn negotiate_token(&self, broadcast: &BroadcastInfo) -> Result<AccessToken, ApiError>;

    async fn resolve_stream(
        &self,
        broadcast: &BroadcastInfo,
        token: &AccessToken,
    ) -> Result<PlaybackDescriptor, ApiError>;
}

/// Production [`BroadcastSource`] backed by the SOOP endpoints.
pub struct SoopChannel {
    identity: StreamerIdentity,
    probe: StationProbe,
    negotiator: QualityNegotiator,
    resolver: StreamResolver,
}

impl SoopChannel {
    /// `proxy_endpoint` is routed per call kind: only the token negotiation
    /// ever rides it. Building the negotiator validates the endpoint, so a
    /// bad proxy string fails here, at startup, not mid-loop.
    pub fn new(
        streamer_id: impl Into<String>,
        proxy_endpoint: Option<&str>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            identity: StreamerIdentity::new(streamer_id),
            probe: StationProbe::new(),
            negotiator: QualityNegotiator::new(proxy_endpoint)?,
            resolver: StreamResolver::new(),
        })
    }

    pub fn proxied(&self) -> bool {
        self.negotiator.proxied()
    }
}

#[async_trait]
impl BroadcastSource for SoopChannel {
    fn identity(&self) -> &StreamerIdentity {
        &self.identity
    }

    async fn check_live(&mut self) -> Result<Option<BroadcastInfo>, ApiError> {
        self.probe.check_live(&mut self.identity).await
    }

    async fn negotiate_token(&self, broadcast: &BroadcastInfo) -> Result<AccessToken, ApiError> {
        self.negotiator
            .negotiate(&self.identity.id, &broadcast.broad_no)
            .await
    }

    async fn resolve_stream(
        &self,
        broadcast: &BroadcastInfo,
        token: &AccessToken,
    ) -> Result<PlaybackDescriptor, ApiError> {
        self.resolver.resolve(broadcast, token).await
    }
}
