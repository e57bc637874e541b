//! The top-level polling loop.

use std::time::Duration;

use soop_api::{ApiError, BroadcastSource};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Result;
use crate::recorder::RecordingEngine;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Sleep between offline checks (and after any recoverable failure).
    pub poll_interval: Duration,
    /// Sleep after a recording attempt before probing again.
    pub cooldown: Duration,
}

#[derive(Debug, PartialEq, Eq)]
enum CycleOutcome {
    /// A recording attempt ran to a terminal state.
    Recorded,
    /// Nothing to record this cycle (offline, token refused, resolution
    /// failed, or a recoverable probe error).
    Idle,
}

/// Drives probe → negotiate → resolve → record, sequentially and forever.
///
/// Each recording is awaited in place, so at most one is ever active. Every
/// sleep races the cancellation token so shutdown is prompt.
pub struct PollingScheduler<S, R> {
    source: S,
    recorder: R,
    config: SchedulerConfig,
    shutdown: CancellationToken,
}

impl<S: BroadcastSource, R: RecordingEngine> PollingScheduler<S, R> {
    pub fn new(source: S, recorder: R, config: SchedulerConfig, shutdown: CancellationToken) -> Self {
        Self {
            source,
            recorder,
            config,
            shutdown,
        }
    }

    /// Run until cancelled. Only the fatal recorder-missing condition makes
    /// this return an error; every other failure is logged and retried on
    /// the next tick.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            streamer = %self.source.identity().id,
            interval_secs = self.config.poll_interval.as_secs(),
            "watching for live broadcasts"
        );

        while !self.shutdown.is_cancelled() {
            match self.cycle().await {
                Ok(CycleOutcome::Recorded) => {
                    info!(
                        cooldown_secs = self.config.cooldown.as_secs(),
                        "recording attempt finished, cooling down"
                    );
                    self.pause(self.config.cooldown).await;
                }
                Ok(CycleOutcome::Idle) => {
                    self.pause(self.config.poll_interval).await;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "polling cycle failed, retrying next tick");
                    self.pause(self.config.poll_interval).await;
                }
            }
        }

        info!("shutdown requested, polling stopped");
        Ok(())
    }

    async fn cycle(&mut self) -> Result<CycleOutcome> {
        let broadcast = match self.source.check_live().await {
            Ok(Some(broadcast)) => broadcast,
            Ok(None) => return Ok(CycleOutcome::Idle),
            Err(e) => {
                // Transport and format failures at the probe are
                // indistinguishable from "offline" for scheduling purposes.
                warn!(error = %e, "station probe failed");
                return Ok(CycleOutcome::Idle);
            }
        };

        info!(
            title = %broadcast.title,
            broad_no = %broadcast.broad_no,
            "live broadcast detected"
        );

        let token = match self.source.negotiate_token(&broadcast).await {
            Ok(token) => token,
            Err(e @ ApiError::TokenNotGranted { .. }) => {
                warn!(error = %e, "original-quality token refused; check the proxy/wireguard route");
                return Ok(CycleOutcome::Idle);
            }
            Err(e) => {
                warn!(error = %e, "token negotiation failed");
                return Ok(CycleOutcome::Idle);
            }
        };

        // No resolution without a granted token, no recording without a
        // resolved address.
        let descriptor = match self.source.resolve_stream(&broadcast, &token).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(error = %e, "stream address resolution failed");
                return Ok(CycleOutcome::Idle);
            }
        };

        self.recorder
            .record(descriptor, self.source.identity())
            .await?;

        Ok(CycleOutcome::Recorded)
    }

    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use soop_api::stream_assign::compose_playback_url;
    use soop_api::{AccessToken, BroadcastInfo, PlaybackDescriptor, StreamerIdentity};
    use tokio::sync::Mutex;
    use tokio::time::Instant;

    use super::*;
    use crate::error::Error;
    use crate::recorder::RecordingOutcome;

    fn test_broadcast() -> BroadcastInfo {
        BroadcastInfo {
            broad_no: "12345".to_string(),
            title: "Test Show".to_string(),
        }
    }

    fn test_config() -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_secs(15),
            cooldown: Duration::from_secs(60),
        }
    }

    struct ScriptedSource {
        identity: StreamerIdentity,
        broadcast: Option<BroadcastInfo>,
        grant_token: bool,
        probes: Arc<Mutex<Vec<Instant>>>,
        negotiations: Arc<AtomicUsize>,
        resolutions: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(broadcast: Option<BroadcastInfo>, grant_token: bool) -> Self {
            Self {
                identity: StreamerIdentity::new("someone"),
                broadcast,
                grant_token,
                probes: Arc::new(Mutex::new(Vec::new())),
                negotiations: Arc::new(AtomicUsize::new(0)),
                resolutions: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl BroadcastSource for ScriptedSource {
        fn identity(&self) -> &StreamerIdentity {
            &self.identity
        }

        async fn check_live(&mut self) -> std::result::Result<Option<BroadcastInfo>, ApiError> {
            self.probes.lock().await.push(Instant::now());
            Ok(self.broadcast.clone())
        }

        async fn negotiate_token(
            &self,
            _broadcast: &BroadcastInfo,
        ) -> std::result::Result<AccessToken, ApiError> {
            self.negotiations.fetch_add(1, Ordering::SeqCst);
            if self.grant_token {
                Ok(AccessToken::new("tok-1"))
            } else {
                Err(ApiError::TokenNotGranted { code: 0 })
            }
        }

        async fn resolve_stream(
            &self,
            broadcast: &BroadcastInfo,
            token: &AccessToken,
        ) -> std::result::Result<PlaybackDescriptor, ApiError> {
            self.resolutions.fetch_add(1, Ordering::SeqCst);
            Ok(PlaybackDescriptor {
                url: compose_playback_url("https://cdn.example/hls/12345.m3u8", token),
                title: broadcast.title.clone(),
            })
        }
    }

    struct FakeRecorder {
        duration: Duration,
        missing: bool,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
        completions: Arc<Mutex<Vec<(Instant, String)>>>,
        shutdown: Option<CancellationToken>,
    }

    impl FakeRecorder {
        fn instant() -> Self {
            Self::with_duration(Duration::ZERO)
        }

        fn with_duration(duration: Duration) -> Self {
            Self {
                duration,
                missing: false,
                active: Arc::new(AtomicUsize::new(0)),
                max_active: Arc::new(AtomicUsize::new(0)),
                completions: Arc::new(Mutex::new(Vec::new())),
                shutdown: None,
            }
        }

        fn missing() -> Self {
            let mut recorder = Self::instant();
            recorder.missing = true;
            recorder
        }
    }

    #[async_trait]
    impl RecordingEngine for FakeRecorder {
        async fn record(
            &self,
            descriptor: PlaybackDescriptor,
            _identity: &StreamerIdentity,
        ) -> Result<RecordingOutcome> {
            if self.missing {
                return Err(Error::RecorderMissing("streamlink".to_string()));
            }

            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);

            let mut terminated = false;
            match &self.shutdown {
                Some(token) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.duration) => {}
                        _ = token.cancelled() => terminated = true,
                    }
                }
                None => tokio::time::sleep(self.duration).await,
            }

            self.active.fetch_sub(1, Ordering::SeqCst);
            self.completions
                .lock()
                .await
                .push((Instant::now(), descriptor.url));

            Ok(RecordingOutcome {
                exit_code: if terminated { None } else { Some(0) },
                terminated_by_signal: terminated,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_records_the_composed_url() {
        let source = ScriptedSource::new(Some(test_broadcast()), true);
        let recorder = FakeRecorder::instant();
        let completions = recorder.completions.clone();

        let mut scheduler = PollingScheduler::new(
            source,
            recorder,
            test_config(),
            CancellationToken::new(),
        );

        let outcome = scheduler.cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Recorded);

        let completions = completions.lock().await;
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].1, "https://cdn.example/hls/12345.m3u8?aid=tok-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_token_skips_resolution_and_recording() {
        let source = ScriptedSource::new(Some(test_broadcast()), false);
        let negotiations = source.negotiations.clone();
        let resolutions = source.resolutions.clone();
        let recorder = FakeRecorder::instant();
        let completions = recorder.completions.clone();

        let mut scheduler = PollingScheduler::new(
            source,
            recorder,
            test_config(),
            CancellationToken::new(),
        );

        let outcome = scheduler.cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Idle);
        assert_eq!(negotiations.load(Ordering::SeqCst), 1);
        assert_eq!(resolutions.load(Ordering::SeqCst), 0);
        assert!(completions.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_probe_waits_poll_interval() {
        let source = ScriptedSource::new(None, true);
        let probes = source.probes.clone();
        let shutdown = CancellationToken::new();

        let mut scheduler = PollingScheduler::new(
            source,
            FakeRecorder::instant(),
            test_config(),
            shutdown.clone(),
        );

        let handle = tokio::spawn(async move { scheduler.run().await });
        tokio::time::sleep(Duration::from_secs(46)).await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        let probes = probes.lock().await;
        assert!(probes.len() >= 3, "expected several probes, got {}", probes.len());
        for pair in probes.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_secs(15));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_two_recordings_at_once() {
        let source = ScriptedSource::new(Some(test_broadcast()), true);
        let recorder = FakeRecorder::with_duration(Duration::from_secs(30));
        let max_active = recorder.max_active.clone();
        let completions = recorder.completions.clone();
        let shutdown = CancellationToken::new();

        let mut scheduler =
            PollingScheduler::new(source, recorder, test_config(), shutdown.clone());

        let handle = tokio::spawn(async move { scheduler.run().await });
        // probe + 30s recording + 60s cooldown per attempt; enough time for
        // several attempts.
        tokio::time::sleep(Duration::from_secs(400)).await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        assert!(completions.lock().await.len() >= 2);
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_before_next_probe() {
        let source = ScriptedSource::new(Some(test_broadcast()), true);
        let probes = source.probes.clone();
        let recorder = FakeRecorder::instant();
        let completions = recorder.completions.clone();
        let shutdown = CancellationToken::new();

        let mut scheduler =
            PollingScheduler::new(source, recorder, test_config(), shutdown.clone());

        let handle = tokio::spawn(async move { scheduler.run().await });
        tokio::time::sleep(Duration::from_secs(100)).await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        let probes = probes.lock().await;
        let completions = completions.lock().await;
        assert!(!completions.is_empty());
        // The probe after a completed attempt waits out the full cooldown.
        let first_completion = completions[0].0;
        let next_probe = probes
            .iter()
            .find(|at| **at > first_completion)
            .expect("a probe after the first recording");
        assert_eq!(*next_probe - first_completion, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_recorder_is_fatal() {
        let source = ScriptedSource::new(Some(test_broadcast()), true);
        let probes = source.probes.clone();

        let mut scheduler = PollingScheduler::new(
            source,
            FakeRecorder::missing(),
            test_config(),
            CancellationToken::new(),
        );

        let err = scheduler.run().await.unwrap_err();
        assert!(matches!(err, Error::RecorderMissing(_)));
        // No retry after the fatal condition.
        assert_eq!(probes.lock().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_terminates_active_recording() {
        let shutdown = CancellationToken::new();
        let source = ScriptedSource::new(Some(test_broadcast()), true);

        let mut recorder = FakeRecorder::with_duration(Duration::from_secs(3600));
        recorder.shutdown = Some(shutdown.clone());
        let completions = recorder.completions.clone();

        let mut scheduler =
            PollingScheduler::new(source, recorder, test_config(), shutdown.clone());

        let handle = tokio::spawn(async move { scheduler.run().await });
        // Let the recording start, then request shutdown mid-recording.
        tokio::time::sleep(Duration::from_secs(10)).await;
        shutdown.cancel();
        handle.await.unwrap().unwrap();

        let completions = completions.lock().await;
        assert_eq!(completions.len(), 1, "recording reached a terminal state");
    }
}
