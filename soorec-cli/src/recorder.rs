//! External recorder supervision.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use chrono::Local;
use soop_api::client::DEFAULT_UA;
use soop_api::{PlaybackDescriptor, StreamerIdentity};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_STREAMLINK_PATH: &str = "streamlink";
const STREAMLINK_QUALITY: &str = "best";
const RECORDING_EXT: &str = "ts";
const PLAY_URL_BASE: &str = "https://play.sooplive.co.kr";

/// How long a stop-requested child gets to exit before the force kill.
const KILL_GRACE: Duration = Duration::from_secs(3);

/// Terminal state of one recording attempt. A non-zero exit is still a
/// completed attempt: an HLS-following recorder exiting non-zero usually
/// just means the source ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingOutcome {
    pub exit_code: Option<i32>,
    pub terminated_by_signal: bool,
}

impl RecordingOutcome {
    pub fn completed_cleanly(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Seam between the scheduler and the recording process.
#[async_trait]
pub trait RecordingEngine: Send + Sync {
    /// Record one broadcast to completion (or cancellation). Takes the
    /// descriptor by value: a playable address is never reused for a second
    /// attempt.
    async fn record(
        &self,
        descriptor: PlaybackDescriptor,
        identity: &StreamerIdentity,
    ) -> Result<RecordingOutcome>;
}

/// Spawns and supervises `streamlink` for one playable address.
///
/// The child is never routed through the proxy; content delivery is
/// reachable directly.
pub struct StreamlinkRecorder {
    binary_path: String,
    output_dir: PathBuf,
    shutdown: CancellationToken,
}

impl StreamlinkRecorder {
    pub fn new(output_dir: PathBuf, shutdown: CancellationToken) -> Self {
        Self {
            binary_path: DEFAULT_STREAMLINK_PATH.to_string(),
            output_dir,
            shutdown,
        }
    }

    /// Preflight: a missing recorder binary is fatal at startup, before the
    /// polling loop ever runs.
    pub fn check_available(binary_path: &str) -> Result<()> {
        let status = std::process::Command::new(binary_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(Error::RecorderMissing(format!(
                "{binary_path} --version exited with {status}"
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::RecorderMissing(binary_path.to_string()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn output_path(&self, identity: &StreamerIdentity, title: &str) -> PathBuf {
        let name = sanitize_name(&identity.display_name);
        let title = sanitize_name(title);
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        self.output_dir
            .join(format!("[{name}]_{timestamp}_{title}.{RECORDING_EXT}"))
    }

    fn build_args(url: &str, streamer_id: &str, output_path: &Path) -> Vec<String> {
        vec![
            "--http-header".to_string(),
            format!("User-Agent={DEFAULT_UA}"),
            "--http-header".to_string(),
            format!("Referer={PLAY_URL_BASE}/{streamer_id}"),
            "--force".to_string(),
            url.to_string(),
            STREAMLINK_QUALITY.to_string(),
            "-o".to_string(),
            output_path.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl RecordingEngine for StreamlinkRecorder {
    async fn record(
        &self,
        descriptor: PlaybackDescriptor,
        identity: &StreamerIdentity,
    ) -> Result<RecordingOutcome> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let output_path = self.output_path(identity, &descriptor.title);
        let args = Self::build_args(&descriptor.url, &identity.id, &output_path);

        info!(path = %output_path.display(), "starting recording");

        let mut command = tokio::process::Command::new(&self.binary_path);
        command
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::RecorderMissing(self.binary_path.clone()),
            _ => Error::Io(e),
        })?;

        // Surface recorder output for diagnostics; nothing is parsed beyond
        // the cli status lines.
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(log_recorder_output(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(log_recorder_output(stderr));
        }

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = self.shutdown.cancelled() => {
                info!("stop requested, terminating recorder process");
                // Already-exited children make start_kill fail; wait() below
                // still yields their status.
                let _ = child.start_kill();
                match timeout(KILL_GRACE, child.wait()).await {
                    Ok(status) => status?,
                    Err(_) => {
                        warn!("recorder did not exit within the grace period, killing");
                        child.kill().await?;
                        child.wait().await?
                    }
                }
            }
        };

        let outcome = RecordingOutcome {
            exit_code: status.code(),
            terminated_by_signal: status.code().is_none(),
        };

        if outcome.completed_cleanly() {
            info!("recording finished cleanly");
        } else {
            warn!(
                exit_code = ?outcome.exit_code,
                "recording ended (stream ended or was interrupted)"
            );
        }

        Ok(outcome)
    }
}

async fn log_recorder_output(stream: impl tokio::io::AsyncRead + Unpin) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.contains("[cli][error]") || line.contains("error: ") {
            warn!(target: "recorder", "{line}");
        } else {
            debug!(target: "recorder", "{line}");
        }
    }
}

/// Strip filesystem-unsafe characters from a name or title.
///
/// Order matters for idempotence: strip, truncate, then trim, so a second
/// pass never sees a new leading/trailing dot or space.
pub fn sanitize_name(input: &str) -> String {
    const INVALID: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    const MAX_LEN: usize = 120;

    let stripped: String = input
        .chars()
        .filter(|c| !INVALID.contains(c) && *c >= ' ')
        .take(MAX_LEN)
        .collect();

    stripped
        .trim_start_matches(['.', ' '])
        .trim_end_matches(['.', ' '])
        .to_string()
}
