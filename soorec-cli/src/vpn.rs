//! Optional wireproxy bootstrap.
//!
//! The core only needs a SOCKS endpoint; this module turns a WireGuard
//! config into one by supervising a local `wireproxy` child for the process
//! lifetime.

use std::path::Path;

use tokio::process::{Child, Command};
use tokio::time::{Duration, sleep, timeout};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// wireproxy's default [Socks5] listener.
const PROXY_ENDPOINT: &str = "socks5://127.0.0.1:1080";

/// Time given to wireproxy to come up (or crash) before we trust it.
const STARTUP_WAIT: Duration = Duration::from_secs(2);

const KILL_GRACE: Duration = Duration::from_secs(3);

pub struct WireproxyTunnel {
    child: Child,
}

impl WireproxyTunnel {
    /// Spawn wireproxy and verify it survives startup. An immediate exit
    /// usually means the config lacks a `[Socks5]` section.
    pub async fn start(binary_path: &str, config_path: &Path) -> Result<Self> {
        info!(config = %config_path.display(), "starting wireproxy tunnel");

        let mut child = Command::new(binary_path)
            .arg("-c")
            .arg(config_path)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    Error::config(format!("wireproxy binary not found: {binary_path}"))
                }
                _ => Error::Io(e),
            })?;

        sleep(STARTUP_WAIT).await;

        if let Some(status) = child.try_wait()? {
            return Err(Error::config(format!(
                "wireproxy exited during startup ({status}); check the [Socks5] section of {}",
                config_path.display()
            )));
        }

        info!("wireproxy tunnel ready on {PROXY_ENDPOINT}");
        Ok(Self { child })
    }

    pub fn endpoint(&self) -> &'static str {
        PROXY_ENDPOINT
    }

    /// Tear the tunnel down: ask the child to stop, then force-kill after
    /// the grace period.
    pub async fn shutdown(mut self) {
        info!("stopping wireproxy tunnel");
        let _ = self.child.start_kill();
        if timeout(KILL_GRACE, self.child.wait()).await.is_err() {
            warn!("wireproxy did not exit within the grace period, killing");
            let _ = self.child.kill().await;
        }
    }
}
