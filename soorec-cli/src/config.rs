use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::cli::Args;
use crate::error::{Error, Result};

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
const DEFAULT_WIREPROXY_PATH: &str = "wireproxy";

/// Pause after a recording attempt before probing again, so a flapping
/// stream does not immediately re-trigger.
const COOLDOWN_SECS: u64 = 60;

/// Optional values read from the settings file. Every field can also come
/// from the command line; CLI wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub streamer_id: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub poll_interval: Option<u64>,
    pub proxy: Option<String>,
    pub wg_conf: Option<PathBuf>,
    pub wireproxy_path: Option<String>,
}

impl Settings {
    /// Read the settings file if it exists. A malformed file is logged and
    /// ignored rather than failing startup.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.unwrap_or(Path::new(DEFAULT_SETTINGS_FILE));
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(settings) => {
                    info!(path = %path.display(), "loaded settings file");
                    settings
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring malformed settings file");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read settings file");
                Self::default()
            }
        }
    }
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub streamer_id: String,
    pub output_dir: PathBuf,
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub proxy: Option<String>,
    pub wg_conf: Option<PathBuf>,
    pub wireproxy_path: String,
}

impl AppConfig {
    pub fn resolve(args: Args, settings: Settings) -> Result<Self> {
        let streamer_id = args
            .streamer_id
            .or(settings.streamer_id)
            .ok_or_else(|| {
                Error::config("no streamer id (pass it as an argument or set it in settings.json)")
            })?;

        let poll_interval = args
            .poll_interval
            .or(settings.poll_interval)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        Ok(Self {
            streamer_id,
            output_dir: args
                .output_dir
                .or(settings.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            poll_interval: Duration::from_secs(poll_interval),
            cooldown: Duration::from_secs(COOLDOWN_SECS),
            proxy: args.proxy.or(settings.proxy),
            wg_conf: args.wg_conf.or(settings.wg_conf),
            wireproxy_path: args
                .wireproxy_path
                .or(settings.wireproxy_path)
                .unwrap_or_else(|| DEFAULT_WIREPROXY_PATH.to_string()),
        })
    }
}
