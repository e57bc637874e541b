use std::path::PathBuf;

use clap::Parser;

/// Watch a SOOP channel and record its live broadcasts.
#[derive(Parser, Debug)]
#[command(name = "soorec", version, about)]
pub struct Args {
    /// Streamer id to watch (falls back to the settings file)
    pub streamer_id: Option<String>,

    /// Directory recordings are written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Seconds between offline checks
    #[arg(short = 'i', long)]
    pub poll_interval: Option<u64>,

    /// Proxy endpoint for the quality-token negotiation, e.g. socks5://127.0.0.1:1080
    #[arg(short, long)]
    pub proxy: Option<String>,

    /// WireGuard config to bootstrap a local proxy from (via wireproxy)
    #[arg(long)]
    pub wg_conf: Option<PathBuf>,

    /// Path to the wireproxy binary
    #[arg(long)]
    pub wireproxy_path: Option<String>,

    /// Settings file path (default: ./settings.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}
