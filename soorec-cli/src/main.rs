mod cli;
mod config;
mod error;
mod recorder;
mod scheduler;
mod vpn;

use std::process;

use clap::Parser;
use soop_api::SoopChannel;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::Args;
use crate::config::{AppConfig, Settings};
use crate::error::Result;
use crate::recorder::{DEFAULT_STREAMLINK_PATH, StreamlinkRecorder};
use crate::scheduler::{PollingScheduler, SchedulerConfig};
use crate::vpn::WireproxyTunnel;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("fatal: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::load(args.config.as_deref());
    let config = AppConfig::resolve(args, settings)?;

    // A missing recorder can only be fixed by the operator; fail before the
    // loop ever starts rather than at the first live broadcast.
    StreamlinkRecorder::check_available(DEFAULT_STREAMLINK_PATH)?;

    tokio::fs::create_dir_all(&config.output_dir).await?;
    info!(path = %config.output_dir.display(), "recordings will be written here");

    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal_token.cancel();
        }
    });

    // A WireGuard config bootstraps a local proxy; otherwise use whatever
    // endpoint was configured (possibly none).
    let mut tunnel = None;
    let mut proxy = config.proxy.clone();
    if let Some(wg_conf) = &config.wg_conf {
        let started = WireproxyTunnel::start(&config.wireproxy_path, wg_conf).await?;
        proxy = Some(started.endpoint().to_string());
        tunnel = Some(started);
    }

    let result = watch(&config, proxy.as_deref(), shutdown).await;

    if let Some(tunnel) = tunnel {
        tunnel.shutdown().await;
    }

    result
}

async fn watch(
    config: &AppConfig,
    proxy: Option<&str>,
    shutdown: CancellationToken,
) -> Result<()> {
    let source = SoopChannel::new(config.streamer_id.as_str(), proxy)?;
    if source.proxied() {
        info!("quality-token negotiation will be proxied");
    }

    let recorder = StreamlinkRecorder::new(config.output_dir.clone(), shutdown.clone());

    let mut scheduler = PollingScheduler::new(
        source,
        recorder,
        SchedulerConfig {
            poll_interval: config.poll_interval,
            cooldown: config.cooldown,
        },
        shutdown,
    );

    scheduler.run().await
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}
