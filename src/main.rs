//! rtk-base - u-blox RTK base station daemon
//!
//! Configures the receiver as a base station and serves its RTCM3 output:
//!
//! - **TCP (default 127.0.0.1:2101)**: raw RTCM3 stream for one consumer
//! - **NTRIP (optional)**: `str2str` uploads that stream to a caster

use rtk_base::config::Config;
use rtk_base::core::sink::LogSink;
use rtk_base::error::Result;
use rtk_base::streaming::{CorrectionQueue, CorrectionRelay, CorrectionTap, NtripPublisher};
use rtk_base::{ReceiverController, RunState};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "/etc/rtk-base.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `rtk-base <path>` (positional)
/// - `rtk-base --config <path>` (flag-based)
/// - `rtk-base -c <path>` (short flag)
///
/// Defaults to `/etc/rtk-base.toml` if not specified.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

/// An explicitly given file must exist; a missing default file means defaults
fn load_config(explicit: Option<&str>) -> Result<(Config, String)> {
    match explicit {
        Some(path) => Ok((Config::from_file(path)?, path.to_string())),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Ok((
            Config::from_file(DEFAULT_CONFIG_PATH)?,
            DEFAULT_CONFIG_PATH.to_string(),
        )),
        None => Ok((Config::default(), "built-in defaults".to_string())),
    }
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let (config, source) = load_config(config_path.as_deref())?;

    // RUST_LOG overrides the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("rtk-base v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", source);
    if config_path.is_none() && source != DEFAULT_CONFIG_PATH {
        log::warn!("{} not found, running with defaults", DEFAULT_CONFIG_PATH);
    }

    let run_state = Arc::new(RunState::new());
    let queue = CorrectionQueue::new();

    // Relay first, so the publisher has something to connect to
    let relay = CorrectionRelay::bind(
        config.relay.bind_address.as_str(),
        queue.clone(),
        Arc::clone(&run_state),
        Duration::from_millis(config.relay.accept_timeout_ms),
    )?;
    let relay_addr = relay.local_addr()?;
    let relay_handle = relay.spawn()?;

    let mut publisher = if config.ntrip.enabled {
        let mut publisher = NtripPublisher::new(&config.ntrip, relay_addr);
        publisher.spawn()?;
        Some(publisher)
    } else {
        log::info!("NTRIP upload disabled; relay serves {} only", relay_addr);
        None
    };

    let signal_state = Arc::clone(&run_state);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        signal_state.stop();
    })?;

    let mut controller = ReceiverController::connect(&config.device, Arc::clone(&run_state))?;
    controller.start(Box::new(CorrectionTap::new(queue, LogSink)))?;

    // Stops the controller (and with it the relay) on return, success or not
    let outcome = controller.run(&config.positioning_mode()?);

    match relay_handle.join() {
        Ok(Ok(stats)) => log::info!(
            "Relay session with {} ended: {} blocks sent, {} stale blocks discarded",
            stats.consumer,
            stats.blocks_sent,
            stats.discarded
        ),
        Ok(Err(e)) => log::warn!("Relay session ended: {}", e),
        Err(_) => log::error!("Relay thread panicked"),
    }

    if let Some(publisher) = publisher.as_mut() {
        publisher.stop()?;
    }

    log::info!("rtk-base stopped");
    outcome
}
