//! GatiTrack - Tracking worker daemon
//!
//! Runs the tracking worker against in-memory fix stores and feeds its
//! control inbox from stdin, one trigger token per line:
//!
//! ```text
//! $ printf 'track-normal\ntrack-motion\nexit-track\n' | gati-track -c gati-track.toml
//! ```
//!
//! Ctrl-C (or end of input) requests a permanent shutdown.

use gati_track::bearer::{LoggingBearer, open_modem};
use gati_track::core::token::TriggerToken;
use gati_track::error::Error;
use gati_track::snapshot::{MemoryFixStore, UsrFormatter};
use gati_track::{
    AppConfig, DeviceState, HandoffQueue, Result, TrackingContext, TrackingThread, TrackingWorker,
};
use std::env;
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::Arc;
use std::thread;

const DEFAULT_CONFIG_PATH: &str = "/etc/gati-track.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `gati-track <path>` (positional)
/// - `gati-track --config <path>` (flag-based)
/// - `gati-track -c <path>` (short flag)
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    DEFAULT_CONFIG_PATH.to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config_found = Path::new(&config_path).exists();
    let config = if config_found {
        AppConfig::from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("GatiTrack v{} starting...", env!("CARGO_PKG_VERSION"));
    if config_found {
        log::info!("Using config: {}", config_path);
    } else {
        log::warn!("Config {} not found, using defaults", config_path);
    }
    log::info!(
        "Format: {}, min speed: {}, ring capacity: {}",
        config.tracking.format,
        config.tracking.min_speed,
        config.queue.capacity
    );

    let device = Arc::new(DeviceState::new(config.modem.imei.clone()));
    let queue = Arc::new(HandoffQueue::new(
        config.queue.capacity,
        config.queue.lock_timeout(),
    )?);
    let modem = open_modem(&config.modem.port)?;

    let (inbox_tx, inbox_rx) = crossbeam_channel::unbounded::<String>();
    let (supervisor_tx, supervisor_rx) = crossbeam_channel::unbounded::<String>();

    let ctx = TrackingContext {
        device: Arc::clone(&device),
        primary: Arc::new(MemoryFixStore::new()),
        secondary: Arc::new(MemoryFixStore::new()),
        formatter: Box::new(UsrFormatter),
        queue: Arc::clone(&queue),
        modem,
        bearer: Box::new(LoggingBearer::default()),
        inbox: inbox_rx,
        supervisor: supervisor_tx,
    };
    let tracking = TrackingThread::spawn(TrackingWorker::new(config.tracking.clone(), ctx))?;

    // Shutdown wakes the worker with a session restart so it sees the flag
    let wake = TriggerToken::RebootSession.to_string();

    let signal_device = Arc::clone(&device);
    let signal_tx = inbox_tx.clone();
    let signal_wake = wake.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        signal_device.request_shutdown();
        let _ = signal_tx.send(signal_wake.clone());
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let input_device = Arc::clone(&device);
    thread::Builder::new()
        .name("stdin-tokens".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if inbox_tx.send(line).is_err() {
                    return;
                }
            }
            log::info!("End of token input");
            input_device.request_shutdown();
            let _ = inbox_tx.send(wake);
        })
        .map_err(|e| Error::Other(format!("Failed to spawn input thread: {}", e)))?;

    let exit = tracking.join()?;
    log::info!("Tracking worker stopped: {:?}", exit);

    for message in supervisor_rx.try_iter() {
        log::info!("Supervisor notified: {}", message);
    }

    let (staged, archived, write_index) = queue.with_slots(|s| {
        (s.staged().is_some(), s.occupied(), s.write_index())
    })?;
    log::info!(
        "Handoff queue: staged={}, archived={}, write index={}",
        staged,
        archived,
        write_index
    );

    log::info!("GatiTrack stopped");
    Ok(())
}
