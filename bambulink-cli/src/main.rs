//! Bambu printer monitor — entry point.
//!
//! ```text
//! bambulink                       Run with bambulink.toml
//! bambulink --config <path>      Use custom config TOML
//! bambulink --hostname <host>    Override the printer host
//! bambulink --gen-config         Dump default config and exit
//! ```
//!
//! Starts the camera client (and the status watcher when a serial is
//! configured), periodically writes the latest frame to disk and logs a
//! status line, and stops both cleanly on Ctrl-C.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use bambulink_core::{CameraClient, StatusWatcher};

use crate::config::MonitorConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "bambulink", about = "Bambu printer camera and status monitor")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "bambulink.toml")]
    config: PathBuf,

    /// Printer hostname (overrides config).
    #[arg(long)]
    hostname: Option<String>,

    /// LAN access code (overrides config).
    #[arg(long)]
    access_code: Option<String>,

    /// Printer serial (overrides config; enables the status channel).
    #[arg(long)]
    serial: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&MonitorConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = MonitorConfig::load(&cli.config);
    if let Some(hostname) = cli.hostname {
        config.printer.hostname = hostname;
    }
    if let Some(access_code) = cli.access_code {
        config.printer.access_code = access_code;
    }
    if let Some(serial) = cli.serial {
        config.printer.serial = serial;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("bambulink v{}", env!("CARGO_PKG_VERSION"));

    if config.printer.hostname.is_empty() {
        error!("no printer hostname configured (config file or --hostname)");
        std::process::exit(1);
    }

    // ── 1. Start the clients ────────────────────────────────────

    let camera = CameraClient::new(&config.printer.hostname, &config.printer.access_code)?;
    camera.start().await;

    let status = if config.printer.serial.is_empty() {
        info!("no serial configured; status channel disabled");
        None
    } else {
        let watcher = StatusWatcher::new(
            &config.printer.hostname,
            &config.printer.access_code,
            &config.printer.serial,
        )?;
        watcher.start().await;
        Some(watcher)
    };

    // ── 2. Snapshot / status loop until Ctrl-C ──────────────────

    let mut tick = tokio::time::interval(Duration::from_secs(config.snapshot.interval_secs.max(1)));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tick.tick() => {
                match camera.latest_frame() {
                    Some(frame) => {
                        if let Err(e) = tokio::fs::write(&config.snapshot.path, &frame).await {
                            warn!(path = %config.snapshot.path, error = %e, "snapshot write failed");
                        } else {
                            debug!(bytes = frame.len(), path = %config.snapshot.path, "snapshot written");
                        }
                    }
                    None => debug!("no camera frame yet"),
                }

                if let Some(watcher) = &status {
                    let report = watcher.current();
                    if !report.is_empty() {
                        info!(
                            state = report.gcode_state().unwrap_or("?"),
                            percent = report.progress_percent().unwrap_or(0),
                            remaining_min = report.remaining_minutes().unwrap_or(0),
                            "printer status"
                        );
                    }
                }
            }
        }
    }

    // ── 3. Shutdown ──────────────────────────────────────────────

    info!("stopping");
    camera.stop().await;
    if let Some(watcher) = &status {
        watcher.stop().await;
    }
    info!("stopped");

    Ok(())
}
