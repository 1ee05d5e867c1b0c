//! Printer status watcher.
//!
//! Thin wrapper around the printer's MQTT report channel: subscribes to
//! `device/{serial}/report`, requests a full state push once per
//! connection, and merges the partial `print` objects the firmware
//! publishes into one cached [`PrinterReport`]. Consumers read the
//! latest report through a `watch` channel.
//!
//! Same lifecycle contract as the camera client: errors are logged and
//! retried after a fixed cooldown, forever, until `stop()`.

use std::time::Instant;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, TlsConfiguration, Transport};
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::camera::auth::CAMERA_USERNAME;
use crate::error::BambuError;

/// The printer's MQTT-over-TLS port.
pub const MQTT_PORT: u16 = 8883;

/// MQTT keep-alive; the firmware drops silent clients aggressively.
pub const KEEP_ALIVE: Duration = Duration::from_secs(5);

/// Request payload asking the firmware to push its complete state.
/// Reports are incremental diffs otherwise.
const PUSHALL_REQUEST: &str =
    r#"{"pushing": {"sequence_id": 1, "command": "pushall"}, "user_id": "1234567890"}"#;

/// Topic the printer publishes status reports on.
pub fn report_topic(serial: &str) -> String {
    format!("device/{serial}/report")
}

/// Topic the printer accepts requests on.
pub fn request_topic(serial: &str) -> String {
    format!("device/{serial}/request")
}

// ── PrinterReport ────────────────────────────────────────────────

/// Accumulated printer state, merged from incremental reports.
#[derive(Debug, Clone, Default)]
pub struct PrinterReport {
    print: Value,
    received_at: Option<Instant>,
}

impl PrinterReport {
    /// Whether any report has arrived yet.
    pub fn is_empty(&self) -> bool {
        self.received_at.is_none()
    }

    /// The merged `print` object as raw JSON.
    pub fn print(&self) -> &Value {
        &self.print
    }

    /// Time since the last report was merged in.
    pub fn age(&self) -> Option<std::time::Duration> {
        self.received_at.map(|t| t.elapsed())
    }

    /// Firmware job state, e.g. `IDLE`, `RUNNING`, `PAUSE`, `FAILED`.
    pub fn gcode_state(&self) -> Option<&str> {
        self.print.get("gcode_state")?.as_str()
    }

    /// Print progress in percent.
    pub fn progress_percent(&self) -> Option<u64> {
        self.print.get("mc_percent")?.as_u64()
    }

    /// Estimated minutes until the job finishes.
    pub fn remaining_minutes(&self) -> Option<u64> {
        self.print.get("mc_remaining_time")?.as_u64()
    }

    /// Merge an incremental `print` update into the cached state.
    fn absorb(&mut self, update: &Value) {
        merge_value(&mut self.print, update);
        self.received_at = Some(Instant::now());
    }
}

/// Recursive JSON merge: objects merge key-wise, everything else
/// (scalars, arrays, nulls) replaces the previous value.
fn merge_value(dst: &mut Value, src: &Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (key, src_val) in src_map {
                merge_value(dst_map.entry(key.clone()).or_insert(Value::Null), src_val);
            }
        }
        (dst, src) => *dst = src.clone(),
    }
}

// ── StatusWatcher ────────────────────────────────────────────────

enum Lifecycle {
    Idle,
    Running {
        cancel: CancellationToken,
        worker: JoinHandle<()>,
    },
}

/// Watches the printer's MQTT report channel on a background worker.
pub struct StatusWatcher {
    hostname: String,
    access_code: String,
    serial: String,
    report_tx: watch::Sender<PrinterReport>,
    report_rx: watch::Receiver<PrinterReport>,
    lifecycle: Mutex<Lifecycle>,
}

impl StatusWatcher {
    /// A watcher for the printer at `hostname` with the given serial.
    pub fn new(hostname: &str, access_code: &str, serial: &str) -> Result<Self, BambuError> {
        if !access_code.is_ascii() {
            return Err(BambuError::Credential("access code must be ASCII"));
        }
        if access_code.len() > 32 {
            return Err(BambuError::Credential("access code exceeds 32 bytes"));
        }

        let (report_tx, report_rx) = watch::channel(PrinterReport::default());
        Ok(Self {
            hostname: hostname.to_string(),
            access_code: access_code.to_string(),
            serial: serial.to_string(),
            report_tx,
            report_rx,
            lifecycle: Mutex::new(Lifecycle::Idle),
        })
    }

    /// A receiver that yields the merged report after every update.
    pub fn subscribe(&self) -> watch::Receiver<PrinterReport> {
        self.report_rx.clone()
    }

    /// The current merged report.
    pub fn current(&self) -> PrinterReport {
        self.report_rx.borrow().clone()
    }

    /// Start the watcher worker. Idempotent, like the camera client.
    pub async fn start(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if matches!(*lifecycle, Lifecycle::Running { .. }) {
            warn!("status watcher already running");
            return;
        }

        let cancel = CancellationToken::new();
        let worker = tokio::spawn(watch_loop(
            self.hostname.clone(),
            self.access_code.clone(),
            self.serial.clone(),
            self.report_tx.clone(),
            cancel.clone(),
        ));
        *lifecycle = Lifecycle::Running { cancel, worker };
    }

    /// Stop the watcher and wait for the worker to exit.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        match std::mem::replace(&mut *lifecycle, Lifecycle::Idle) {
            Lifecycle::Idle => {
                warn!("status watcher is not running");
            }
            Lifecycle::Running { cancel, worker } => {
                cancel.cancel();
                if let Err(e) = worker.await {
                    warn!(error = %e, "status worker join failed");
                }
            }
        }
    }
}

// ── Worker ───────────────────────────────────────────────────────

async fn watch_loop(
    hostname: String,
    access_code: String,
    serial: String,
    report_tx: watch::Sender<PrinterReport>,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        match run_session(&hostname, &access_code, &serial, &report_tx, &cancel).await {
            Ok(()) => break, // cancelled
            Err(e) => {
                let cooldown = e.cooldown();
                warn!(error = %e, ?cooldown, "status session ended");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(cooldown) => {}
                }
            }
        }
    }
    info!("status watcher exited");
}

async fn run_session(
    hostname: &str,
    access_code: &str,
    serial: &str,
    report_tx: &watch::Sender<PrinterReport>,
    cancel: &CancellationToken,
) -> Result<(), BambuError> {
    let mut options = MqttOptions::new(
        format!("bambulink-{}", std::process::id()),
        hostname,
        MQTT_PORT,
    );
    options.set_credentials(CAMERA_USERNAME, access_code);
    options.set_keep_alive(KEEP_ALIVE);

    // Same self-signed certificate as the camera port.
    let tls = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()?;
    options.set_transport(Transport::Tls(TlsConfiguration::NativeConnector(tls)));

    let (client, mut eventloop) = AsyncClient::new(options, 64);
    client
        .subscribe(report_topic(serial), QoS::AtMostOnce)
        .await?;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            event = eventloop.poll() => event?,
        };

        match event {
            Event::Incoming(Packet::ConnAck(_)) => {
                info!("connected to printer status channel");
                // Reports are diffs; ask for the full state once.
                client
                    .publish(request_topic(serial), QoS::AtMostOnce, false, PUSHALL_REQUEST)
                    .await?;
            }
            Event::Incoming(Packet::Publish(publish)) => {
                handle_report(&publish.payload, report_tx);
            }
            _ => {}
        }
    }
}

fn handle_report(payload: &[u8], report_tx: &watch::Sender<PrinterReport>) {
    let doc: Value = match serde_json::from_slice(payload) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "unparseable status report");
            return;
        }
    };

    match doc.get("print") {
        Some(update) if update.is_object() => {
            trace!("merging print report");
            report_tx.send_modify(|report| report.absorb(update));
        }
        // Reports also carry system/info documents; not ours.
        _ => trace!("ignoring non-print report"),
    }
}

// ── Tests ────────────────────────────────────────────────────────
