//! Monitor configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Printer connection settings.
    pub printer: PrinterConfig,
    /// Camera snapshot settings.
    pub snapshot: SnapshotConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Printer connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Printer hostname or IP on the LAN.
    pub hostname: String,
    /// LAN access code (printer screen → settings → network).
    pub access_code: String,
    /// Printer serial; enables the status channel when set.
    pub serial: String,
}

/// Camera snapshot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Where the latest frame is written.
    pub path: String,
    /// Seconds between snapshots / status lines.
    pub interval_secs: u64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (overridden by `RUST_LOG`).
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            printer: PrinterConfig::default(),
            snapshot: SnapshotConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            access_code: String::new(),
            serial: String::new(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: "snapshot.jpg".into(),
            interval_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl MonitorConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
