//! # bambulink-core
//!
//! Client library for Bambu Lab printers on the LAN.
//!
//! This crate contains:
//! - **Camera**: `CameraClient` — authenticates to the printer's raw TLS
//!   video port, decodes the length-prefixed JPEG stream, buffers recent
//!   frames, and reconnects across failures
//! - **Status**: `StatusWatcher` — MQTT report subscription with
//!   incremental JSON merging into a `PrinterReport`
//! - **Error**: `BambuError` — typed, `thiserror`-based error hierarchy
//!   with the per-error reconnect cooldown policy

pub mod camera;
pub mod error;
pub mod status;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use camera::{
    AuthPacket, ByteStream, CameraClient, Connector, Frame, FrameBuffer, FrameDecoder,
    FrameEvent, FrameSink, TlsCameraConnector,
};
pub use error::{BambuError, REJECTED_COOLDOWN, RETRY_COOLDOWN};
pub use status::{PrinterReport, StatusWatcher};
