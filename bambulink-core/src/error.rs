//! Error types for the printer clients.
//!
//! All fallible operations return `Result<T, BambuError>`.
//! Every runtime failure inside a worker is logged and converted into a
//! cooldown-then-retry — only an explicit `stop()` ends a client.

use std::time::Duration;
use thiserror::Error;

/// Delay before reconnecting after an ordinary session failure.
pub const RETRY_COOLDOWN: Duration = Duration::from_secs(1);

/// Delay before reconnecting after the printer rejected the connection.
/// A rejection usually means a wrong access code or hostname, so hammering
/// the port any faster buys nothing.
pub const REJECTED_COOLDOWN: Duration = Duration::from_secs(5);

/// The canonical error type for the Bambu printer clients.
#[derive(Debug, Error)]
pub enum BambuError {
    // ── Credential Errors ────────────────────────────────────────
    /// A username or access code failed validation at construction.
    #[error("invalid credential: {0}")]
    Credential(&'static str),

    // ── Transport Errors ─────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The TLS handshake failed.
    #[error("tls error: {0}")]
    Tls(String),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Protocol Errors ──────────────────────────────────────────
    /// The camera stream violated the framing convention.
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    /// The printer closed the connection immediately after the
    /// handshake — typically a wrong hostname or access code.
    #[error("connection rejected by printer")]
    Rejected,

    // ── Status Channel Errors ────────────────────────────────────
    /// The MQTT status channel reported an error.
    #[error("status channel error: {0}")]
    Status(String),
}

impl BambuError {
    /// How long the supervisor should wait before the next connection
    /// attempt after this error ended a session.
    ///
    /// Fixed delays, no backoff: 5 s for a rejection, 1 s for
    /// everything else.
    pub fn cooldown(&self) -> Duration {
        match self {
            Self::Rejected => REJECTED_COOLDOWN,
            _ => RETRY_COOLDOWN,
        }
    }
}

impl From<native_tls::Error> for BambuError {
    fn from(e: native_tls::Error) -> Self {
        BambuError::Tls(e.to_string())
    }
}

impl From<rumqttc::ClientError> for BambuError {
    fn from(e: rumqttc::ClientError) -> Self {
        BambuError::Status(e.to_string())
    }
}

impl From<rumqttc::ConnectionError> for BambuError {
    fn from(e: rumqttc::ConnectionError) -> Self {
        BambuError::Status(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = BambuError::Credential("access code exceeds 32 bytes");
        assert!(e.to_string().contains("32"));

        let e = BambuError::Timeout(Duration::from_secs(2));
        assert!(e.to_string().contains("2s"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let e: BambuError = io_err.into();
        assert!(matches!(e, BambuError::Transport(_)));
    }

    #[test]
    fn cooldown_policy() {
        assert_eq!(BambuError::Rejected.cooldown(), REJECTED_COOLDOWN);
        assert_eq!(
            BambuError::Protocol("bad header").cooldown(),
            RETRY_COOLDOWN
        );
        assert_eq!(
            BambuError::Timeout(Duration::from_secs(2)).cooldown(),
            RETRY_COOLDOWN
        );
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        assert_eq!(BambuError::from(io_err).cooldown(), RETRY_COOLDOWN);
    }
}
