//! Transport layer for the camera stream.
//!
//! The printer exposes a raw TLS port with a self-signed certificate;
//! trust is established out-of-band by the access code, so peer
//! verification is disabled. The client writes the [`AuthPacket`]
//! immediately after the handshake — the protocol has no acknowledgment.
//!
//! [`Connector`] is the seam between the supervisor and the network, so
//! sessions can be driven from scripted byte streams in tests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::camera::auth::AuthPacket;
use crate::error::BambuError;

/// The printer's camera service port.
pub const CAMERA_PORT: u16 = 6000;

/// Deadline for TCP connect and for the TLS handshake, each.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// An authenticated camera byte stream.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

// ── Connector ────────────────────────────────────────────────────

/// Produces authenticated byte streams for the stream supervisor.
///
/// Every failure is retryable; the supervisor only distinguishes errors
/// by their [`cooldown`](BambuError::cooldown).
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<ByteStream, BambuError>;
}

// ── TlsCameraConnector ───────────────────────────────────────────

/// Connects to the printer camera port: TCP, TLS upgrade without peer
/// verification, then the 80-byte auth packet.
pub struct TlsCameraConnector {
    hostname: String,
    port: u16,
    connect_timeout: Duration,
    auth: AuthPacket,
}

impl TlsCameraConnector {
    pub fn new(hostname: &str, auth: AuthPacket) -> Self {
        Self {
            hostname: hostname.to_string(),
            port: CAMERA_PORT,
            connect_timeout: CONNECT_TIMEOUT,
            auth,
        }
    }

    /// Override the camera port (the printer firmware uses 6000).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the connect/handshake deadline.
    pub fn with_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

#[async_trait]
impl Connector for TlsCameraConnector {
    async fn connect(&self) -> Result<ByteStream, BambuError> {
        let tcp = timeout(
            self.connect_timeout,
            TcpStream::connect((self.hostname.as_str(), self.port)),
        )
        .await
        .map_err(|_| BambuError::Timeout(self.connect_timeout))??;

        // Self-signed certificate with the printer's serial as CN;
        // neither the chain nor the hostname can be verified.
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()?;
        let tls = tokio_native_tls::TlsConnector::from(tls);

        let mut stream = timeout(self.connect_timeout, tls.connect(&self.hostname, tcp))
            .await
            .map_err(|_| BambuError::Timeout(self.connect_timeout))?
            .map_err(|e| BambuError::Tls(e.to_string()))?;

        stream.write_all(self.auth.as_bytes()).await?;
        stream.flush().await?;

        Ok(Box::new(stream))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_refused_is_transport_error() {
        // Bind-then-drop guarantees an unused port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let auth = AuthPacket::new("1234").unwrap();
        let connector = TlsCameraConnector::new("127.0.0.1", auth).with_port(port);

        match connector.connect().await {
            Err(BambuError::Transport(_)) | Err(BambuError::Timeout(_)) => {}
            other => panic!("expected transport failure, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn plaintext_peer_fails_tls_handshake() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Accept and answer with garbage instead of a ServerHello.
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let _ = sock.write_all(b"not a tls server\n").await;
            }
        });

        let auth = AuthPacket::new("1234").unwrap();
        let connector = TlsCameraConnector::new("127.0.0.1", auth)
            .with_port(port)
            .with_timeout(Duration::from_secs(2));

        match connector.connect().await {
            Err(BambuError::Tls(_)) | Err(BambuError::Timeout(_)) => {}
            other => panic!("expected tls failure, got {:?}", other.map(|_| ())),
        }
    }
}
