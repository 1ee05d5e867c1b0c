//! Camera stream supervisor.
//!
//! Owns the connect → decode → classify → cooldown → reconnect loop on
//! one spawned worker task, and the public start/stop contract:
//!
//! ```text
//! Idle ──start()──► Connecting ──► Streaming ──failure──► Recovering
//!  ▲                    ▲                                     │
//!  └──────stop()────────┴──────────────cooldown───────────────┘
//! ```
//!
//! The worker never terminates on its own; every session-ending error
//! is logged and converted into a fixed cooldown. Only `stop()` (which
//! joins the worker before returning) ends the client.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::camera::auth::AuthPacket;
use crate::camera::buffer::FrameBuffer;
use crate::camera::decoder::{Frame, FrameDecoder, FrameEvent, READ_CHUNK};
use crate::camera::transport::{ByteStream, Connector, TlsCameraConnector};
use crate::error::BambuError;

/// Deadline for a single read. A stalled stream must not delay
/// `stop()` indefinitely; expiry is a no-op retry, not an error.
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

// ── FrameSink ────────────────────────────────────────────────────

/// Observer invoked by the worker for every validated frame.
///
/// Called synchronously from the stream worker, so implementations
/// must be cheap or hand the frame off to a channel.
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: &Frame);
}

impl<F> FrameSink for F
where
    F: Fn(&Frame) + Send + Sync,
{
    fn on_frame(&self, frame: &Frame) {
        self(frame)
    }
}

// ── Lifecycle ────────────────────────────────────────────────────

enum Lifecycle {
    Idle,
    Running {
        cancel: CancellationToken,
        worker: JoinHandle<()>,
    },
}

// ── CameraClient ─────────────────────────────────────────────────

/// Client for the printer's camera stream.
///
/// `start()` spawns the worker; `stop().await` cancels it and joins it,
/// guaranteeing no frame is produced after it returns. The frame buffer
/// persists across reconnects and across stop/start cycles.
pub struct CameraClient {
    connector: Arc<dyn Connector>,
    buffer: Arc<FrameBuffer>,
    lifecycle: Mutex<Lifecycle>,
}

impl std::fmt::Debug for CameraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraClient").finish_non_exhaustive()
    }
}

impl CameraClient {
    /// A client for the printer at `hostname` using the LAN access code.
    ///
    /// Fails only on invalid credentials; no I/O happens until `start`.
    pub fn new(hostname: &str, access_code: &str) -> Result<Self, BambuError> {
        let auth = AuthPacket::new(access_code)?;
        Ok(Self::with_connector(Arc::new(TlsCameraConnector::new(
            hostname, auth,
        ))))
    }

    /// A client over an explicit transport. Used by tests and by
    /// callers that need a non-default port or timeout.
    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            buffer: Arc::new(FrameBuffer::new()),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Shared handle to the frame history.
    pub fn buffer(&self) -> Arc<FrameBuffer> {
        Arc::clone(&self.buffer)
    }

    /// The most recent validated frame. Silently stale or `None`
    /// during outages — never an error.
    pub fn latest_frame(&self) -> Option<Frame> {
        self.buffer.latest()
    }

    /// Whether the worker is currently running.
    pub async fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock().await, Lifecycle::Running { .. })
    }

    /// Start the stream worker.
    ///
    /// Idempotent: a second call while running logs a warning and
    /// leaves the existing worker alone.
    pub async fn start(&self) {
        self.start_with_sink(None).await
    }

    /// Start the stream worker with a per-frame observer.
    pub async fn start_with_sink(&self, sink: Option<Arc<dyn FrameSink>>) {
        let mut lifecycle = self.lifecycle.lock().await;
        if matches!(*lifecycle, Lifecycle::Running { .. }) {
            warn!("camera stream already running");
            return;
        }

        let cancel = CancellationToken::new();
        let worker = tokio::spawn(stream_loop(
            Arc::clone(&self.connector),
            Arc::clone(&self.buffer),
            sink,
            cancel.clone(),
        ));
        *lifecycle = Lifecycle::Running { cancel, worker };
    }

    /// Stop the stream worker and wait for it to exit.
    ///
    /// After this returns no further frames are appended, even if the
    /// transport still had unread buffered bytes. Idempotent when not
    /// running.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        match std::mem::replace(&mut *lifecycle, Lifecycle::Idle) {
            Lifecycle::Idle => {
                warn!("camera stream is not running");
            }
            Lifecycle::Running { cancel, worker } => {
                cancel.cancel();
                if let Err(e) = worker.await {
                    warn!(error = %e, "camera worker join failed");
                }
            }
        }
    }
}

// ── Worker ───────────────────────────────────────────────────────

/// Outer recovery loop: run sessions until cancelled, sleeping the
/// error-specific cooldown between attempts.
async fn stream_loop(
    connector: Arc<dyn Connector>,
    buffer: Arc<FrameBuffer>,
    sink: Option<Arc<dyn FrameSink>>,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        match run_session(&*connector, &buffer, sink.as_deref(), &cancel).await {
            Ok(()) => break, // cancelled mid-session
            Err(e) => {
                let cooldown = e.cooldown();
                warn!(error = %e, ?cooldown, "camera session ended");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(cooldown) => {}
                }
            }
        }
    }
    info!("camera stream worker exited");
}

/// One connection attempt: connect, then decode until the session ends.
///
/// Returns `Ok(())` only when cancelled; any other exit is an error the
/// caller classifies for its cooldown.
async fn run_session(
    connector: &dyn Connector,
    buffer: &FrameBuffer,
    sink: Option<&dyn FrameSink>,
    cancel: &CancellationToken,
) -> Result<(), BambuError> {
    let mut stream: ByteStream = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        result = connector.connect() => result?,
    };
    info!("connected to printer camera");

    let mut decoder = FrameDecoder::new();
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let want = decoder.read_hint().min(chunk.len());
        let n = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = timeout(READ_TIMEOUT, stream.read(&mut chunk[..want])) => match result {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(e.into()),
                // No data yet — retry without touching decoder state.
                Err(_) => continue,
            }
        };

        match decoder.feed(&chunk[..n])? {
            FrameEvent::Frame(frame) => {
                trace!(len = frame.len(), "frame decoded");
                buffer.push(frame.clone());
                if let Some(sink) = sink {
                    sink.on_frame(&frame);
                }
            }
            FrameEvent::Discarded(reason) => {
                warn!(reason, "frame discarded");
            }
            FrameEvent::Incomplete => {}
        }
    }
}
