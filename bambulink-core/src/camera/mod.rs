//! Camera stream client.
//!
//! The printer streams JPEG frames over a raw TLS port using a
//! proprietary length-prefixed framing convention. The pipeline:
//!
//! 1. [`auth::AuthPacket`] — fixed 80-byte handshake blob.
//! 2. [`transport::TlsCameraConnector`] — TCP + TLS (no verification) + auth.
//! 3. [`decoder::FrameDecoder`] — raw chunks → validated JPEG frames.
//! 4. [`buffer::FrameBuffer`] — bounded history of recent frames.
//! 5. [`client::CameraClient`] — lifecycle, recovery, public API.

pub mod auth;
pub mod buffer;
pub mod client;
pub mod decoder;
pub mod transport;

pub use auth::AuthPacket;
pub use buffer::{FRAME_BUFFER_CAPACITY, FrameBuffer};
pub use client::{CameraClient, FrameSink, READ_TIMEOUT};
pub use decoder::{Frame, FrameDecoder, FrameEvent, HEADER_SIZE, JPEG_EOI, JPEG_SOI, MAX_FRAME_SIZE};
pub use transport::{ByteStream, CAMERA_PORT, CONNECT_TIMEOUT, Connector, TlsCameraConnector};
