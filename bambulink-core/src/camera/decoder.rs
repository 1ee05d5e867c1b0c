//! Incremental decoder for the camera byte stream.
//!
//! After authentication the printer streams an unbounded sequence of
//! 16-byte length headers interleaved with raw JPEG payload bytes; there
//! is no other message type and no delimiter beyond the declared byte
//! count. The decoder is a two-state machine fed with whatever chunk the
//! transport produced:
//!
//! ```text
//! AwaitingHeader ──16-byte chunk──► AccumulatingPayload
//!       ▲                                  │
//!       └── frame emitted / discarded ◄────┘
//! ```
//!
//! JPEG SOI/EOI markers are checked as a sanity gate on completed
//! payloads only; they are never used to re-synchronize the stream.

use bytes::{Bytes, BytesMut};

use crate::error::BambuError;

/// Size of the frame-length header. The first 3 bytes carry a
/// little-endian payload length; the rest are unused.
pub const HEADER_SIZE: usize = 16;

/// Upper bound on a declared payload length. A header announcing more
/// than this is treated as stream corruption, not a real frame.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// JPEG Start-Of-Image marker as emitted by the printer (JFIF APP0).
pub const JPEG_SOI: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

/// JPEG End-Of-Image marker.
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// How many payload bytes to request per read while accumulating.
pub const READ_CHUNK: usize = 4096;

/// One complete JPEG image extracted from the stream.
pub type Frame = Bytes;

// ── Events ───────────────────────────────────────────────────────

/// Outcome of feeding one chunk to the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// The chunk was consumed; more bytes are needed.
    Incomplete,
    /// A payload completed and passed boundary validation.
    Frame(Frame),
    /// A payload completed (or overran) and was dropped. The session
    /// continues — the next header re-synchronizes the stream.
    Discarded(&'static str),
}

// ── State machine ────────────────────────────────────────────────

#[derive(Debug)]
enum DecodeState {
    /// Expecting the next 16-byte length header.
    AwaitingHeader,
    /// Collecting exactly `target` payload bytes.
    AccumulatingPayload { target: usize, buf: BytesMut },
}

/// Incremental camera stream decoder.
///
/// Accumulator state lives for one connection; the supervisor creates a
/// fresh decoder per attempt.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecodeState,
    frames_emitted: u64,
    frames_discarded: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::AwaitingHeader,
            frames_emitted: 0,
            frames_discarded: 0,
        }
    }

    /// How many bytes the transport should try to read next.
    ///
    /// Exactly one header while waiting for one, otherwise the remaining
    /// payload capped at [`READ_CHUNK`]. Reading past a frame boundary
    /// would hand header bytes to the payload accumulator.
    pub fn read_hint(&self) -> usize {
        match &self.state {
            DecodeState::AwaitingHeader => HEADER_SIZE,
            DecodeState::AccumulatingPayload { target, buf } => {
                (target - buf.len()).min(READ_CHUNK)
            }
        }
    }

    /// Frames emitted since construction.
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Frames dropped by overflow or boundary validation.
    pub fn frames_discarded(&self) -> u64 {
        self.frames_discarded
    }

    /// Feed the next chunk read from the transport.
    ///
    /// An `Err` ends the session; the supervisor classifies it and
    /// applies the matching cooldown. [`FrameEvent::Discarded`] does not
    /// end the session.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<FrameEvent, BambuError> {
        match &mut self.state {
            DecodeState::AwaitingHeader => match chunk.len() {
                HEADER_SIZE => {
                    let target = payload_length(chunk);
                    if target == 0 {
                        return Err(BambuError::Protocol("header announced zero-length frame"));
                    }
                    if target > MAX_FRAME_SIZE {
                        return Err(BambuError::Protocol("announced frame length exceeds limit"));
                    }
                    self.state = DecodeState::AccumulatingPayload {
                        target,
                        buf: BytesMut::with_capacity(target),
                    };
                    Ok(FrameEvent::Incomplete)
                }
                // EOF at a frame boundary: the printer dropped us right
                // after (or between) frames. Immediately post-connect this
                // means bad credentials or the wrong host.
                0 => Err(BambuError::Rejected),
                _ => Err(BambuError::Protocol("unexpected chunk where header expected")),
            },

            DecodeState::AccumulatingPayload { target, buf } => {
                if chunk.is_empty() {
                    return Err(BambuError::Protocol("stream closed mid-frame"));
                }
                buf.extend_from_slice(chunk);

                if buf.len() > *target {
                    self.frames_discarded += 1;
                    self.state = DecodeState::AwaitingHeader;
                    return Ok(FrameEvent::Discarded("payload overran announced length"));
                }
                if buf.len() < *target {
                    return Ok(FrameEvent::Incomplete);
                }

                // Complete payload — sanity-check the JPEG boundaries.
                let frame = std::mem::take(buf).freeze();
                self.state = DecodeState::AwaitingHeader;
                if is_valid_jpeg(&frame) {
                    self.frames_emitted += 1;
                    Ok(FrameEvent::Frame(frame))
                } else {
                    self.frames_discarded += 1;
                    Ok(FrameEvent::Discarded("bad JPEG boundary markers"))
                }
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the 3-byte little-endian length field of a header chunk.
fn payload_length(header: &[u8]) -> usize {
    u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize
}

/// A frame is valid iff it starts with SOI+APP0 and ends with EOI.
fn is_valid_jpeg(frame: &[u8]) -> bool {
    frame.len() >= JPEG_SOI.len() + JPEG_EOI.len()
        && frame[..JPEG_SOI.len()] == JPEG_SOI
        && frame[frame.len() - JPEG_EOI.len()..] == JPEG_EOI
}

// ── Tests ────────────────────────────────────────────────────────
