//! Bounded history of the most recent camera frames.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::camera::decoder::Frame;

/// How many frames the buffer retains.
pub const FRAME_BUFFER_CAPACITY: usize = 10;

/// FIFO store of the most recent validated frames.
///
/// Single producer (the stream worker), any number of readers. Frames
/// are `Bytes`, so readers get cheap handles to immutable payloads — a
/// frame is only pushed after full validation, so a reader can never
/// observe a torn or partial image.
///
/// The buffer is intentionally **not** cleared on disconnect: consumers
/// prefer a stale image over a gap while the stream recovers.
#[derive(Debug)]
pub struct FrameBuffer {
    frames: Mutex<VecDeque<Frame>>,
    capacity: usize,
}

impl FrameBuffer {
    /// A buffer with the standard capacity of 10 frames.
    pub fn new() -> Self {
        Self::with_capacity(FRAME_BUFFER_CAPACITY)
    }

    /// A buffer with an explicit capacity (must be non-zero).
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a validated frame, evicting the oldest when full. O(1).
    pub fn push(&self, frame: Frame) {
        let mut frames = self.guard();
        if frames.len() == self.capacity {
            frames.pop_front();
        }
        frames.push_back(frame);
    }

    /// The most recent frame, if any has arrived yet.
    pub fn latest(&self) -> Option<Frame> {
        self.guard().back().cloned()
    }

    /// All buffered frames, oldest first.
    pub fn snapshot(&self) -> Vec<Frame> {
        self.guard().iter().cloned().collect()
    }

    /// Number of frames currently buffered.
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    // The critical sections above cannot panic, but a poisoned lock
    // must not take the reader side down with it.
    fn guard(&self) -> MutexGuard<'_, VecDeque<Frame>> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn frame(n: u8) -> Frame {
        Bytes::from(vec![n; 8])
    }

    #[test]
    fn empty_buffer_has_no_latest() {
        let buf = FrameBuffer::new();
        assert!(buf.latest().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn latest_is_most_recent_push() {
        let buf = FrameBuffer::new();
        buf.push(frame(1));
        buf.push(frame(2));
        assert_eq!(buf.latest().unwrap(), frame(2));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let buf = FrameBuffer::new();
        for n in 1..=11 {
            buf.push(frame(n));
        }

        let frames = buf.snapshot();
        assert_eq!(frames.len(), FRAME_BUFFER_CAPACITY);
        // Frames 2..=11 survive in arrival order; frame 1 is gone.
        for (i, f) in frames.iter().enumerate() {
            assert_eq!(*f, frame(i as u8 + 2));
        }
    }

    #[test]
    fn concurrent_readers_see_whole_frames() {
        use std::sync::Arc;

        let buf = Arc::new(FrameBuffer::new());
        let writer = {
            let buf = Arc::clone(&buf);
            std::thread::spawn(move || {
                for n in 0..200 {
                    buf.push(frame(n as u8));
                }
            })
        };

        for _ in 0..200 {
            if let Some(f) = buf.latest() {
                // Every visible frame is complete and uniform.
                assert_eq!(f.len(), 8);
                assert!(f.iter().all(|&b| b == f[0]));
            }
        }
        writer.join().unwrap();
    }
}
