use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::codec::{Frame, FrameConfig};
use crate::decoder::{DecoderStats, FrameDecoder};
use crate::error::{FrameError, Result};
use crate::stream::StreamTimeouts;

// Serial frames are at most 33 bytes escaped; small reads keep latency low.
const READ_CHUNK_SIZE: usize = 64;

/// Reads complete frames from any `Read` stream.
///
/// Partial reads, escaping and resynchronization are handled internally;
/// callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    decoder: FrameDecoder,
    pending: VecDeque<Frame>,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::with_checksum_verification(config.verify_checksum),
            pending: VecDeque::new(),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. A read
    /// timeout surfaces as `FrameError::Io` with `WouldBlock`/`TimedOut`; any
    /// partial frame is kept and completed by the next call.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            for byte in &chunk[..read] {
                if let Some(frame) = self.decoder.feed(*byte) {
                    self.pending.push_back(frame);
                }
            }
        }
    }

    /// Decoder counters (frames, checksum failures, discarded bytes).
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: Read + StreamTimeouts> FrameReader<T> {
    /// Create a frame reader and apply the read timeout from config.
    pub fn with_config_timeout(inner: T, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
