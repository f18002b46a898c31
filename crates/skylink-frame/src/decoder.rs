use std::time::SystemTime;

use bytes::Bytes;

use crate::codec::{checksum, unescape, Frame, FrameMeta, ESCAPE, MAX_PAYLOAD, SYNC};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing aligned yet; bytes are dropped until the first sync marker.
    AwaitSync,
    Meta0,
    Meta1 { m0: u8 },
    Payload { meta: FrameMeta },
    Checksum { meta: FrameMeta },
    /// Checksum seen; anything before the next sync is a malformed trailer.
    Trailer,
}

/// Counters kept by a [`FrameDecoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames handed back to the caller.
    pub frames: u64,
    /// Frames dropped because the checksum did not match.
    pub checksum_failures: u64,
    /// Partial frames abandoned because a new sync marker arrived.
    pub aborted_frames: u64,
    /// Bytes ignored before alignment or after a checksum.
    pub discarded_bytes: u64,
}

/// Streaming frame decoder.
///
/// Purely reactive: one byte in, at most one frame out. Never blocks and
/// keeps no reference to the underlying stream, so it can sit under a
/// blocking reader loop or an async codec alike.
#[derive(Debug)]
pub struct FrameDecoder {
    state: State,
    escaped: bool,
    payload: Vec<u8>,
    timestamp: SystemTime,
    verify_checksum: bool,
    stats: DecoderStats,
}

impl FrameDecoder {
    /// Create a decoder that verifies checksums.
    pub fn new() -> Self {
        Self::with_checksum_verification(true)
    }

    /// Create a decoder, choosing whether mismatched checksums are dropped.
    pub fn with_checksum_verification(verify_checksum: bool) -> Self {
        Self {
            state: State::AwaitSync,
            escaped: false,
            payload: Vec::with_capacity(MAX_PAYLOAD),
            timestamp: SystemTime::UNIX_EPOCH,
            verify_checksum,
            stats: DecoderStats::default(),
        }
    }

    /// Feed one raw wire byte.
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        if byte == SYNC {
            self.resync();
            return None;
        }

        match self.state {
            State::AwaitSync | State::Trailer => {
                self.stats.discarded_bytes += 1;
                return None;
            }
            _ => {}
        }

        if byte == ESCAPE {
            self.escaped = true;
            return None;
        }

        let byte = if self.escaped {
            self.escaped = false;
            unescape(byte)
        } else {
            byte
        };

        match self.state {
            State::Meta0 => {
                self.state = State::Meta1 { m0: byte };
                None
            }
            State::Meta1 { m0 } => {
                let meta = FrameMeta::unpack([m0, byte]);
                self.state = if meta.length == 0 {
                    State::Checksum { meta }
                } else {
                    State::Payload { meta }
                };
                None
            }
            State::Payload { meta } => {
                self.payload.push(byte);
                if self.payload.len() == usize::from(meta.length) {
                    self.state = State::Checksum { meta };
                }
                None
            }
            State::Checksum { meta } => {
                self.state = State::Trailer;
                self.complete(meta, byte)
            }
            State::AwaitSync | State::Trailer => None,
        }
    }

    /// Feed a run of raw bytes, collecting every completed frame.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|b| self.feed(*b)).collect()
    }

    /// True when no partial frame is buffered.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::AwaitSync | State::Trailer)
    }

    /// Decoder counters.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Drop any partial frame and wait for the next sync marker.
    pub fn reset(&mut self) {
        self.state = State::AwaitSync;
        self.escaped = false;
        self.payload.clear();
    }

    fn resync(&mut self) {
        if !self.is_idle() && self.state != State::Meta0 {
            self.stats.aborted_frames += 1;
            tracing::debug!(state = ?self.state, "sync marker inside frame; partial frame dropped");
        }
        self.state = State::Meta0;
        self.escaped = false;
        self.payload.clear();
        self.timestamp = SystemTime::now();
    }

    fn complete(&mut self, meta: FrameMeta, received: u8) -> Option<Frame> {
        let expected = checksum(meta.pack(), &self.payload);
        if self.verify_checksum && expected != received {
            self.stats.checksum_failures += 1;
            tracing::debug!(
                address = meta.address,
                expected,
                received,
                "checksum mismatch; frame dropped"
            );
            self.payload.clear();
            return None;
        }

        self.stats.frames += 1;
        let payload = Bytes::copy_from_slice(&self.payload);
        self.payload.clear();
        Some(Frame {
            address: meta.address,
            rtr: meta.rtr,
            payload,
            checksum: received,
            timestamp: self.timestamp,
        })
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
