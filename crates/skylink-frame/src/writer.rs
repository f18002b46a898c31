use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::stream::StreamTimeouts;

// Sync + worst-case escaped meta, payload and checksum.
const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Writes complete frames to any `Write` stream.
///
/// A writer owns its stream exclusively; share one across threads behind a
/// mutex (see [`crate::Connection::send`]).
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking). The frame's checksum field is
    /// recomputed, not copied.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.address, frame.rtr, frame.payload.as_ref())
    }

    /// Encode and send a payload to an address.
    pub fn send(&mut self, address: u16, rtr: bool, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(address, rtr, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // WouldBlock/TimedOut are returned, never retried.
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: Write + StreamTimeouts> FrameWriter<T> {
    /// Create a frame writer and apply the write timeout from config.
    pub fn with_config_timeout(inner: T, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::codec::{ESCAPE, SYNC};
    use crate::decoder::FrameDecoder;

    fn decode_all(bytes: &[u8]) -> Vec<Frame> {
        FrameDecoder::new().feed_slice(bytes)
    }

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.send(5, false, &[1, 2, 3]).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire, vec![SYNC, 0x00, 0xA3, 1, 2, 3, 0xA9]);
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.send(1, false, b"one").unwrap();
        writer.send(2, true, b"two").unwrap();
        writer.send(3, false, b"three").unwrap();

        let frames = decode_all(&writer.into_inner().into_inner());
        assert_eq!(frames.len(), 3);
        assert_eq!((frames[0].address, frames[0].payload.as_ref()), (1, b"one".as_ref()));
        assert_eq!((frames[1].address, frames[1].rtr), (2, true));
        assert_eq!((frames[2].address, frames[2].payload.as_ref()), (3, b"three".as_ref()));
    }

    #[test]
    fn escapes_marker_bytes() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(0x20, false, &[SYNC, ESCAPE]).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire.iter().filter(|b| **b == SYNC).count(), 1);
        assert_eq!(decode_all(&wire)[0].payload.as_ref(), &[SYNC, ESCAPE]);
    }

    #[test]
    fn payload_too_large_rejected() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let err = writer.send(1, false, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 16, max: 15 }));
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn write_frame_method() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let frame = Frame::new(2, false, "abc");

        writer.write_frame(&frame).unwrap();

        let decoded = decode_all(&writer.into_inner().into_inner());
        assert_eq!(decoded[0].address, 2);
        assert_eq!(decoded[0].payload.as_ref(), b"abc");
        assert_eq!(decoded[0].checksum, frame.checksum);
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(1, false, b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send(5, false, b"retry").unwrap();

        let inner = writer.into_inner();
        assert_eq!(decode_all(&inner.data)[0].payload.as_ref(), b"retry");
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(1, false, b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn blocked_write_and_flush_surface_as_io() {
        let mut writer = FrameWriter::new(BlockedWriter {
            kind: ErrorKind::WouldBlock,
            writes: 0,
        });
        let err = writer.send(1, false, b"x").unwrap_err();
        assert!(matches!(&err, FrameError::Io(io) if io.kind() == ErrorKind::WouldBlock));
        assert_eq!(writer.get_ref().writes, 1);

        let mut writer = FrameWriter::new(BlockedWriter {
            kind: ErrorKind::TimedOut,
            writes: 0,
        });
        let err = writer.flush().unwrap_err();
        assert!(matches!(&err, FrameError::Io(io) if io.kind() == ErrorKind::TimedOut));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        assert!(writer.config().write_timeout.is_none());
        let _inner = writer.into_inner();
    }

    #[test]
    #[cfg(unix)]
    fn applies_write_timeout_for_socket() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let cfg = FrameConfig {
            write_timeout: Some(std::time::Duration::from_millis(10)),
            ..FrameConfig::default()
        };

        let writer = FrameWriter::with_config_timeout(left, cfg);
        assert!(writer.is_ok());
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct BlockedWriter {
        kind: ErrorKind,
        writes: usize,
    }

    impl Write for BlockedWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.writes += 1;
            Err(std::io::Error::from(self.kind))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::from(self.kind))
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
