//! `tokio_util::codec` adapter over the streaming decoder and the encoder.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::decoder::{DecoderStats, FrameDecoder};
use crate::error::FrameError;

/// Frame codec for `FramedRead`/`FramedWrite`.
#[derive(Debug, Default)]
pub struct SkylinkCodec {
    decoder: FrameDecoder,
}

impl SkylinkCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            decoder: FrameDecoder::with_checksum_verification(config.verify_checksum),
        }
    }

    /// Decoder counters.
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }
}

impl Decoder for SkylinkCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        let mut consumed = 0usize;
        while consumed < src.len() {
            let byte = src[consumed];
            consumed += 1;
            if let Some(frame) = self.decoder.feed(byte) {
                src.advance(consumed);
                return Ok(Some(frame));
            }
        }
        // Every byte lives on in the decoder state.
        src.advance(consumed);
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        // A partial frame at EOF is dropped like any other unterminated frame.
        let frame = self.decode(src)?;
        if frame.is_none() {
            self.decoder.reset();
        }
        Ok(frame)
    }
}

impl Encoder<Frame> for SkylinkCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item.address, item.rtr, item.payload.as_ref(), dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::codec::{ESCAPE, SYNC};

    #[tokio::test]
    async fn framed_write_then_read() {
        let mut wire = Vec::new();
        {
            let mut sink = FramedWrite::new(&mut wire, SkylinkCodec::new());
            sink.send(Frame::new(5, false, vec![1, 2, 3])).await.unwrap();
            sink.send(Frame::new(1008, true, vec![SYNC, ESCAPE])).await.unwrap();
        }

        let mut stream = FramedRead::new(wire.as_slice(), SkylinkCodec::new());
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();

        assert_eq!((first.address, first.payload.as_ref()), (5, [1u8, 2, 3].as_ref()));
        assert_eq!(second.address, 1008);
        assert!(second.rtr);
        assert_eq!(second.payload.as_ref(), &[SYNC, ESCAPE]);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn oversized_payload_fails_encode() {
        let mut wire = Vec::new();
        let mut sink = FramedWrite::new(&mut wire, SkylinkCodec::new());
        let err = sink.send(Frame::new(1, false, vec![0u8; 16])).await.unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn decode_keeps_partial_state_across_calls() {
        let mut wire = BytesMut::new();
        encode_frame(9, false, &[7, 7], &mut wire).unwrap();

        let mut codec = SkylinkCodec::new();
        let mut head = BytesMut::from(&wire[..3]);
        assert!(codec.decode(&mut head).unwrap().is_none());
        assert!(head.is_empty());

        let mut tail = BytesMut::from(&wire[3..]);
        let frame = codec.decode(&mut tail).unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), &[7, 7]);
        assert_eq!(codec.stats().frames, 1);
    }
}
