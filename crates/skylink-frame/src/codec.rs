use std::time::{Duration, SystemTime};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Start-of-frame marker. Never escaped, always resets the decoder.
pub const SYNC: u8 = 0x7E;

/// Escape marker: the next raw byte is XORed with [`ESCAPE_XOR`].
pub const ESCAPE: u8 = 0x7D;

/// Bit flipped on an escaped byte.
pub const ESCAPE_XOR: u8 = 0x20;

/// Maximum payload carried by one frame.
pub const MAX_PAYLOAD: usize = 15;

/// Number of addressable packets (11-bit address).
pub const ADDRESS_SPACE: u16 = 2048;

/// Metadata bytes preceding the payload.
pub const META_SIZE: usize = 2;

/// Read timeout applied by connections so the reader loop observes `stop()`.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Address, RTR flag and payload length as packed into the two metadata bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    pub address: u16,
    pub rtr: bool,
    pub length: u8,
}

impl FrameMeta {
    /// Pack into `[m0, m1]`.
    ///
    /// `m0 = address / 8`, `m1 = (address % 8) * 32 + rtr * 16 + length`.
    /// The low five bits of `m1` (RTR + length) never reach 32, so
    /// `m1 / 32` recovers `address % 8` exactly. Widening the address space
    /// requires re-deriving both formulas.
    pub fn pack(self) -> [u8; 2] {
        debug_assert!(self.address < ADDRESS_SPACE);
        debug_assert!(usize::from(self.length) <= MAX_PAYLOAD);

        let m0 = (self.address / 8) as u8;
        let m1 = (self.address % 8) as u8 * 32 + u8::from(self.rtr) * 16 + self.length;
        [m0, m1]
    }

    /// Inverse of [`FrameMeta::pack`].
    pub fn unpack(meta: [u8; 2]) -> Self {
        let [m0, m1] = meta;
        Self {
            address: u16::from(m1 / 32) + u16::from(m0) * 8,
            rtr: m1 & 0x10 != 0,
            length: m1 & 0x0F,
        }
    }
}

/// One received (or to-be-sent) link frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Packet address (0..2048).
    pub address: u16,
    /// Request-to-receive flag.
    pub rtr: bool,
    /// Logical (unescaped) payload bytes.
    pub payload: Bytes,
    /// Checksum byte as carried on the wire.
    pub checksum: u8,
    /// Time the frame's sync marker was observed.
    pub timestamp: SystemTime,
}

impl Frame {
    /// Build a frame with a freshly computed checksum and the current time.
    pub fn new(address: u16, rtr: bool, payload: impl Into<Bytes>) -> Self {
        let mut frame = Self {
            address,
            rtr,
            payload: payload.into(),
            checksum: 0,
            timestamp: SystemTime::now(),
        };
        frame.checksum = checksum(frame.meta(), &frame.payload);
        frame
    }

    /// Payload length as encoded in the metadata.
    pub fn length(&self) -> usize {
        self.payload.len()
    }

    /// Metadata bytes for this frame.
    pub fn meta(&self) -> [u8; 2] {
        FrameMeta {
            address: self.address,
            rtr: self.rtr,
            length: self.payload.len().min(MAX_PAYLOAD) as u8,
        }
        .pack()
    }

    /// Whether the carried checksum matches the one computed over meta + payload.
    pub fn checksum_valid(&self) -> bool {
        checksum(self.meta(), &self.payload) == self.checksum
    }

    /// Bytes this frame occupies on the wire, including sync and escapes.
    pub fn wire_size(&self) -> usize {
        let escaped = self
            .meta()
            .iter()
            .chain(self.payload.iter())
            .chain(std::iter::once(&self.checksum))
            .map(|b| if needs_escape(*b) { 2 } else { 1 })
            .sum::<usize>();
        1 + escaped
    }
}

/// Sum of metadata and payload bytes modulo 256, computed before escaping.
pub fn checksum(meta: [u8; 2], payload: &[u8]) -> u8 {
    meta.iter()
        .chain(payload.iter())
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Whether `byte` must be escaped on the wire.
pub fn needs_escape(byte: u8) -> bool {
    byte == SYNC || byte == ESCAPE
}

/// Append `byte` to `dst`, escaping it when it collides with a marker.
pub fn escape_into(byte: u8, dst: &mut BytesMut) {
    if needs_escape(byte) {
        dst.put_u8(ESCAPE);
        dst.put_u8(byte ^ ESCAPE_XOR);
    } else {
        dst.put_u8(byte);
    }
}

/// Recover the logical byte that followed an escape marker.
pub fn unescape(byte: u8) -> u8 {
    byte ^ ESCAPE_XOR
}

/// Encode a frame into the wire format.
///
/// Wire format (every byte after the sync marker is escaped):
/// ```text
/// ┌──────┬──────────────┬──────────────────────────────┬─────────────┬──────────┐
/// │ 0x7E │ m0           │ m1                           │ payload     │ checksum │
/// │ sync │ address / 8  │ (addr % 8)*32 + rtr*16 + len │ 0..15 bytes │ sum % 256│
/// └──────┴──────────────┴──────────────────────────────┴─────────────┴──────────┘
/// ```
pub fn encode_frame(address: u16, rtr: bool, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    if address >= ADDRESS_SPACE {
        return Err(FrameError::AddressOutOfRange { address });
    }

    let meta = FrameMeta {
        address,
        rtr,
        length: payload.len() as u8,
    }
    .pack();
    let sum = checksum(meta, payload);

    // Worst case every byte is escaped.
    dst.reserve(1 + 2 * (META_SIZE + payload.len() + 1));
    dst.put_u8(SYNC);
    for byte in meta.iter().chain(payload.iter()).chain(std::iter::once(&sum)) {
        escape_into(*byte, dst);
    }
    Ok(())
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Discard frames whose checksum does not match. Default: true.
    pub verify_checksum: bool,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            verify_checksum: true,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let mut buf = BytesMut::new();
        encode_frame(5, false, &[1, 2, 3], &mut buf).unwrap();

        // m1 = 5 * 32 + 3 = 0xA3; checksum = 0xA3 + 6.
        assert_eq!(buf.as_ref(), &[SYNC, 0x00, 0xA3, 1, 2, 3, 0xA9]);
    }

    #[test]
    fn test_encode_escapes_markers() {
        let mut buf = BytesMut::new();
        // address 1008 packs m0 = 0x7E.
        encode_frame(1008, false, &[ESCAPE], &mut buf).unwrap();

        assert_eq!(
            buf.as_ref(),
            &[SYNC, ESCAPE, 0x5E, 0x01, ESCAPE, 0x5D, 0x7E_u8.wrapping_add(0x01 + 0x7D)]
        );
        assert_eq!(buf.iter().filter(|b| **b == SYNC).count(), 1);
    }

    #[test]
    fn test_escape_roundtrip_every_byte() {
        for byte in 0..=u8::MAX {
            let mut buf = BytesMut::new();
            escape_into(byte, &mut buf);
            let recovered = if buf.len() == 2 {
                assert_eq!(buf[0], ESCAPE);
                unescape(buf[1])
            } else {
                buf[0]
            };
            assert_eq!(recovered, byte);
            assert!(buf.len() == 1 || needs_escape(byte));
            assert!(!buf[buf.len() - 1..].contains(&SYNC));
        }
    }

    #[test]
    fn test_meta_packing_bijection() {
        for address in 0..ADDRESS_SPACE {
            for rtr in [false, true] {
                for length in 0..=MAX_PAYLOAD as u8 {
                    let meta = FrameMeta {
                        address,
                        rtr,
                        length,
                    };
                    assert_eq!(FrameMeta::unpack(meta.pack()), meta);
                }
            }
        }
    }

    #[test]
    fn test_meta_packing_extremes() {
        let meta = FrameMeta {
            address: 2047,
            rtr: true,
            length: 15,
        };
        assert_eq!(meta.pack(), [0xFF, 0xFF]);
        assert_eq!(
            FrameMeta {
                address: 0,
                rtr: false,
                length: 0
            }
            .pack(),
            [0x00, 0x00]
        );
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum([0xFF, 0xFF], &[0x02]), 0x00);
        assert_eq!(checksum([0, 0], &[]), 0);
    }

    #[test]
    fn test_checksum_computed_before_escaping() {
        let payload = [SYNC, ESCAPE, 0x10];
        let mut buf = BytesMut::new();
        encode_frame(9, true, &payload, &mut buf).unwrap();

        let meta = FrameMeta {
            address: 9,
            rtr: true,
            length: 3,
        }
        .pack();
        let expected = checksum(meta, &payload);
        let last = buf[buf.len() - 1];
        let carried = if buf[buf.len() - 2] == ESCAPE {
            unescape(last)
        } else {
            last
        };
        assert_eq!(carried, expected);
    }

    #[test]
    fn test_payload_too_large() {
        let mut buf = BytesMut::new();
        let result = encode_frame(1, false, &[0u8; 16], &mut buf);
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge { size: 16, max: 15 })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_address_out_of_range() {
        let mut buf = BytesMut::new();
        let result = encode_frame(ADDRESS_SPACE, false, &[], &mut buf);
        assert!(matches!(
            result,
            Err(FrameError::AddressOutOfRange { address: 2048 })
        ));
    }

    #[test]
    fn test_frame_new_and_wire_size() {
        let frame = Frame::new(5, false, vec![1, 2, 3]);
        assert_eq!(frame.checksum, 0xA9);
        assert!(frame.checksum_valid());
        assert_eq!(frame.length(), 3);
        assert_eq!(frame.wire_size(), 7);

        let escaped = Frame::new(1008, false, vec![ESCAPE]);
        assert_eq!(escaped.wire_size(), 7);
    }
}
