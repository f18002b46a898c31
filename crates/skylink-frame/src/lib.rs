//! Byte-stuffed serial framing for the skylink telemetry bus.
//!
//! Every frame on the wire is:
//! - A `0x7E` sync marker (never escaped)
//! - Two metadata bytes packing an 11-bit address, the RTR flag and a 4-bit length
//! - 0..15 payload bytes
//! - A one-byte additive checksum over metadata and payload
//!
//! Any byte after the sync marker equal to `0x7E` or `0x7D` is sent as `0x7D`
//! followed by the byte XOR `0x20`.

pub mod codec;
pub mod connection;
pub mod decoder;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod reader;
pub mod stream;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    checksum, encode_frame, Frame, FrameConfig, FrameMeta, ADDRESS_SPACE, DEFAULT_READ_TIMEOUT,
    ESCAPE, MAX_PAYLOAD, SYNC,
};
pub use connection::{Connection, ConnectionRegistry, ConnectionStatus};
pub use decoder::{DecoderStats, FrameDecoder};
pub use device::Device;
pub use dispatch::{channel_listener, FrameListener, ListenerId, ListenerRegistry, QueueListener};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use stream::StreamTimeouts;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_codec::SkylinkCodec;
