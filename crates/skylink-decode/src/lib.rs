//! Ground-side decoding of skylink packets.
//!
//! [`PacketDecoder`] is built from the JSON packet catalog, not from the
//! YAML sources, so any process holding `packets.json` can decode traffic.
//! [`DecodingListener`] plugs it into a connection's listener registry.

pub mod decoder;
pub mod error;
pub mod listener;
pub mod record;

pub use decoder::PacketDecoder;
pub use error::{DecodeError, Result};
pub use listener::{record_channel, DecodingListener};
pub use record::DecodedRecord;
