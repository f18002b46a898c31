/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the 15-byte link maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The address does not fit the 11-bit address space.
    #[error("address 0x{address:x} outside the 11-bit address space")]
    AddressOutOfRange { address: u16 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached EOF.
    #[error("connection closed")]
    ConnectionClosed,

    /// A connection with this name is already registered.
    #[error("connection {0:?} already open")]
    ConnectionExists(String),

    /// A writer thread panicked while holding the connection's writer.
    #[error("connection writer poisoned")]
    WriterPoisoned,
}

pub type Result<T> = std::result::Result<T, FrameError>;
