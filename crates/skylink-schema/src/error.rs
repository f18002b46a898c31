/// Errors raised while loading or validating schema definitions.
///
/// Every variant names the offending board/packet/address so a failed
/// generator run points straight at the source to fix.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// The source could not be read.
    #[error("failed to load definition: {0}")]
    LoadFailed(String),

    /// The source is not well-formed YAML or has the wrong shape.
    #[error("failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },

    /// A required `name` is missing or empty.
    #[error("{what} name is a required field ({context})")]
    MissingName { what: &'static str, context: String },

    /// A field names a type outside the supported scalar set.
    #[error("unknown data type {type_name:?} for {board}_{packet}.{field}")]
    UnknownType {
        board: String,
        packet: String,
        field: String,
        type_name: String,
    },

    /// A packet declares an endianness other than `little`/`big`.
    #[error("invalid endianness {value:?} for {board}_{packet}")]
    InvalidEndian {
        board: String,
        packet: String,
        value: String,
    },

    /// Two packets in one board share a name.
    #[error("duplicate packet name: {packet} for board {board}")]
    DuplicatePacket { board: String, packet: String },

    /// Two chunks in one board share a name.
    #[error("duplicate chunk name: {chunk} for board {board}")]
    DuplicateChunk { board: String, chunk: String },

    /// A chunk was declared without a byte size.
    #[error("chunk {board}_{chunk} has no size")]
    MissingChunkSize { board: String, chunk: String },

    /// A board with this name was already loaded.
    #[error("duplicate definitions for board: {0}")]
    DuplicateBoard(String),

    /// An assigned address falls outside `[0, 2048)`.
    #[error("address {address} of {board}_{name} outside [0x0, 0x800)")]
    AddressOutOfRange {
        board: String,
        name: String,
        address: i64,
    },

    /// Field widths add up to more than one frame can carry.
    #[error("payload of {board}_{packet} is {size} bytes (max {max})")]
    PayloadTooLarge {
        board: String,
        packet: String,
        size: usize,
        max: usize,
    },

    /// Two packets/chunks across all boards claim the same address.
    #[error("address collision: {first} and {second} for address: 0x{address:x}")]
    AddressCollision {
        address: u16,
        first: String,
        second: String,
    },

    /// More boards than the loader is configured to accept.
    #[error("board count exceeds configured max ({max})")]
    TooManyBoards { max: usize },
}

/// Errors raised while reading a packet catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog is not valid JSON or has the wrong shape.
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The catalog could not be read.
    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Two catalog entries share an address.
    #[error("catalog address collision: {first} and {second} for address: 0x{address:x}")]
    DuplicateAddress {
        address: u16,
        first: String,
        second: String,
    },

    /// An entry's address is outside the 11-bit space.
    #[error("catalog entry {packet} has address 0x{address:x} outside [0x0, 0x800)")]
    AddressOutOfRange { packet: String, address: u16 },

    /// An entry's fields do not fit one frame.
    #[error("catalog entry {packet} has a {size}-byte payload (max {max})")]
    PayloadTooLarge {
        packet: String,
        size: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, DefinitionError>;
