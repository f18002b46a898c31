//! Immutable board/packet/field model.
//!
//! Values are only built by the loader; everything outside this crate gets
//! read-only accessors.

use indexmap::IndexMap;

use crate::types::{Endian, ScalarType};

/// One typed field of a packet.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) ty: ScalarType,
    pub(crate) unit: Option<String>,
    pub(crate) scale: Option<f64>,
    pub(crate) decimals: Option<u32>,
}

impl FieldDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn ty(&self) -> ScalarType {
        self.ty
    }

    /// Descriptive only; never applied to decoded values.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Descriptive only; never applied to decoded values.
    pub fn scale(&self) -> Option<f64> {
        self.scale
    }

    /// Descriptive only; never applied to decoded values.
    pub fn decimals(&self) -> Option<u32> {
        self.decimals
    }
}

/// A fixed-address, fixed-layout packet.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketDefinition {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) address: u16,
    pub(crate) board: String,
    pub(crate) endian: Endian,
    pub(crate) fields: Vec<FieldDefinition>,
}

impl PacketDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    /// Name of the board that declared this packet.
    pub fn board(&self) -> &str {
        &self.board
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Sum of field widths; the frame length byte for this packet.
    pub fn payload_len(&self) -> usize {
        self.fields.iter().map(|field| field.ty.width()).sum()
    }

    /// `board_packet`, the identifier used in generated code and errors.
    pub fn qualified_name(&self) -> String {
        format!("{}_{}", self.board, self.name)
    }

    /// Each field paired with its byte offset in the payload.
    pub fn field_offsets(&self) -> impl Iterator<Item = (usize, &FieldDefinition)> {
        self.fields.iter().scan(0usize, |offset, field| {
            let at = *offset;
            *offset += field.ty.width();
            Some((at, field))
        })
    }
}

/// A reserved address block with no generated encode/decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDefinition {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) address: u16,
    pub(crate) board: String,
    pub(crate) size: u32,
}

impl ChunkDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    /// Declared byte size.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn qualified_name(&self) -> String {
        format!("{}_{}", self.board, self.name)
    }
}

/// A `(board, packet)` pair a board consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenEntry {
    pub(crate) board: String,
    pub(crate) packet: String,
}

impl ListenEntry {
    pub fn board(&self) -> &str {
        &self.board
    }

    pub fn packet(&self) -> &str {
        &self.packet
    }
}

impl std::fmt::Display for ListenEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.board, self.packet)
    }
}

/// One embedded subsystem, built from one definition source.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) listen: Vec<ListenEntry>,
    pub(crate) packets: IndexMap<String, PacketDefinition>,
    pub(crate) chunks: IndexMap<String, ChunkDefinition>,
}

impl Board {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Listen entries in declaration order.
    pub fn listen(&self) -> &[ListenEntry] {
        &self.listen
    }

    /// Packets in declaration order.
    pub fn packets(&self) -> impl Iterator<Item = &PacketDefinition> {
        self.packets.values()
    }

    pub fn packet(&self, name: &str) -> Option<&PacketDefinition> {
        self.packets.get(name)
    }

    /// Chunks in declaration order.
    pub fn chunks(&self) -> impl Iterator<Item = &ChunkDefinition> {
        self.chunks.values()
    }

    pub fn chunk(&self, name: &str) -> Option<&ChunkDefinition> {
        self.chunks.get(name)
    }
}
