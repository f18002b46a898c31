use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;
use skylink_frame::Frame;
use skylink_schema::{Catalog, CatalogPacket};

use crate::error::{DecodeError, Result};
use crate::record::DecodedRecord;

/// Decodes raw payloads against a packet catalog.
///
/// Built once; lookups are read-only, so one decoder can be shared across
/// connection threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PacketDecoder {
    packets: HashMap<u16, CatalogPacket>,
}

impl PacketDecoder {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            packets: catalog
                .packets()
                .iter()
                .map(|packet| (packet.address, packet.clone()))
                .collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self::from_catalog(&Catalog::from_json(json)?))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(Self::from_catalog(&Catalog::from_reader(reader)?))
    }

    /// Load a `packets.json` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|source| DecodeError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Decode `payload` as the packet at `address`.
    ///
    /// Returns `None` for addresses missing from the catalog and for
    /// payloads shorter than the packet layout. Bytes past the layout are
    /// ignored. Values are raw scalars; unit/scale/decimals are not applied.
    pub fn decode(&self, address: u16, rtr: bool, payload: &[u8]) -> Option<DecodedRecord> {
        let Some(packet) = self.packets.get(&address) else {
            tracing::debug!(address, "no catalog entry for address");
            return None;
        };

        let expected = packet.payload_len();
        if payload.len() < expected {
            tracing::warn!(
                address,
                packet = %packet.qualified_name(),
                expected,
                received = payload.len(),
                "payload shorter than packet layout"
            );
            return None;
        }
        if payload.len() > expected {
            tracing::debug!(
                address,
                packet = %packet.qualified_name(),
                extra = payload.len() - expected,
                "ignoring bytes past packet layout"
            );
        }

        let mut data = IndexMap::with_capacity(packet.data.len());
        let mut offset = 0usize;
        for field in &packet.data {
            let value = field.ty.decode(&payload[offset..], packet.endian)?;
            offset += field.ty.width();
            data.insert(field.name.clone(), value);
        }

        Some(DecodedRecord {
            name: packet.name.clone(),
            board: packet.board.clone(),
            address,
            rtr,
            data,
        })
    }

    pub fn decode_frame(&self, frame: &Frame) -> Option<DecodedRecord> {
        self.decode(frame.address, frame.rtr, frame.payload.as_ref())
    }

    /// Catalog entry for `address`.
    pub fn packet(&self, address: u16) -> Option<&CatalogPacket> {
        self.packets.get(&address)
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}
