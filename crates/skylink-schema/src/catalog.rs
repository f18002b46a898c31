//! Portable packet catalog.
//!
//! The catalog is the schema flattened to data: every packet of every
//! board, sorted by address, with its field layout. Ground tools consume
//! it instead of the YAML sources so they need neither the loader nor the
//! board structure.

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use skylink_frame::{ADDRESS_SPACE, MAX_PAYLOAD};

use crate::definition::Schema;
use crate::error::CatalogError;
use crate::model::{FieldDefinition, PacketDefinition};
use crate::types::{Endian, ScalarType};

/// One field of a catalog packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
}

impl From<&FieldDefinition> for CatalogField {
    fn from(field: &FieldDefinition) -> Self {
        Self {
            name: field.name().to_string(),
            ty: field.ty(),
            description: field.description().map(str::to_string),
            unit: field.unit().map(str::to_string),
            scale: field.scale(),
            decimals: field.decimals(),
        }
    }
}

/// One packet of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPacket {
    pub name: String,
    pub board: String,
    pub address: u16,
    #[serde(default)]
    pub endian: Endian,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub data: Vec<CatalogField>,
}

impl CatalogPacket {
    pub fn payload_len(&self) -> usize {
        self.data.iter().map(|field| field.ty.width()).sum()
    }

    pub fn qualified_name(&self) -> String {
        format!("{}_{}", self.board, self.name)
    }
}

impl From<&PacketDefinition> for CatalogPacket {
    fn from(packet: &PacketDefinition) -> Self {
        Self {
            name: packet.name().to_string(),
            board: packet.board().to_string(),
            address: packet.address(),
            endian: packet.endian(),
            description: packet.description().map(str::to_string),
            data: packet.fields().iter().map(CatalogField::from).collect(),
        }
    }
}

/// Serialized as a bare JSON array of packets. Deserializing goes through
/// [`Catalog::from_packets`], so a deserialized catalog is sorted and checked.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<CatalogPacket>")]
pub struct Catalog {
    packets: Vec<CatalogPacket>,
}

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.packets.serialize(serializer)
    }
}

impl TryFrom<Vec<CatalogPacket>> for Catalog {
    type Error = CatalogError;

    fn try_from(packets: Vec<CatalogPacket>) -> Result<Self, Self::Error> {
        Self::from_packets(packets)
    }
}

impl Catalog {
    /// Flatten a validated schema, sorted by ascending address.
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            packets: schema
                .packets_by_address()
                .into_iter()
                .map(CatalogPacket::from)
                .collect(),
        }
    }

    /// Build from packets read elsewhere, checking the same address and
    /// size rules the loader applies. Output is sorted by address.
    pub fn from_packets(mut packets: Vec<CatalogPacket>) -> Result<Self, CatalogError> {
        packets.sort_by_key(|packet| packet.address);

        let mut seen: BTreeMap<u16, String> = BTreeMap::new();
        for packet in &packets {
            if packet.address >= ADDRESS_SPACE {
                return Err(CatalogError::AddressOutOfRange {
                    packet: packet.qualified_name(),
                    address: packet.address,
                });
            }
            let size = packet.payload_len();
            if size > MAX_PAYLOAD {
                return Err(CatalogError::PayloadTooLarge {
                    packet: packet.qualified_name(),
                    size,
                    max: MAX_PAYLOAD,
                });
            }
            if let Some(first) = seen.insert(packet.address, packet.qualified_name()) {
                return Err(CatalogError::DuplicateAddress {
                    address: packet.address,
                    first,
                    second: packet.qualified_name(),
                });
            }
        }

        Ok(Self { packets })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let packets: Vec<CatalogPacket> = serde_json::from_str(json)?;
        Self::from_packets(packets)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogError> {
        let packets: Vec<CatalogPacket> = serde_json::from_reader(reader)?;
        Self::from_packets(packets)
    }

    /// Pretty-printed JSON array.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.packets)
    }

    /// The catalog as a script statement, for pages that load it with a
    /// plain `<script>` tag. Field types use their C spellings (`int16_t`,
    /// `float`), which is what the browser decoders switch on.
    pub fn to_script(&self, var_name: &str) -> serde_json::Result<String> {
        let mut packets = serde_json::to_value(&self.packets)?;
        if let Some(entries) = packets.as_array_mut() {
            for (entry, packet) in entries.iter_mut().zip(&self.packets) {
                let Some(fields) = entry.get_mut("data").and_then(Value::as_array_mut) else {
                    continue;
                };
                for (json, field) in fields.iter_mut().zip(&packet.data) {
                    json["type"] = Value::from(field.ty.c_type());
                }
            }
        }
        Ok(format!(
            "var {var_name} = {};\n",
            serde_json::to_string_pretty(&packets)?
        ))
    }

    /// Packets in ascending address order.
    pub fn packets(&self) -> &[CatalogPacket] {
        &self.packets
    }

    pub fn get(&self, address: u16) -> Option<&CatalogPacket> {
        self.packets
            .binary_search_by_key(&address, |packet| packet.address)
            .ok()
            .map(|index| &self.packets[index])
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}
