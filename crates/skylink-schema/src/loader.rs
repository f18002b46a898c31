//! Builds one [`Board`] from one YAML definition source.
//!
//! ```yaml
//! name: adcs
//! description: Attitude control
//! listen:
//!   - board: eps
//!     packets: [battery]
//! packets:
//!   - segment: 0x10
//!     packets:
//!       - name: imu
//!         endian: little
//!         data:
//!           - { name: x, type: int16 }
//!           - { name: y, type: float32, unit: deg }
//! chunks:
//!   - segment: 0x700
//!     chunks:
//!       - { name: log, size: 4096 }
//! ```

use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use skylink_frame::{ADDRESS_SPACE, MAX_PAYLOAD};

use crate::config::LoaderConfig;
use crate::error::{DefinitionError, Result};
use crate::model::{Board, ChunkDefinition, FieldDefinition, ListenEntry, PacketDefinition};
use crate::types::{Endian, ScalarType};

#[derive(Debug, Deserialize)]
struct BoardSource {
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    listen: Option<Vec<ListenSource>>,
    #[serde(default)]
    packets: Option<Vec<PacketSegmentSource>>,
    #[serde(default)]
    chunks: Option<Vec<ChunkSegmentSource>>,
}

#[derive(Debug, Deserialize)]
struct ListenSource {
    board: String,
    #[serde(default)]
    packets: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct PacketSegmentSource {
    segment: i64,
    #[serde(default)]
    packets: Option<Vec<PacketSource>>,
}

#[derive(Debug, Deserialize)]
struct PacketSource {
    name: Option<String>,
    description: Option<String>,
    endian: Option<String>,
    #[serde(default)]
    data: Option<Vec<FieldSource>>,
}

#[derive(Debug, Deserialize)]
struct FieldSource {
    name: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    ty: Option<String>,
    unit: Option<String>,
    scale: Option<f64>,
    decimals: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChunkSegmentSource {
    segment: i64,
    #[serde(default)]
    chunks: Option<Vec<ChunkSource>>,
}

#[derive(Debug, Deserialize)]
struct ChunkSource {
    name: Option<String>,
    description: Option<String>,
    size: Option<u32>,
}

/// Parse one board definition. `origin` names the source in errors.
pub fn load_str(source: &str, origin: &str) -> Result<Board> {
    let parsed: BoardSource =
        serde_yaml::from_str(source).map_err(|err| DefinitionError::Parse {
            origin: origin.to_string(),
            message: err.to_string(),
        })?;
    build_board(parsed, origin)
}

/// Read and parse one board definition file, bounded by `config`.
pub fn load_file(path: &Path, config: &LoaderConfig) -> Result<Board> {
    let file = std::fs::File::open(path).map_err(|err| {
        DefinitionError::LoadFailed(format!("failed opening {}: {err}", path.display()))
    })?;
    let metadata = file
        .metadata()
        .map_err(|err| DefinitionError::LoadFailed(err.to_string()))?;
    if metadata.len() > config.max_source_size as u64 {
        return Err(DefinitionError::LoadFailed(format!(
            "definition too large ({} bytes): {}",
            metadata.len(),
            path.display()
        )));
    }

    let read_limit = u64::try_from(config.max_source_size.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| {
            DefinitionError::LoadFailed(format!("failed reading {}: {err}", path.display()))
        })?;
    if content.len() > config.max_source_size {
        return Err(DefinitionError::LoadFailed(format!(
            "definition too large while reading: {}",
            path.display()
        )));
    }

    load_str(&content, &path.display().to_string())
}

fn build_board(source: BoardSource, origin: &str) -> Result<Board> {
    let name = required_name(source.name, "board", origin)?;

    let listen = source
        .listen
        .unwrap_or_default()
        .into_iter()
        .flat_map(|entry| {
            let board = entry.board;
            entry
                .packets
                .unwrap_or_default()
                .into_iter()
                .map(move |packet| ListenEntry {
                    board: board.clone(),
                    packet,
                })
        })
        .collect();

    let mut packets = IndexMap::new();
    for segment in source.packets.unwrap_or_default() {
        for (index, packet) in segment.packets.unwrap_or_default().into_iter().enumerate() {
            let address = segment.segment + index as i64;
            let packet = build_packet(packet, address, &name)?;
            if packets.contains_key(&packet.name) {
                return Err(DefinitionError::DuplicatePacket {
                    board: name,
                    packet: packet.name,
                });
            }
            packets.insert(packet.name.clone(), packet);
        }
    }

    let mut chunks = IndexMap::new();
    for segment in source.chunks.unwrap_or_default() {
        for (index, chunk) in segment.chunks.unwrap_or_default().into_iter().enumerate() {
            let address = segment.segment + index as i64;
            let chunk_name = required_name(chunk.name, "chunk", &name)?;
            let address = checked_address(address, &name, &chunk_name)?;
            if chunks.contains_key(&chunk_name) {
                return Err(DefinitionError::DuplicateChunk {
                    board: name,
                    chunk: chunk_name,
                });
            }
            let Some(size) = chunk.size else {
                return Err(DefinitionError::MissingChunkSize {
                    board: name,
                    chunk: chunk_name,
                });
            };
            chunks.insert(
                chunk_name.clone(),
                ChunkDefinition {
                    name: chunk_name,
                    description: chunk.description,
                    address,
                    board: name.clone(),
                    size,
                },
            );
        }
    }

    tracing::debug!(
        board = %name,
        packets = packets.len(),
        chunks = chunks.len(),
        "board definition loaded"
    );

    Ok(Board {
        name,
        description: source.description,
        listen,
        packets,
        chunks,
    })
}

fn build_packet(source: PacketSource, address: i64, board: &str) -> Result<PacketDefinition> {
    let name = required_name(source.name, "packet", board)?;
    let address = checked_address(address, board, &name)?;

    let endian = match source.endian {
        None => Endian::default(),
        Some(value) => value
            .parse()
            .map_err(|_| DefinitionError::InvalidEndian {
                board: board.to_string(),
                packet: name.clone(),
                value,
            })?,
    };

    let mut fields = Vec::new();
    for field in source.data.unwrap_or_default() {
        let context = format!("{board}_{name}");
        let field_name = required_name(field.name, "data", &context)?;
        let type_name = field.ty.unwrap_or_default();
        let ty: ScalarType = type_name
            .parse()
            .map_err(|_| DefinitionError::UnknownType {
                board: board.to_string(),
                packet: name.clone(),
                field: field_name.clone(),
                type_name,
            })?;
        fields.push(FieldDefinition {
            name: field_name,
            description: field.description,
            ty,
            unit: field.unit,
            scale: field.scale,
            decimals: field.decimals,
        });
    }

    let packet = PacketDefinition {
        name,
        description: source.description,
        address,
        board: board.to_string(),
        endian,
        fields,
    };

    let size = packet.payload_len();
    if size > MAX_PAYLOAD {
        return Err(DefinitionError::PayloadTooLarge {
            board: packet.board,
            packet: packet.name,
            size,
            max: MAX_PAYLOAD,
        });
    }

    Ok(packet)
}

fn required_name(name: Option<String>, what: &'static str, context: &str) -> Result<String> {
    match name {
        Some(name) if !name.trim().is_empty() => Ok(name),
        _ => Err(DefinitionError::MissingName {
            what,
            context: context.to_string(),
        }),
    }
}

fn checked_address(address: i64, board: &str, name: &str) -> Result<u16> {
    if (0..i64::from(ADDRESS_SPACE)).contains(&address) {
        // Range-checked above.
        Ok(address as u16)
    } else {
        Err(DefinitionError::AddressOutOfRange {
            board: board.to_string(),
            name: name.to_string(),
            address,
        })
    }
}
