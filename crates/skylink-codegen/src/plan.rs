//! Target-independent view of what to generate.

use std::collections::BTreeMap;

use skylink_schema::{Catalog, PacketDefinition, Schema};

use crate::error::{GenerationError, Result};

/// Everything an emitter needs, already resolved and ordered.
///
/// Both packet lists are in ascending address order so output does not
/// depend on load order.
#[derive(Debug)]
pub struct GenerationPlan<'a> {
    board: &'a str,
    encode: Vec<&'a PacketDefinition>,
    dispatch: Vec<&'a PacketDefinition>,
    catalog: Catalog,
}

impl<'a> GenerationPlan<'a> {
    /// Resolve the plan for `board`'s dispatch plus encoders for every
    /// packet in the schema.
    ///
    /// Listen entries that name no known packet are skipped with a warning.
    pub fn new(schema: &'a Schema, board: &str) -> Result<Self> {
        let listening = schema
            .board(board)
            .ok_or_else(|| GenerationError::UnknownBoard(board.to_string()))?;

        let mut dispatch: BTreeMap<u16, &'a PacketDefinition> = BTreeMap::new();
        for entry in listening.listen() {
            match schema.resolve(entry) {
                Some(packet) => {
                    dispatch.insert(packet.address(), packet);
                }
                None => tracing::warn!(
                    board = listening.name(),
                    listen = %entry,
                    "listen entry names no known packet; skipped"
                ),
            }
        }

        if dispatch.is_empty() {
            return Err(GenerationError::NoListenEntries {
                board: listening.name().to_string(),
            });
        }

        Ok(Self {
            board: listening.name(),
            encode: schema.packets_by_address(),
            dispatch: dispatch.into_values().collect(),
            catalog: Catalog::from_schema(schema),
        })
    }

    /// The listening board.
    pub fn board(&self) -> &str {
        self.board
    }

    /// Every packet of every board.
    pub fn encode_packets(&self) -> &[&'a PacketDefinition] {
        &self.encode
    }

    /// Packets the listening board consumes, deduplicated.
    pub fn dispatch_packets(&self) -> &[&'a PacketDefinition] {
        &self.dispatch
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}
