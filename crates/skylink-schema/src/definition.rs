//! Load phase and the validated, read-only schema it produces.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::config::LoaderConfig;
use crate::error::{DefinitionError, Result};
use crate::loader;
use crate::model::{Board, ChunkDefinition, ListenEntry, PacketDefinition};

/// Boards collected during the load phase.
///
/// Nothing can be generated or decoded from a `Definitions`; call
/// [`finish`](Self::finish) to validate and freeze it into a [`Schema`].
#[derive(Debug, Default)]
pub struct Definitions {
    boards: IndexMap<String, Board>,
    config: LoaderConfig,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            boards: IndexMap::new(),
            config,
        }
    }

    /// Add a loaded board. Board names are unique across the set.
    pub fn add_board(&mut self, board: Board) -> Result<()> {
        if self.boards.contains_key(board.name()) {
            return Err(DefinitionError::DuplicateBoard(board.name().to_string()));
        }
        if self.boards.len() >= self.config.max_boards {
            return Err(DefinitionError::TooManyBoards {
                max: self.config.max_boards,
            });
        }
        self.boards.insert(board.name().to_string(), board);
        Ok(())
    }

    /// Load one definition file and add its board.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let board = loader::load_file(path, &self.config)?;
        tracing::info!(board = %board.name(), path = %path.display(), "loaded board definition");
        self.add_board(board)
    }

    /// Load one definition from an in-memory source and add its board.
    pub fn load_str(&mut self, source: &str, origin: &str) -> Result<()> {
        self.add_board(loader::load_str(source, origin)?)
    }

    /// Check that no address is claimed twice across all boards.
    ///
    /// Packets and chunks share one address space. Boards are walked in
    /// load order, packets before chunks, and the first collision wins.
    pub fn validate(&self) -> Result<()> {
        let mut owners: BTreeMap<u16, String> = BTreeMap::new();

        let claims = self.boards.values().flat_map(|board| {
            board
                .packets()
                .map(|p| (p.address(), p.qualified_name()))
                .chain(board.chunks().map(|c| (c.address(), c.qualified_name())))
        });

        for (address, owner) in claims {
            if let Some(first) = owners.get(&address) {
                return Err(DefinitionError::AddressCollision {
                    address,
                    first: first.clone(),
                    second: owner,
                });
            }
            owners.insert(address, owner);
        }
        Ok(())
    }

    /// Validate and freeze.
    pub fn finish(self) -> Result<Schema> {
        self.validate()?;
        tracing::debug!(boards = self.boards.len(), "definitions validated");
        Ok(Schema {
            boards: self.boards,
        })
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

/// A validated set of boards. Immutable.
#[derive(Debug, Clone)]
pub struct Schema {
    boards: IndexMap<String, Board>,
}

impl Schema {
    /// Boards in load order.
    pub fn boards(&self) -> impl Iterator<Item = &Board> {
        self.boards.values()
    }

    pub fn board(&self, name: &str) -> Option<&Board> {
        self.boards.get(name)
    }

    /// Look up a packet by board and packet name.
    pub fn packet(&self, board: &str, packet: &str) -> Option<&PacketDefinition> {
        self.boards.get(board)?.packet(packet)
    }

    /// Resolve a listen entry to its packet.
    pub fn resolve(&self, entry: &ListenEntry) -> Option<&PacketDefinition> {
        self.packet(entry.board(), entry.packet())
    }

    /// Every packet of every board, in ascending address order.
    pub fn packets_by_address(&self) -> Vec<&PacketDefinition> {
        let mut packets: Vec<_> = self.boards.values().flat_map(Board::packets).collect();
        packets.sort_by_key(|packet| packet.address());
        packets
    }

    /// Every chunk of every board, in ascending address order.
    pub fn chunks_by_address(&self) -> Vec<&ChunkDefinition> {
        let mut chunks: Vec<_> = self.boards.values().flat_map(Board::chunks).collect();
        chunks.sort_by_key(|chunk| chunk.address());
        chunks
    }

    /// The packet at `address`, if any.
    pub fn packet_at(&self, address: u16) -> Option<&PacketDefinition> {
        self.boards
            .values()
            .flat_map(Board::packets)
            .find(|packet| packet.address() == address)
    }
}
