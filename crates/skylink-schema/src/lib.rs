//! Board and packet definitions for the skylink telemetry bus.
//!
//! Definitions are loaded from one YAML source per board into
//! [`Definitions`], validated for global address collisions, and frozen
//! into a read-only [`Schema`]. The [`Catalog`] is the schema flattened to
//! JSON for ground tooling.

pub mod catalog;
pub mod config;
pub mod definition;
pub mod error;
pub mod loader;
pub mod model;
pub mod types;

pub use catalog::{Catalog, CatalogField, CatalogPacket};
pub use config::LoaderConfig;
pub use definition::{Definitions, Schema};
pub use error::{CatalogError, DefinitionError, Result};
pub use loader::{load_file, load_str};
pub use model::{Board, ChunkDefinition, FieldDefinition, ListenEntry, PacketDefinition};
pub use types::{Endian, FieldValue, ScalarType, UnknownName};
