//! Code generation from a validated skylink schema.
//!
//! A [`GenerationPlan`] resolves what to emit (encoders for every packet,
//! dispatch for one listening board, the catalog) in address order. Each
//! [`Target`] turns the plan into [`Artifact`]s; [`Generator`] runs the
//! default C and catalog targets.

pub mod c;
pub mod error;
pub mod generator;
pub mod plan;
pub mod target;

pub use c::CTarget;
pub use error::{GenerationError, Result};
pub use generator::{output_path, write_all, write_artifact, Generator};
pub use plan::GenerationPlan;
pub use target::{Artifact, CatalogTarget, Target, CATALOG_JSON, CATALOG_SCRIPT};
