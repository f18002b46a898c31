use crate::error::Result;
use crate::plan::GenerationPlan;

/// One generated output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Bare file name; the destination prefix is applied at write time.
    pub file_name: String,
    pub contents: String,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }
}

/// An output language or format.
///
/// Targets only see the resolved plan, never the loader or validation, so
/// adding one does not touch the schema crate.
pub trait Target {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Render every artifact this target produces.
    fn render(&self, plan: &GenerationPlan<'_>) -> Result<Vec<Artifact>>;
}

/// `packets.json` plus `packets.js` for browser tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogTarget;

pub const CATALOG_JSON: &str = "packets.json";
pub const CATALOG_SCRIPT: &str = "packets.js";
const CATALOG_VAR: &str = "packetFormats";

impl Target for CatalogTarget {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn render(&self, plan: &GenerationPlan<'_>) -> Result<Vec<Artifact>> {
        let catalog = plan.catalog();
        let mut json = catalog.to_json_pretty()?;
        json.push('\n');
        Ok(vec![
            Artifact::new(CATALOG_JSON, json),
            Artifact::new(CATALOG_SCRIPT, catalog.to_script(CATALOG_VAR)?),
        ])
    }
}
