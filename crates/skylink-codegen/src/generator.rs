use std::path::{Path, PathBuf};

use skylink_schema::Schema;

use crate::c::CTarget;
use crate::error::{GenerationError, Result};
use crate::plan::GenerationPlan;
use crate::target::{Artifact, CatalogTarget, Target};

/// Runs a set of targets over one plan.
pub struct Generator {
    targets: Vec<Box<dyn Target>>,
}

impl Generator {
    /// C encode/dispatch units plus the JSON and script catalogs.
    pub fn new() -> Self {
        Self {
            targets: vec![Box::new(CTarget), Box::new(CatalogTarget)],
        }
    }

    /// A generator with no targets.
    pub fn empty() -> Self {
        Self {
            targets: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: impl Target + 'static) -> Self {
        self.targets.push(Box::new(target));
        self
    }

    /// Render every target for `board`.
    pub fn generate(&self, schema: &Schema, board: &str) -> Result<Vec<Artifact>> {
        let plan = GenerationPlan::new(schema, board)?;
        let mut artifacts = Vec::new();
        for target in &self.targets {
            let rendered = target.render(&plan)?;
            tracing::debug!(
                target = target.name(),
                artifacts = rendered.len(),
                "target rendered"
            );
            artifacts.extend(rendered);
        }
        Ok(artifacts)
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.targets.iter().map(|t| t.name()).collect();
        f.debug_struct("Generator").field("targets", &names).finish()
    }
}

/// Where an artifact lands for a `--dest` value.
///
/// An existing directory, or a value ending in a path separator, is joined
/// with the file name; anything else is a plain string prefix, so
/// `out/fw_` yields `out/fw_skylink_encode.c`.
pub fn output_path(dest: &str, file_name: &str) -> PathBuf {
    if dest.is_empty() {
        return PathBuf::from(file_name);
    }
    if dest.ends_with(std::path::is_separator) || Path::new(dest).is_dir() {
        return Path::new(dest).join(file_name);
    }
    PathBuf::from(format!("{dest}{file_name}"))
}

/// Write one artifact, creating missing parent directories.
pub fn write_artifact(dest: &str, artifact: &Artifact) -> Result<PathBuf> {
    let path = output_path(dest, &artifact.file_name);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| GenerationError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(&path, artifact.contents.as_bytes()).map_err(|source| GenerationError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = artifact.contents.len(), "artifact written");
    Ok(path)
}

/// Write every artifact; stops at the first failure.
pub fn write_all(dest: &str, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    artifacts
        .iter()
        .map(|artifact| write_artifact(dest, artifact))
        .collect()
}
