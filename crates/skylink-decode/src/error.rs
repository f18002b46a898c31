use std::path::PathBuf;

use skylink_schema::CatalogError;

/// Errors building a decoder. Decoding itself never fails; unknown or short
/// packets yield no record.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The catalog is malformed or inconsistent.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The catalog file could not be opened.
    #[error("failed opening catalog {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
