use std::path::PathBuf;

/// Errors that can occur while generating artifacts from a valid schema.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The requested listening board is not in the schema.
    #[error("unknown board: {0}")]
    UnknownBoard(String),

    /// None of the board's listen entries name a known packet.
    #[error("board {board} has no listen entries resolving to known packets")]
    NoListenEntries { board: String },

    /// The catalog could not be serialized.
    #[error("catalog serialization failed: {0}")]
    Catalog(#[from] serde_json::Error),

    /// Rendering source text failed.
    #[error("render failed: {0}")]
    Format(#[from] std::fmt::Error),

    /// An artifact could not be written.
    #[error("failed writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, GenerationError>;
