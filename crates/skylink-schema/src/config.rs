/// Bounds applied while loading definition sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Maximum bytes accepted per definition source.
    pub max_source_size: usize,
    /// Maximum number of boards in one definition set.
    pub max_boards: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_source_size: 256 * 1024,
            max_boards: 64,
        }
    }
}
