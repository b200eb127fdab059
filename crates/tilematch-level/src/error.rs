//! Error types for the level layer.

use tilematch_grid::GridError;

/// Errors from a [`SaveStore`](crate::SaveStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A value could not be turned into JSON.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A stored value didn't match the requested type, or the backing
    /// file is not valid JSON.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The backing file couldn't be read or written.
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from loading or querying gameplay configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration lists no levels at all. Any index is fine when
    /// at least one level exists, since lookups wrap.
    #[error("no levels configured")]
    NoLevels,

    /// A level definition is malformed (zero size, wrong tile count, ...).
    #[error("invalid level: {0}")]
    InvalidLevel(String),

    #[error("config parse failed: {0}")]
    Parse(serde_json::Error),

    #[error("config i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from building or restoring a level.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Grid(#[from] GridError),

    /// A saved snapshot doesn't fit the level it claims to belong to.
    #[error("snapshot has {actual} tiles, level needs {expected}")]
    SnapshotMismatch { expected: usize, actual: usize },
}
