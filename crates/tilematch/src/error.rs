//! Unified error type for the Tilematch engine.

use tilematch_cascade::CascadeError;
use tilematch_grid::GridError;
use tilematch_level::{ConfigError, LevelError, StoreError};

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TilematchError {
    /// A grid construction or mutation error.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The save store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A level couldn't be built or restored.
    #[error(transparent)]
    Level(#[from] LevelError),

    /// The cascade actor rejected a command or has stopped.
    #[error(transparent)]
    Cascade(#[from] CascadeError),
}
