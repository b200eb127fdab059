//! Error types for the cascade layer.

use tilematch_grid::GridError;
use tilematch_level::LevelError;

/// Errors returned through a [`CascadeHandle`](crate::CascadeHandle).
///
/// Rejected swipes and cancelled cascades are not errors; they are
/// ordinary outcomes and only show up in the logs and the event stream.
#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    /// Building, restoring, or persisting a level failed.
    #[error(transparent)]
    Level(#[from] LevelError),

    /// A grid operation failed on the cascade path.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// An operation needed a running level, but none has been started.
    #[error("no level is running")]
    NoLevel,

    /// The actor's command channel is closed.
    #[error("cascade actor is unavailable")]
    Unavailable,
}
