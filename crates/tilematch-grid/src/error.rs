//! Error types for the grid layer.
//!
//! Grid errors are programming errors: the cascade layer checks bounds
//! and neighbours before it ever calls a mutating operation, so seeing
//! one of these at runtime means a caller skipped its own checks.

use crate::Position;

/// Errors that can occur while building or mutating a [`Grid`](crate::Grid).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// Construction input does not describe a valid grid.
    ///
    /// Raised for zero dimensions, vectors whose length isn't
    /// `width * height`, duplicate positions in sparse input, or the same
    /// element placed on two tiles.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A position outside the grid was passed to a mutating operation.
    #[error("position {0} is outside the grid")]
    OutOfBounds(Position),
}
