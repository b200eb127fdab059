//! Grid model and board rules for Tilematch.
//!
//! This crate is the spatial core of the engine. It knows nothing about
//! animation, persistence, or input: it only owns tiles and the elements
//! sitting on them, and answers questions about them:
//!
//! - **Types** ([`Position`], [`Direction`], [`Element`], [`Tile`],
//!   [`TileMoveInfo`]): the vocabulary shared by every other layer.
//! - **Grid** ([`Grid`]): fixed-size tile storage with swap/clear/neighbour
//!   primitives.
//! - **Matching** ([`MatchDetector`]): flood-fill connectivity plus the
//!   straight-line rule that decides what counts as a match.
//! - **Gravity** ([`normalize`]): per-column compaction that produces a
//!   move plan for the animation layer.
//!
//! # Coordinates
//!
//! ```text
//!  y
//!  ^   (0,2) (1,2) (2,2)
//!  |   (0,1) (1,1) (2,1)
//!  |   (0,0) (1,0) (2,0)    ← gravity pulls toward y = 0
//!  +-------------------> x
//! ```

mod error;
mod gravity;
mod grid;
mod matching;
mod types;

pub use error::GridError;
pub use gravity::normalize;
pub use grid::Grid;
pub use matching::{
    has_straight_line_of_three, ConnectedGroup, MatchDetector,
    DEFAULT_MIN_GROUP_SIZE, MIN_LINE_LENGTH,
};
pub use types::{
    Direction, Element, ElementId, Position, Tile, TileMoveInfo,
    WorldPosition,
};
