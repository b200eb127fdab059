//! # Tilematch
//!
//! Rule engine for tile-matching puzzle games.
//!
//! Tilematch owns the board and its rules (what counts as a match, how
//! elements fall, when a level is done) and leaves drawing to the host.
//! The host implements [`Animator`](tilematch_cascade::Animator) to move
//! and destroy its entities, and feeds gestures in through a
//! [`GameSession`].
//!
//! ## Layers
//!
//! - `tilematch-grid`: the board, match detection, gravity
//! - `tilematch-level`: level config, snapshots, save stores, spawning
//! - `tilematch-cascade`: the swap/settle/match actor and its contracts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tilematch::prelude::*;
//!
//! # async fn demo() -> Result<(), TilematchError> {
//! let config = GameplayConfig {
//!     levels: vec![LevelConfig::from_rows("intro", &["BBA", "AAB"])?],
//!     ..GameplayConfig::default()
//! };
//! let session = GameSession::builder(config)
//!     .start(MemoryStore::new(), InstantAnimator::new(), SequentialSpawner::new())
//!     .await?;
//! session.swipe(SwipeEvent::new(ElementId(3), Direction::Up)).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod session;

pub use error::TilematchError;
pub use session::{GameSession, GameSessionBuilder};

pub use tilematch_cascade as cascade;
pub use tilematch_grid as grid;
pub use tilematch_level as level;

pub mod prelude {
    pub use crate::{GameSession, GameSessionBuilder, TilematchError};
    pub use tilematch_cascade::{
        Animator, CascadeEvent, CascadeHandle, CascadeInfo, CascadeState, Completion,
        InstantAnimator, SwipeDetector, SwipeEvent, TimedAnimator, spawn_cascade,
    };
    pub use tilematch_grid::{Direction, Element, ElementId, Grid, Position, WorldPosition};
    pub use tilematch_level::{
        GameplayConfig, GridLayout, JsonFileStore, LevelConfig, LevelState, MemoryStore,
        SaveStore, SequentialSpawner, Spawner,
    };
}
