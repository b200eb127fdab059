//! Level data for Tilematch: what a level looks like, how it is saved,
//! and how it is turned back into a grid.
//!
//! # Key types
//!
//! - [`GameplayConfig`] / [`LevelConfig`]: level definitions and engine
//!   settings, loadable from JSON
//! - [`GridLayout`]: world positions for each tile slot
//! - [`LevelState`]: the persisted snapshot of a level in progress
//! - [`SaveStore`]: the key/value persistence contract, with
//!   [`MemoryStore`] and [`JsonFileStore`]
//! - [`Spawner`]: creates element handles for a level or a snapshot
//!
//! ```text
//! GameplayConfig ─→ LevelConfig ─┐
//!                 GridLayout ────┼─→ spawn_grid / restore_grid ─→ Grid
//!   SaveStore ─→ LevelState ─────┘
//! ```

mod config;
mod error;
mod layout;
mod spawner;
mod state;
mod store;

pub use config::{GameplayConfig, LevelConfig, MIN_ANIMATION_DURATION_MS};
pub use error::{ConfigError, LevelError, StoreError};
pub use layout::GridLayout;
pub use spawner::{restore_grid, spawn_grid, SequentialSpawner, Spawner};
pub use state::{LevelState, TileInfo, LEVEL_INDEX_KEY, LEVEL_STATE_KEY};
pub use store::{JsonFileStore, MemoryStore, SaveStore};
