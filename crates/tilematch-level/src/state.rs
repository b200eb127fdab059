//! The persisted level snapshot.

use serde::{Deserialize, Serialize};
use tilematch_grid::{Grid, Position};

use crate::LevelError;

/// Save-slot key for the in-progress [`LevelState`].
pub const LEVEL_STATE_KEY: &str = "LevelState";

/// Save-slot key for the current level index (`u32`).
pub const LEVEL_INDEX_KEY: &str = "Level";

/// One tile of a snapshot: where it is and which kind sits on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInfo {
    pub position: Position,
    pub element: Option<String>,
}

/// A full picture of a level in progress.
///
/// `tiles` always has one entry per grid cell, in the grid's row-major
/// order, so a snapshot restores to exactly the board it was taken from.
///
/// JSON layout:
///
/// ```json
/// { "level": 2, "tiles": [ { "position": { "x": 0, "y": 0 }, "element": "A" },
///                          { "position": { "x": 1, "y": 0 }, "element": null } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelState {
    pub level: u32,
    pub tiles: Vec<TileInfo>,
}

impl LevelState {
    /// Captures every tile of `grid`.
    pub fn capture(level: u32, grid: &Grid) -> Self {
        let tiles = grid
            .tiles()
            .iter()
            .map(|tile| TileInfo {
                position: tile.position(),
                element: tile.kind().map(str::to_owned),
            })
            .collect();
        Self { level, tiles }
    }

    /// Occupied cells only.
    pub fn occupied(&self) -> impl Iterator<Item = (Position, &str)> {
        self.tiles
            .iter()
            .filter_map(|t| t.element.as_deref().map(|k| (t.position, k)))
    }

    /// Fails unless the snapshot has one entry per cell of a
    /// `width × height` grid.
    pub fn check_size(&self, width: usize, height: usize) -> Result<(), LevelError> {
        let expected = width * height;
        if self.tiles.len() != expected {
            return Err(LevelError::SnapshotMismatch {
                expected,
                actual: self.tiles.len(),
            });
        }
        Ok(())
    }
}
