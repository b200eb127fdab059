//! Turning level definitions and snapshots into populated grids.

use tilematch_grid::{Element, ElementId, Grid, Position, WorldPosition};
use tracing::{debug, warn};

use crate::{GridLayout, LevelConfig, LevelError, LevelState, TileInfo};

/// Creates element handles for occupied cells.
///
/// Implementors that drive a presentation layer place the on-screen entity
/// at `world` inside [`spawn`](Self::spawn). The provided methods walk a
/// level or a snapshot and call `spawn` once per occupied cell.
pub trait Spawner: Send + 'static {
    /// Creates one element of `kind` at `position`.
    fn spawn(&mut self, kind: &str, position: Position, world: WorldPosition) -> Element;

    /// One entry per cell of `level`, row-major.
    fn spawn_level(
        &mut self,
        level: &LevelConfig,
        worlds: &[WorldPosition],
    ) -> Vec<Option<Element>> {
        let mut elements = Vec::with_capacity(level.cell_count());
        for y in 0..level.height {
            for x in 0..level.width {
                let position = Position::new(x as i32, y as i32);
                let world = worlds.get(y * level.width + x).copied().unwrap_or_default();
                let element = level
                    .element_kind(position.x, position.y)
                    .map(|kind| self.spawn(kind, position, world));
                elements.push(element);
            }
        }
        elements
    }

    /// Elements for the occupied cells of a saved snapshot.
    ///
    /// Kinds the level doesn't know, and positions off the level's grid,
    /// are skipped.
    fn spawn_restored(
        &mut self,
        level: &LevelConfig,
        tiles: &[TileInfo],
        worlds: &[WorldPosition],
    ) -> Vec<(Position, Element)> {
        let mut placed = Vec::new();
        for info in tiles {
            let Some(name) = info.element.as_deref() else {
                continue;
            };
            let Some(kind) = level.kind_by_name(name) else {
                warn!(position = %info.position, kind = name, "unknown kind in snapshot, skipping");
                continue;
            };
            let Some(world) = slot_index(level, info.position).and_then(|i| worlds.get(i)) else {
                warn!(position = %info.position, "snapshot tile outside level, skipping");
                continue;
            };
            let element = self.spawn(kind, info.position, *world);
            placed.push((info.position, element));
        }
        placed
    }
}

fn slot_index(level: &LevelConfig, position: Position) -> Option<usize> {
    let (x, y) = (usize::try_from(position.x).ok()?, usize::try_from(position.y).ok()?);
    (x < level.width && y < level.height).then(|| y * level.width + x)
}

/// Hands out ids `start, start + 1, ...`.
#[derive(Debug, Clone)]
pub struct SequentialSpawner {
    next_id: u64,
}

impl SequentialSpawner {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first_id: u64) -> Self {
        Self { next_id: first_id }
    }

    /// The id the next spawned element will get.
    pub fn peek_next_id(&self) -> ElementId {
        ElementId(self.next_id)
    }
}

impl Default for SequentialSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawner for SequentialSpawner {
    fn spawn(&mut self, kind: &str, _position: Position, _world: WorldPosition) -> Element {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        Element::new(id, kind)
    }
}

/// Builds a fresh grid for `level`.
pub fn spawn_grid<S: Spawner + ?Sized>(
    level: &LevelConfig,
    layout: &GridLayout,
    spawner: &mut S,
) -> Result<Grid, LevelError> {
    level.validate()?;
    let worlds = layout.world_positions(level.width, level.height);
    let elements = spawner.spawn_level(level, &worlds);
    let grid = Grid::new(level.width, level.height, worlds, elements)?;
    debug!(name = %level.name, elements = grid.element_count(), "level spawned");
    Ok(grid)
}

/// Rebuilds the grid captured in `state`.
///
/// # Errors
/// [`LevelError::SnapshotMismatch`] if the snapshot doesn't have one entry
/// per cell of `level`.
pub fn restore_grid<S: Spawner + ?Sized>(
    level: &LevelConfig,
    layout: &GridLayout,
    spawner: &mut S,
    state: &LevelState,
) -> Result<Grid, LevelError> {
    level.validate()?;
    state.check_size(level.width, level.height)?;
    let worlds = layout.world_positions(level.width, level.height);
    let placed = spawner.spawn_restored(level, &state.tiles, &worlds);
    let grid = Grid::from_tile_infos(level.width, level.height, worlds, placed)?;
    debug!(name = %level.name, elements = grid.element_count(), "level restored");
    Ok(grid)
}
