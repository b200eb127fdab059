//! Lock bookkeeping for tiles and elements taking part in a cascade.

use std::collections::HashSet;

use tilematch_grid::{ElementId, Position, Tile, TileMoveInfo};

/// Tracks which elements and positions are busy.
///
/// A tile is locked if its position is locked or the element on it is.
/// Locks are taken per step of a cascade and released when the step's
/// animations finish; [`clear_all`](Self::clear_all) is reserved for
/// cancellation and level teardown.
#[derive(Debug, Default, Clone)]
pub struct LockManager {
    elements: HashSet<ElementId>,
    positions: HashSet<Position>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the tile's position and, if it holds one, its element.
    pub fn lock_tile(&mut self, tile: &Tile) {
        self.positions.insert(tile.position());
        if let Some(id) = tile.element_id() {
            self.elements.insert(id);
        }
    }

    /// Undoes [`lock_tile`](Self::lock_tile) for the same tile state.
    pub fn unlock_tile(&mut self, tile: &Tile) {
        self.positions.remove(&tile.position());
        if let Some(id) = tile.element_id() {
            self.elements.remove(&id);
        }
    }

    /// Locks a falling element and the slot it lands on.
    pub fn lock_move(&mut self, info: &TileMoveInfo) {
        self.elements.insert(info.element.id());
        self.positions.insert(info.to);
    }

    pub fn unlock_move(&mut self, info: &TileMoveInfo) {
        self.elements.remove(&info.element.id());
        self.positions.remove(&info.to);
    }

    pub fn is_element_locked(&self, id: ElementId) -> bool {
        self.elements.contains(&id)
    }

    pub fn is_position_locked(&self, position: Position) -> bool {
        self.positions.contains(&position)
    }

    /// `true` if either the tile's position or its element is locked.
    pub fn is_tile_locked(&self, tile: &Tile) -> bool {
        self.is_position_locked(tile.position())
            || tile.element_id().is_some_and(|id| self.is_element_locked(id))
    }

    pub fn clear_all(&mut self) {
        self.elements.clear();
        self.positions.clear();
    }

    /// `true` if nothing is locked.
    pub fn is_clear(&self) -> bool {
        self.elements.is_empty() && self.positions.is_empty()
    }

    pub fn locked_element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn locked_position_count(&self) -> usize {
        self.positions.len()
    }
}
