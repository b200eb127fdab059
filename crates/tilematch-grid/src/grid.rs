//! The grid model: fixed-size tile storage and its primitive operations.

use std::collections::HashSet;
use std::fmt;

use crate::{Direction, Element, ElementId, GridError, Position, Tile, WorldPosition};

/// A `width × height` board of tiles.
///
/// Tiles live in a flat `Vec`, row-major (`y * width + x`), so
/// [`tiles()`](Self::tiles) is already in the deterministic order used by
/// snapshots, match scanning, and diagnostics. Dimensions are fixed at
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Builds a grid from dense, row-major inputs.
    ///
    /// Both `world_positions` and `elements` must hold exactly
    /// `width * height` entries.
    ///
    /// # Errors
    /// [`GridError::InvalidArgument`] on a size mismatch, zero dimensions,
    /// or an element id that appears more than once.
    pub fn new(
        width: usize,
        height: usize,
        world_positions: Vec<WorldPosition>,
        elements: Vec<Option<Element>>,
    ) -> Result<Self, GridError> {
        check_dimensions(width, height, world_positions.len())?;
        if elements.len() != width * height {
            return Err(GridError::InvalidArgument(format!(
                "expected {} elements for a {width}x{height} grid, got {}",
                width * height,
                elements.len()
            )));
        }

        let mut seen = HashSet::new();
        let mut tiles = Vec::with_capacity(width * height);
        for (index, (world, element)) in
            world_positions.into_iter().zip(elements).enumerate()
        {
            if let Some(element) = &element {
                if !seen.insert(element.id()) {
                    return Err(duplicate_element(element.id()));
                }
            }
            tiles.push(Tile::new(position_of(index, width), world, element));
        }

        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Builds a grid from sparse `(position, element)` pairs.
    ///
    /// Used when restoring a saved level: only occupied cells are listed,
    /// every other tile starts empty.
    ///
    /// # Errors
    /// - [`GridError::OutOfBounds`] for a position outside the grid
    /// - [`GridError::InvalidArgument`] for a repeated position or element
    ///   id, or a bad `world_positions` length
    pub fn from_tile_infos(
        width: usize,
        height: usize,
        world_positions: Vec<WorldPosition>,
        placed: impl IntoIterator<Item = (Position, Element)>,
    ) -> Result<Self, GridError> {
        let mut grid = Self::empty(width, height, world_positions)?;
        let mut seen = HashSet::new();

        for (position, element) in placed {
            let index = grid
                .index(position)
                .ok_or(GridError::OutOfBounds(position))?;
            if !grid.tiles[index].is_empty() {
                return Err(GridError::InvalidArgument(format!(
                    "position {position} listed twice"
                )));
            }
            if !seen.insert(element.id()) {
                return Err(duplicate_element(element.id()));
            }
            grid.tiles[index].set_element(Some(element));
        }

        Ok(grid)
    }

    /// Builds a grid with no elements on it.
    pub fn empty(
        width: usize,
        height: usize,
        world_positions: Vec<WorldPosition>,
    ) -> Result<Self, GridError> {
        let elements = vec![None; world_positions.len()];
        Self::new(width, height, world_positions, elements)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `true` if `position` is on the grid.
    pub fn contains(&self, position: Position) -> bool {
        self.index(position).is_some()
    }

    pub(crate) fn index(&self, position: Position) -> Option<usize> {
        let (x, y) = (usize::try_from(position.x).ok()?, usize::try_from(position.y).ok()?);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    pub fn tile(&self, position: Position) -> Option<&Tile> {
        self.index(position).map(|i| &self.tiles[i])
    }

    pub(crate) fn tile_mut(&mut self, position: Position) -> Option<&mut Tile> {
        self.index(position).map(|i| &mut self.tiles[i])
    }

    /// All tiles, row-major: y ascending, then x ascending.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// The adjacent tile in `direction`, or `None` past a grid edge.
    pub fn neighbour(
        &self,
        position: Position,
        direction: Direction,
    ) -> Option<&Tile> {
        if !self.contains(position) {
            return None;
        }
        self.tile(position.step(direction))
    }

    /// Exchanges the elements of two tiles.
    ///
    /// Either side may be empty; swapping an element with an empty tile
    /// moves it. Locking is up to the caller.
    ///
    /// # Errors
    /// [`GridError::OutOfBounds`] if either position is off-grid. The grid
    /// is left untouched in that case.
    pub fn swap(&mut self, a: Position, b: Position) -> Result<(), GridError> {
        let ia = self.index(a).ok_or(GridError::OutOfBounds(a))?;
        let ib = self.index(b).ok_or(GridError::OutOfBounds(b))?;

        let element_a = self.tiles[ia].take_element();
        let element_b = self.tiles[ib].take_element();
        self.tiles[ia].set_element(element_b);
        self.tiles[ib].set_element(element_a);
        Ok(())
    }

    /// Empties a tile, returning whatever element was on it.
    ///
    /// # Errors
    /// [`GridError::OutOfBounds`] if `position` is off-grid.
    pub fn clear(
        &mut self,
        position: Position,
    ) -> Result<Option<Element>, GridError> {
        let tile = self
            .tile_mut(position)
            .ok_or(GridError::OutOfBounds(position))?;
        Ok(tile.take_element())
    }

    /// `true` if no tile holds an element.
    pub fn is_empty(&self) -> bool {
        self.tiles.iter().all(Tile::is_empty)
    }

    /// The tile currently holding the element with `id`.
    pub fn find_element(&self, id: ElementId) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.element_id() == Some(id))
    }

    pub fn element_count(&self) -> usize {
        self.tiles.iter().filter(|t| !t.is_empty()).count()
    }

    /// Every element on the board, row-major.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.tiles.iter().filter_map(Tile::element)
    }
}

/// Renders the board top row first; `.` marks an empty tile.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..self.height).rev() {
            for tile in &self.tiles[y * self.width..(y + 1) * self.width] {
                let glyph = tile
                    .kind()
                    .and_then(|k| k.chars().next())
                    .unwrap_or('.');
                write!(f, "{glyph}")?;
            }
            if y > 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

fn check_dimensions(
    width: usize,
    height: usize,
    world_len: usize,
) -> Result<(), GridError> {
    if width == 0 || height == 0 {
        return Err(GridError::InvalidArgument(format!(
            "grid dimensions must be non-zero, got {width}x{height}"
        )));
    }
    if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
        return Err(GridError::InvalidArgument(format!(
            "grid dimensions {width}x{height} exceed the coordinate range"
        )));
    }
    if world_len != width * height {
        return Err(GridError::InvalidArgument(format!(
            "expected {} world positions for a {width}x{height} grid, got {world_len}",
            width * height
        )));
    }
    Ok(())
}

fn position_of(index: usize, width: usize) -> Position {
    // Dimensions were checked to fit in i32.
    Position::new((index % width) as i32, (index / width) as i32)
}

fn duplicate_element(id: ElementId) -> GridError {
    GridError::InvalidArgument(format!("element {id} placed on more than one tile"))
}
