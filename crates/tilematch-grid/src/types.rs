//! Core value types shared by every Tilematch layer.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position & direction
// ---------------------------------------------------------------------------

/// A tile coordinate on the grid.
///
/// `x` grows to the right, `y` grows upward. Serializes as
/// `{ "x": 1, "y": 2 }`, which is the layout of the persisted snapshot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The position one step away in `direction`. May be off-grid.
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// One of the four grid directions.
///
/// Shared by neighbour lookup and by swipe input, which use the same
/// four-way vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions, in the order the flood fill visits neighbours.
    pub const ALL: [Direction; 4] =
        [Self::Up, Self::Left, Self::Right, Self::Down];

    /// The `(dx, dy)` of a single step.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, 1),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "Up"),
            Self::Down => write!(f, "Down"),
            Self::Left => write!(f, "Left"),
            Self::Right => write!(f, "Right"),
        }
    }
}

/// Where a tile sits in the presentation layer's world space.
///
/// Opaque to the rules: it is supplied once at grid construction and
/// handed back to the animator as a move destination.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPosition {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

/// Identity of a placed element.
///
/// A newtype over `u64` so ids can't be confused with coordinates or
/// level numbers. Locks and tile lookups compare ids, never kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

/// A matchable piece: an id plus the kind used as the match key.
///
/// This is a handle, not the on-screen entity. The animator owns the
/// entity and addresses it by [`ElementId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    id: ElementId,
    kind: String,
}

impl Element {
    pub fn new(id: ElementId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// `true` if both elements match each other.
    pub fn same_kind(&self, other: &Element) -> bool {
        self.kind == other.kind
    }
}

// ---------------------------------------------------------------------------
// Tiles
// ---------------------------------------------------------------------------

/// One grid cell.
///
/// The position and world position are fixed for the tile's lifetime;
/// only the element slot changes, and only through [`Grid`](crate::Grid).
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    position: Position,
    world_position: WorldPosition,
    element: Option<Element>,
}

impl Tile {
    pub(crate) fn new(
        position: Position,
        world_position: WorldPosition,
        element: Option<Element>,
    ) -> Self {
        Self {
            position,
            world_position,
            element,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn world_position(&self) -> WorldPosition {
        self.world_position
    }

    pub fn element(&self) -> Option<&Element> {
        self.element.as_ref()
    }

    pub fn element_id(&self) -> Option<ElementId> {
        self.element.as_ref().map(Element::id)
    }

    pub fn kind(&self) -> Option<&str> {
        self.element.as_ref().map(Element::kind)
    }

    pub fn is_empty(&self) -> bool {
        self.element.is_none()
    }

    pub(crate) fn set_element(&mut self, element: Option<Element>) {
        self.element = element;
    }

    pub(crate) fn take_element(&mut self) -> Option<Element> {
        self.element.take()
    }
}

/// One element displaced by gravity.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMoveInfo {
    pub element: Element,
    pub from: Position,
    pub to: Position,
    /// World position of the destination slot, read from the tile.
    pub to_world: WorldPosition,
}
