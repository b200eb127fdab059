//! Swipe input.

use serde::{Deserialize, Serialize};
use tilematch_grid::{Direction, ElementId, WorldPosition};
use tilematch_level::GameplayConfig;

/// A directional gesture that started on an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwipeEvent {
    pub direction: Direction,
    pub start: WorldPosition,
    pub end: WorldPosition,
    /// The element under the start point.
    pub target: ElementId,
}

impl SwipeEvent {
    /// A swipe with no meaningful gesture points.
    pub fn new(target: ElementId, direction: Direction) -> Self {
        Self {
            direction,
            start: WorldPosition::default(),
            end: WorldPosition::default(),
            target,
        }
    }
}

/// Turns raw gestures into [`SwipeEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeDetector {
    /// Gestures shorter than this, in world units, are ignored.
    pub min_distance: f32,
}

impl Default for SwipeDetector {
    fn default() -> Self {
        Self { min_distance: 0.0 }
    }
}

impl SwipeDetector {
    pub fn new(min_distance: f32) -> Self {
        Self { min_distance }
    }

    pub fn from_config(config: &GameplayConfig) -> Self {
        Self::new(config.min_swipe_distance)
    }

    /// Classifies a gesture from `start` to `end`.
    ///
    /// Returns `None` if no element was under the start point, if the
    /// gesture is shorter than `min_distance`, or if it has no length at
    /// all. Otherwise the direction is the dominant axis of the delta,
    /// with ties going to the vertical axis. Only `x` and `y` count.
    pub fn detect(
        &self,
        start: WorldPosition,
        end: WorldPosition,
        target: Option<ElementId>,
    ) -> Option<SwipeEvent> {
        let target = target?;
        let (dx, dy) = (end.x - start.x, end.y - start.y);
        let distance = dx.hypot(dy);
        if distance == 0.0 || distance < self.min_distance {
            return None;
        }

        let direction = if dx.abs() > dy.abs() {
            if dx > 0.0 { Direction::Right } else { Direction::Left }
        } else if dy > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        };

        Some(SwipeEvent {
            direction,
            start,
            end,
            target,
        })
    }
}
