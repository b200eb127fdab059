//! Match detection: same-kind connectivity plus the straight-line rule.
//!
//! A match is a 4-connected blob of one kind that contains a straight run
//! of at least [`MIN_LINE_LENGTH`] tiles on some row or column. When a
//! blob qualifies, the *whole* blob is reported, not only the run. An
//! L of five clears all five tiles.

use std::collections::BTreeMap;

use crate::{Direction, Grid, Position};

/// Default minimum blob size for a reportable group.
pub const DEFAULT_MIN_GROUP_SIZE: usize = 3;

/// Tiles in a row needed for a straight run.
pub const MIN_LINE_LENGTH: usize = 3;

/// A detected match: one connected same-kind blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedGroup {
    kind: String,
    positions: Vec<Position>,
}

impl ConnectedGroup {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Positions in discovery order (starting from the row-major first tile).
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.positions.contains(&position)
    }
}

/// Finds reportable groups on a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchDetector {
    min_group_size: usize,
}

impl Default for MatchDetector {
    fn default() -> Self {
        Self {
            min_group_size: DEFAULT_MIN_GROUP_SIZE,
        }
    }
}

impl MatchDetector {
    pub fn new(min_group_size: usize) -> Self {
        Self { min_group_size }
    }

    pub fn min_group_size(&self) -> usize {
        self.min_group_size
    }

    /// Returns every qualifying group. Groups never share a tile.
    ///
    /// Tiles are scanned row-major; each unvisited, non-empty tile seeds a
    /// flood fill. The visited bitmap is shared across seeds, so a blob is
    /// explored exactly once whether or not it ends up reported.
    pub fn find_all_connected_groups(&self, grid: &Grid) -> Vec<ConnectedGroup> {
        let mut visited = vec![false; grid.tiles().len()];
        let mut groups = Vec::new();

        for (index, tile) in grid.tiles().iter().enumerate() {
            if visited[index] {
                continue;
            }
            let Some(kind) = tile.kind() else {
                continue;
            };

            let region = flood_fill(grid, tile.position(), &mut visited);
            if region.len() >= self.min_group_size
                && has_straight_line_of_three(&region)
            {
                groups.push(ConnectedGroup {
                    kind: kind.to_owned(),
                    positions: region,
                });
            }
        }

        groups
    }
}

/// Collects the same-kind blob containing `start`.
///
/// Iterative depth-first search over an explicit stack. A tile is marked
/// in `visited` when pushed, so it is pushed (and returned) at most once
/// even when several paths reconverge on it.
fn flood_fill(grid: &Grid, start: Position, visited: &mut [bool]) -> Vec<Position> {
    let mut region = Vec::new();
    let (Some(start_index), Some(kind)) =
        (grid.index(start), grid.tile(start).and_then(|t| t.kind()))
    else {
        return region;
    };

    let mut stack = vec![start];
    visited[start_index] = true;

    while let Some(position) = stack.pop() {
        region.push(position);
        for direction in Direction::ALL {
            let Some(neighbour) = grid.neighbour(position, direction) else {
                continue;
            };
            if neighbour.kind() != Some(kind) {
                continue;
            }
            let Some(index) = grid.index(neighbour.position()) else {
                continue;
            };
            if !visited[index] {
                visited[index] = true;
                stack.push(neighbour.position());
            }
        }
    }

    region
}

/// `true` if some row or column of `positions` holds a run of at least
/// [`MIN_LINE_LENGTH`] consecutive cells.
pub fn has_straight_line_of_three(positions: &[Position]) -> bool {
    has_consecutive_run(positions, |p| p.y, |p| p.x)
        || has_consecutive_run(positions, |p| p.x, |p| p.y)
}

fn has_consecutive_run(
    positions: &[Position],
    line_of: impl Fn(&Position) -> i32,
    along: impl Fn(&Position) -> i32,
) -> bool {
    let mut lines: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
    for position in positions {
        lines.entry(line_of(position)).or_default().push(along(position));
    }

    lines.into_values().any(|mut cells| {
        cells.sort_unstable();
        cells.dedup();
        let mut run = 1;
        for pair in cells.windows(2) {
            run = if pair[1] == pair[0] + 1 { run + 1 } else { 1 };
            if run >= MIN_LINE_LENGTH {
                return true;
            }
        }
        false
    })
}
