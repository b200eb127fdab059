//! World positions for tile slots.

use serde::{Deserialize, Serialize};
use tilematch_grid::WorldPosition;

/// Cell size, spacing, and horizontal padding of the board.
///
/// The board is centred on `origin`. Offset cells reserve empty columns
/// on either side, which shifts the playable columns without changing
/// the grid's width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    pub element_width: f32,
    pub element_height: f32,
    pub gap_x: f32,
    pub gap_y: f32,
    pub left_offset_cells: u32,
    pub right_offset_cells: u32,
    pub origin: WorldPosition,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            element_width: 1.0,
            element_height: 1.0,
            gap_x: 0.1,
            gap_y: 0.1,
            left_offset_cells: 0,
            right_offset_cells: 0,
            origin: WorldPosition::default(),
        }
    }
}

impl GridLayout {
    /// Total board extent `(width, height)` including offset cells.
    pub fn extent(&self, width: usize, height: usize) -> (f32, f32) {
        let cells_x = width as f32
            + self.left_offset_cells as f32
            + self.right_offset_cells as f32;
        let cells_y = height as f32;
        (
            cells_x * self.element_width + (cells_x - 1.0).max(0.0) * self.gap_x,
            cells_y * self.element_height + (cells_y - 1.0).max(0.0) * self.gap_y,
        )
    }

    /// World position of every slot, row-major.
    pub fn world_positions(&self, width: usize, height: usize) -> Vec<WorldPosition> {
        let (total_w, total_h) = self.extent(width, height);
        let offset_x = -total_w / 2.0 + self.element_width / 2.0;
        let offset_y = -total_h / 2.0 + self.element_height / 2.0;
        let step_x = self.element_width + self.gap_x;
        let step_y = self.element_height + self.gap_y;

        let mut positions = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let column = (x as u32 + self.left_offset_cells) as f32;
                positions.push(WorldPosition::new(
                    self.origin.x + offset_x + column * step_x,
                    self.origin.y + offset_y + y as f32 * step_y,
                    self.origin.z,
                ));
            }
        }
        positions
    }
}
