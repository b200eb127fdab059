//! Gravity: per-column compaction toward `y = 0`.

use crate::{Grid, Position, TileMoveInfo};

/// Drops every element as far down its column as it can go.
///
/// Columns are independent and processed left to right. Inside a column
/// elements keep their relative order; every element whose row changed
/// gets one [`TileMoveInfo`], carrying the destination tile's world
/// position. Calling this again without any other mutation returns an
/// empty plan.
pub fn normalize(grid: &mut Grid) -> Vec<TileMoveInfo> {
    let mut moves = Vec::new();

    for x in 0..grid.width() as i32 {
        let mut write_y = 0;
        for read_y in 0..grid.height() as i32 {
            let from = Position::new(x, read_y);
            if grid.tile(from).is_none_or(|t| t.is_empty()) {
                continue;
            }
            if write_y != read_y {
                let to = Position::new(x, write_y);
                if let Some(info) = drop_element(grid, from, to) {
                    moves.push(info);
                }
            }
            write_y += 1;
        }
    }

    moves
}

fn drop_element(grid: &mut Grid, from: Position, to: Position) -> Option<TileMoveInfo> {
    let element = grid.tile_mut(from)?.take_element()?;
    let target = grid.tile_mut(to)?;
    let to_world = target.world_position();
    target.set_element(Some(element.clone()));
    Some(TileMoveInfo {
        element,
        from,
        to,
        to_world,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Element, ElementId, WorldPosition};

    fn column(kinds: &[Option<&str>]) -> Grid {
        let worlds = (0..kinds.len())
            .map(|y| WorldPosition::new(0.0, y as f32 * 10.0, 0.0))
            .collect();
        let elements = kinds
            .iter()
            .enumerate()
            .map(|(i, k)| k.map(|k| Element::new(ElementId(i as u64), k)))
            .collect();
        Grid::new(1, kinds.len(), worlds, elements).unwrap()
    }

    #[test]
    fn test_full_column_produces_no_moves() {
        let mut grid = column(&[Some("A"), Some("B"), Some("C")]);
        assert!(normalize(&mut grid).is_empty());
    }

    #[test]
    fn test_empty_column_produces_no_moves() {
        let mut grid = column(&[None, None]);
        assert!(normalize(&mut grid).is_empty());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_move_carries_destination_world_position() {
        let mut grid = column(&[None, None, Some("A")]);
        let moves = normalize(&mut grid);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].from, Position::new(0, 2));
        assert_eq!(moves[0].to, Position::new(0, 0));
        assert_eq!(moves[0].to_world, WorldPosition::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_relative_order_is_preserved() {
        let mut grid = column(&[None, Some("A"), None, Some("B"), Some("C")]);
        normalize(&mut grid);
        let kinds: Vec<Option<&str>> =
            grid.tiles().iter().map(|t| t.kind()).collect();
        assert_eq!(kinds, vec![Some("A"), Some("B"), Some("C"), None, None]);
    }
}
