//! Grid placement for equipment packages.
//!
//! Slots tile left-to-right then top-to-bottom, `spacing` apart, starting one
//! unit in from the room's corner. Every point is clamped inside the room, so
//! slots past the grid's capacity pile up against the far walls.

/// A point on the room floor plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPosition {
    pub x: f64,
    pub y: f64,
}

/// Number of columns that fit across `width`, never less than one.
pub fn column_count(width: f64, spacing: f64) -> usize {
    let columns = (width / spacing).floor();
    if columns.is_finite() && columns >= 1.0 {
        columns as usize
    } else {
        1
    }
}

/// Position of slot `index` in a `width` x `length` room.
pub fn grid_position(index: usize, width: f64, length: f64, spacing: f64) -> GridPosition {
    let columns = column_count(width, spacing);
    let column = index % columns;
    let row = index / columns;

    GridPosition {
        x: (1.0 + column as f64 * spacing).min(width - 1.0),
        y: (1.0 + row as f64 * spacing).min(length - 1.0),
    }
}

/// Positions for `count` consecutive slots.
pub fn grid_positions(count: usize, width: f64, length: f64, spacing: f64) -> Vec<GridPosition> {
    (0..count)
        .map(|i| grid_position(i, width, length, spacing))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiles_left_to_right_then_down() {
        // 10 wide with spacing 2 gives 5 columns
        let positions = grid_positions(7, 10.0, 10.0, 2.0);

        assert_eq!(positions[0], GridPosition { x: 1.0, y: 1.0 });
        assert_eq!(positions[1], GridPosition { x: 3.0, y: 1.0 });
        assert_eq!(positions[4], GridPosition { x: 9.0, y: 1.0 });
        assert_eq!(positions[5], GridPosition { x: 1.0, y: 3.0 });
        assert_eq!(positions[6], GridPosition { x: 3.0, y: 3.0 });
    }

    #[test]
    fn test_positions_clamped_inside_room() {
        for (width, length) in [(1.0, 1.0), (3.0, 2.0), (7.5, 4.0), (20.0, 15.0)] {
            for (i, p) in grid_positions(200, width, length, 2.0).iter().enumerate() {
                assert!(p.x <= width - 1.0, "slot {} x {} in width {}", i, p.x, width);
                assert!(p.y <= length - 1.0, "slot {} y {} in length {}", i, p.y, length);
                if width >= 2.0 {
                    assert!(p.x >= 1.0);
                }
                if length >= 2.0 {
                    assert!(p.y >= 1.0);
                }
            }
        }
    }

    #[test]
    fn test_distinct_within_capacity() {
        // 5 columns x 4 usable rows before clamping kicks in
        let positions = grid_positions(20, 10.0, 9.0, 2.0);
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                assert_ne!(positions[i], positions[j], "slots {} and {} collide", i, j);
            }
        }
    }

    #[test]
    fn test_narrow_room_uses_single_column() {
        assert_eq!(column_count(1.5, 2.0), 1);
        assert_eq!(column_count(0.0, 2.0), 1);
        let positions = grid_positions(3, 1.5, 10.0, 2.0);
        assert!(positions.iter().all(|p| p.x == 0.5));
        assert_eq!(positions[2].y, 5.0);
    }

    #[test]
    fn test_empty_package_yields_no_positions() {
        assert!(grid_positions(0, 10.0, 10.0, 2.0).is_empty());
    }
}
