use std::fmt;

use num_traits::PrimInt;
use serde::{Deserialize, Serialize};

/// Cell coordinates usable as an index into [`ndarray::Array2`].
///
/// Coordinates are signed so that neighbor offsets may step outside the grid;
/// such positions simply fail `get` lookups.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new<T: PrimInt>(row: T, col: T) -> Self {
        Position {
            row: row.to_i32().unwrap_or(i32::MAX),
            col: col.to_i32().unwrap_or(i32::MAX),
        }
    }

    pub fn offset(self, d_row: i32, d_col: i32) -> Self {
        Position {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }

    /// Whether the position lies inside a grid of the given `(rows, cols)` shape.
    pub fn within(self, shape: (usize, usize)) -> bool {
        self.row >= 0
            && self.col >= 0
            && (self.row as usize) < shape.0
            && (self.col as usize) < shape.1
    }
}

impl From<[i32; 2]> for Position {
    fn from([row, col]: [i32; 2]) -> Self {
        Position { row, col }
    }
}

impl From<Position> for [i32; 2] {
    fn from(p: Position) -> Self {
        [p.row, p.col]
    }
}

impl From<(usize, usize)> for Position {
    fn from((row, col): (usize, usize)) -> Self {
        Position::new(row, col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

unsafe impl ndarray::NdIndex<ndarray::Ix2> for Position {
    fn index_checked(&self, dim: &ndarray::Ix2, strides: &ndarray::Ix2) -> Option<isize> {
        if self.row.is_negative() || self.col.is_negative() {
            None
        } else {
            (self.row as usize, self.col as usize).index_checked(dim, strides)
        }
    }

    fn index_unchecked(&self, strides: &ndarray::Ix2) -> isize {
        (self.row as usize, self.col as usize).index_unchecked(strides)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::Position;

    #[test]
    fn test_index_array() {
        let grid = array![[1, 2, 3], [4, 5, 6]];
        assert_eq!(grid[Position::new(1, 2)], 6);
        assert_eq!(grid.get(Position::new(0, 1)), Some(&2));
        assert_eq!(grid.get(Position::new(-1, 0)), None);
        assert_eq!(grid.get(Position::new(0, 3)), None);
        assert_eq!(grid.get(Position::new(2, 0)), None);
    }

    #[test]
    fn test_within() {
        let shape = (2, 3);
        assert!(Position::new(0, 0).within(shape));
        assert!(Position::new(1, 2).within(shape));
        assert!(!Position::new(1, 3).within(shape));
        assert!(!Position::new(0, 0).offset(-1, 0).within(shape));
    }

    #[test]
    fn test_parse_position() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            at: Position,
        }

        let wrapper: Wrapper = toml::from_str("at = [3, 4]").unwrap();
        assert_eq!(wrapper.at, Position::new(3, 4));
    }
}
