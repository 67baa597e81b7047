use crate::{util::Position, SimulatorOptions};

/// Offsets of the 8-connected neighborhood, in enumeration order.
/// Ranked candidate lists break cost ties by this order.
const OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// A single-cell move with its travel cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction {
    pub d_row: i32,
    pub d_col: i32,
    pub cost: f64,
}

impl Direction {
    pub fn apply(&self, position: Position) -> Position {
        position.offset(self.d_row, self.d_col)
    }
}

/// The 8 move directions, with costs taken from the options.
#[derive(Debug, Clone)]
pub struct Directions([Direction; 8]);

impl Directions {
    pub fn new(options: &SimulatorOptions) -> Self {
        let diagonal = options.distance_by_row.hypot(options.distance_by_col);

        Directions(OFFSETS.map(|(d_row, d_col)| {
            let cost = match (d_row, d_col) {
                (_, 0) => options.distance_by_row,
                (0, _) => options.distance_by_col,
                _ => diagonal,
            };
            Direction { d_row, d_col, cost }
        }))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Direction> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use super::*;

    #[test]
    fn test_direction_costs() {
        let options = SimulatorOptions {
            distance_by_row: 3.0,
            distance_by_col: 4.0,
            ..Default::default()
        };
        let directions = Directions::new(&options);

        let costs: Vec<f64> = directions.iter().map(|d| d.cost).collect();
        for &c in &costs[0..2] {
            assert_float_absolute_eq!(c, 3.0);
        }
        for &c in &costs[2..4] {
            assert_float_absolute_eq!(c, 4.0);
        }
        for &c in &costs[4..] {
            assert_float_absolute_eq!(c, 5.0);
        }

        let diagonals = directions.iter().filter(|d| d.d_row != 0 && d.d_col != 0);
        assert!(diagonals.map(|d| d.cost).eq(costs[4..].iter().copied()));
    }

    #[test]
    fn test_apply() {
        let directions = Directions::new(&SimulatorOptions::default());
        let origin = Position::new(1, 1);
        let mut reached: Vec<Position> = directions.iter().map(|d| d.apply(origin)).collect();
        reached.sort();
        reached.dedup();

        assert_eq!(reached.len(), 8);
        assert!(!reached.contains(&origin));
        assert_eq!(
            directions.iter().next().map(|d| d.apply(origin)),
            Some(Position::new(2, 1))
        );
    }
}
