use std::{cmp::Reverse, collections::BinaryHeap};

use log::debug;
use ndarray::{Array2, Zip};
use ordered_float::OrderedFloat;
use thin_vec::ThinVec;

use crate::{
    direction::{Direction, Directions},
    grid::{CellState, Grid},
    util::Position,
    SimulatorOptions,
};

/// A neighbor move ranked by the total cost of reaching the target through it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub direction: Direction,
    /// Neighbor distance-to-target plus the step cost.
    pub cost: f64,
}

/// Static shortest-path field towards the target.
pub struct DistanceField {
    pub directions: Directions,
    /// Distance to the target, infinite where unreachable
    pub distance_map: Array2<f64>,
    /// Cells settled by the shortest-path search
    pub visited: Array2<bool>,
    /// Per-cell candidate moves sorted by ascending cost
    pub ranked: Array2<ThinVec<Candidate>>,
}

impl DistanceField {
    pub fn build(grid: &Grid, options: &SimulatorOptions) -> Self {
        let directions = Directions::new(options);
        let (distance_map, visited) = apply_dijkstra(grid, &directions, options);
        let ranked = rank_neighbors(&distance_map, &visited, &directions);

        debug!(
            "Distance field: {} of {} cells reach the target",
            visited.iter().filter(|&&v| v).count(),
            visited.len()
        );

        DistanceField {
            directions,
            distance_map,
            visited,
            ranked,
        }
    }

    /// Distance to the target, infinite for unreachable or out-of-bounds cells.
    pub fn distance(&self, position: Position) -> f64 {
        self.distance_map
            .get(position)
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    pub fn is_visited(&self, position: Position) -> bool {
        self.visited.get(position).copied().unwrap_or(false)
    }

    /// Candidate moves from `position`, best first. Empty when the target is unreachable.
    pub fn candidates(&self, position: Position) -> &[Candidate] {
        self.ranked
            .get(position)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }
}

/// Single-source Dijkstra from the target over the 8-connected grid.
///
/// Obstacle cells are skipped when `obstacle_avoidance` is set; otherwise entering
/// one costs `obstacle_extra_cost` on top of the step cost.
fn apply_dijkstra(
    grid: &Grid,
    directions: &Directions,
    options: &SimulatorOptions,
) -> (Array2<f64>, Array2<bool>) {
    type Float = Reverse<OrderedFloat<f64>>;

    let shape = grid.shape();
    let mut distance = Array2::from_elem(shape, f64::INFINITY);
    let mut visited = Array2::from_elem(shape, false);
    let mut queue = BinaryHeap::<(Float, Position)>::new();
    let float = |x: f64| Reverse(OrderedFloat(x));

    let target = grid.target().position;
    distance[target] = 0.0;
    queue.push((float(0.0), target));

    while let Some((d, ix)) = queue.pop() {
        if visited[ix] {
            continue;
        }

        visited[ix] = true;
        let d = d.0.into_inner();

        for direction in directions.iter() {
            let next = direction.apply(ix);
            let obstacle = match grid.state(next) {
                Some(state) => state == CellState::Obstacle,
                None => continue,
            };
            if visited[next] || (obstacle && options.obstacle_avoidance) {
                continue;
            }

            let mut u = d + direction.cost;
            if obstacle {
                u += options.obstacle_extra_cost;
            }

            if u < distance[next] {
                distance[next] = u;
                queue.push((float(u), next));
            }
        }
    }

    (distance, visited)
}

fn rank_neighbors(
    distance: &Array2<f64>,
    visited: &Array2<bool>,
    directions: &Directions,
) -> Array2<ThinVec<Candidate>> {
    Zip::indexed(visited).par_map_collect(|ix, &reached| {
        let mut candidates = ThinVec::new();
        if !reached {
            return candidates;
        }

        let ix = Position::from(ix);
        for direction in directions.iter() {
            let next = direction.apply(ix);
            if !visited.get(next).copied().unwrap_or(false) {
                continue;
            }
            candidates.push(Candidate {
                direction: *direction,
                cost: distance[next] + direction.cost,
            });
        }

        // stable: equal costs keep direction order
        candidates.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        candidates
    })
}
