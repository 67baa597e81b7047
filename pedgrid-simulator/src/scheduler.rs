//! Discrete-event scheduler moving pedestrians along the distance field.
//!
//! Every active pedestrian has exactly one pending [`Event`]. An event either
//! commits a planned move (its destination differs from the pedestrian's
//! position) or re-evaluates the pedestrian in place after a settle or a wait.
//! Events are processed in `(time, pedestrian)` order, so pedestrians with
//! different speeds interleave in true chronological order.

use std::{cmp::Reverse, collections::BinaryHeap};

use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use rustc_hash::FxHashSet;

use crate::{
    field::DistanceField,
    grid::{CellState, Grid, PedestrianId},
    util::Position,
    SimulatorOptions,
};

/// A planned arrival of a pedestrian at `destination`, or a wait when the
/// destination is the pedestrian's own cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Event {
    pub time: OrderedFloat<f64>,
    pub pedestrian: PedestrianId,
    pub destination: Position,
}

impl Event {
    pub fn new(time: f64, pedestrian: PedestrianId, destination: Position) -> Self {
        Event {
            time: OrderedFloat(time),
            pedestrian,
            destination,
        }
    }
}

/// Min-queue of events ordered by time, then pedestrian id.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
}

impl EventQueue {
    pub fn push(&mut self, event: Event) {
        self.heap.push(Reverse(event));
    }

    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek().map(|e| &e.0)
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|e| e.0)
    }

    /// Pop the earliest event if it is due at `time`.
    pub fn pop_due(&mut self, time: f64) -> Option<Event> {
        if self.peek().is_some_and(|event| event.time.0 <= time) {
            self.pop()
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pending events in processing order.
    pub fn to_sorted_vec(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.heap.iter().map(|e| e.0).collect();
        events.sort();
        events
    }
}

/// What happened during one [`Scheduler::advance`] call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AdvanceReport {
    /// Number of events popped from the queue
    pub processed: usize,
    /// Number of wait events scheduled
    pub waits: usize,
    /// Pedestrians that reached the target, with their arrival time
    pub arrived: Vec<(PedestrianId, f64)>,
    /// Pedestrians that got stuck, with the time it was detected
    pub stuck: Vec<(PedestrianId, f64)>,
}

enum Plan {
    Move { destination: Position, cost: f64 },
    Wait,
    Stuck,
}

pub struct Scheduler {
    queue: EventQueue,
    /// Non-target cells held or reserved by a pedestrian
    occupied: FxHashSet<Position>,
    delta_time: f64,
}

impl Scheduler {
    /// Seed a settle event at time zero for every pedestrian.
    pub fn new(grid: &Grid, options: &SimulatorOptions) -> Self {
        let mut queue = EventQueue::default();
        let mut occupied = FxHashSet::default();

        for pedestrian in grid.pedestrians().iter().filter(|p| !p.is_terminal()) {
            occupied.insert(pedestrian.position);
            queue.push(Event::new(0.0, pedestrian.id, pedestrian.position));
        }

        Scheduler {
            queue,
            occupied,
            delta_time: options.delta_time,
        }
    }

    /// Process every event due at or before `current_timestamp`.
    pub fn advance(
        &mut self,
        grid: &mut Grid,
        field: &DistanceField,
        current_timestamp: f64,
    ) -> AdvanceReport {
        let mut report = AdvanceReport::default();

        if !current_timestamp.is_finite() {
            warn!("Ignoring advance to non-finite timestamp {current_timestamp}");
            return report;
        }

        while let Some(event) = self.queue.pop_due(current_timestamp) {
            report.processed += 1;
            self.process(grid, field, event, current_timestamp, &mut report);
        }

        report
    }

    fn process(
        &mut self,
        grid: &mut Grid,
        field: &DistanceField,
        event: Event,
        current_timestamp: f64,
        report: &mut AdvanceReport,
    ) {
        let id = event.pedestrian;
        let time = event.time.into_inner();
        let Some(pedestrian) = grid.pedestrian(id) else {
            warn!("Dropping event for unknown pedestrian {id}");
            return;
        };
        let (mut position, speed, track_color) =
            (pedestrian.position, pedestrian.speed, pedestrian.track_color);

        if event.destination != position {
            grid.set_state(position, CellState::Visited(track_color));
            self.occupied.remove(&position);
            position = event.destination;

            let arrived = grid.state(position) == Some(CellState::Target);
            if let Some(pedestrian) = grid.pedestrian_mut(id) {
                pedestrian.position = position;
                pedestrian.arrived = arrived;
            }

            if arrived {
                grid.record_arrival(id);
                report.arrived.push((id, time));
                info!("Pedestrian {id} arrived at the target at {time:.3}");
                return;
            }
            grid.set_state(position, CellState::Pedestrian);
        }

        match self.plan(grid, field, position) {
            Plan::Move { destination, cost } => {
                if grid.state(destination) != Some(CellState::Target) {
                    self.occupied.insert(destination);
                }
                self.queue
                    .push(Event::new(time + cost / speed, id, destination));
            }
            Plan::Wait => {
                report.waits += 1;
                debug!("Pedestrian {id} waits at {position}");
                self.queue.push(Event::new(
                    current_timestamp + self.delta_time,
                    id,
                    position,
                ));
            }
            Plan::Stuck => {
                if let Some(pedestrian) = grid.pedestrian_mut(id) {
                    pedestrian.stuck = true;
                }
                report.stuck.push((id, time));
                warn!("Pedestrian {id} is stuck at {position} at {time:.3}");
            }
        }
    }

    /// Scan the ranked candidates of `position` for the first usable move.
    fn plan(&self, grid: &Grid, field: &DistanceField, position: Position) -> Plan {
        let candidates = field.candidates(position);
        if candidates.is_empty() {
            return Plan::Stuck;
        }

        for candidate in candidates {
            let next = candidate.direction.apply(position);
            if grid.is_obstacle(next) {
                return Plan::Stuck;
            }
            if !self.occupied.contains(&next) {
                return Plan::Move {
                    destination: next,
                    cost: candidate.direction.cost,
                };
            }
        }

        Plan::Wait
    }

    pub fn occupied(&self) -> &FxHashSet<Position> {
        &self.occupied
    }

    pub fn pending_events(&self) -> Vec<Event> {
        self.queue.to_sorted_vec()
    }

    pub fn next_event_time(&self) -> Option<f64> {
        self.queue.peek().map(|e| e.time.into_inner())
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::SQRT_2;

    use assert_float_eq::*;

    use super::*;
    use crate::scenario::{GridConfig, ObstacleConfig, PedestrianConfig, Scenario};

    fn setup(scenario: Scenario, options: SimulatorOptions) -> (Grid, DistanceField, Scheduler) {
        let grid = Grid::new(&scenario, &options).unwrap();
        let field = DistanceField::build(&grid, &options);
        let scheduler = Scheduler::new(&grid, &options);
        (grid, field, scheduler)
    }

    fn pedestrian(row: i32, col: i32, speed: f64) -> PedestrianConfig {
        PedestrianConfig {
            position: Position::new(row, col),
            speed,
        }
    }

    #[test]
    fn test_queue_order() {
        let mut queue = EventQueue::default();
        queue.push(Event::new(1.0, PedestrianId(1), Position::new(0, 0)));
        queue.push(Event::new(1.0, PedestrianId(0), Position::new(0, 0)));
        queue.push(Event::new(0.5, PedestrianId(2), Position::new(0, 0)));

        assert_eq!(queue.to_sorted_vec().len(), 3);
        assert!(queue.pop_due(0.25).is_none());

        let order: Vec<u32> = std::iter::from_fn(|| queue.pop_due(1.0))
            .map(|e| e.pedestrian.0)
            .collect();
        assert_eq!(order, vec![2, 0, 1]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_diagonal_walk() {
        let scenario = Scenario {
            grid: GridConfig {
                rows: 3,
                cols: 3,
                target: Position::new(2, 2),
            },
            pedestrians: vec![pedestrian(0, 0, 1.0)],
            ..Default::default()
        };
        let (mut grid, field, mut scheduler) = setup(scenario, SimulatorOptions::default());
        let id = PedestrianId(0);

        let report = scheduler.advance(&mut grid, &field, 0.0);
        assert_eq!(report.processed, 1);
        let pending = scheduler.pending_events();
        assert_eq!(pending, vec![Event::new(SQRT_2, id, Position::new(1, 1))]);
        assert!(scheduler.occupied().contains(&Position::new(1, 1)));

        scheduler.advance(&mut grid, &field, 1.5);
        assert_eq!(grid.pedestrian(id).unwrap().position, Position::new(1, 1));
        assert!(matches!(
            grid.state(Position::new(0, 0)),
            Some(CellState::Visited(_))
        ));
        assert_eq!(grid.state(Position::new(1, 1)), Some(CellState::Pedestrian));
        assert!(!scheduler.occupied().contains(&Position::new(0, 0)));
        // The target is never reserved.
        assert_eq!(scheduler.occupied().len(), 1);

        let report = scheduler.advance(&mut grid, &field, 3.0);
        assert_eq!(report.arrived.len(), 1);
        assert_float_absolute_eq!(report.arrived[0].1, 2.0 * SQRT_2, 1e-9);
        assert!(grid.pedestrian(id).unwrap().arrived);
        assert_eq!(grid.target().arrivals, vec![id]);
        assert_eq!(grid.state(Position::new(2, 2)), Some(CellState::Target));
        assert!(scheduler.is_idle());
        assert!(scheduler.occupied().is_empty());
    }

    #[test]
    fn test_wait_in_corridor() {
        let scenario = Scenario {
            grid: GridConfig {
                rows: 1,
                cols: 4,
                target: Position::new(0, 3),
            },
            pedestrians: vec![pedestrian(0, 1, 1.0), pedestrian(0, 0, 1.0)],
            ..Default::default()
        };
        let options = SimulatorOptions {
            delta_time: 0.5,
            ..Default::default()
        };
        let (mut grid, field, mut scheduler) = setup(scenario, options);
        let (a, b) = (PedestrianId(0), PedestrianId(1));

        let report = scheduler.advance(&mut grid, &field, 0.0);
        assert_eq!(report.waits, 1);
        assert_eq!(
            scheduler.pending_events(),
            vec![
                Event::new(0.5, b, Position::new(0, 0)),
                Event::new(1.0, a, Position::new(0, 2)),
            ]
        );

        let report = scheduler.advance(&mut grid, &field, 0.5);
        assert_eq!(report.waits, 1);
        assert_eq!(scheduler.next_event_time(), Some(1.0));

        let report = scheduler.advance(&mut grid, &field, 1.0);
        assert_eq!(report.processed, 2);
        assert_eq!(report.waits, 0);
        assert_eq!(
            scheduler.pending_events(),
            vec![
                Event::new(2.0, a, Position::new(0, 3)),
                Event::new(2.0, b, Position::new(0, 1)),
            ]
        );

        for t in [2.0, 3.0, 4.0] {
            scheduler.advance(&mut grid, &field, t);
        }
        assert_eq!(grid.target().arrivals, vec![a, b]);
        assert_eq!(grid.to_string(), "***T\n");
    }

    #[test]
    fn test_stuck_without_route() {
        let scenario = Scenario {
            grid: GridConfig {
                rows: 3,
                cols: 3,
                target: Position::new(0, 2),
            },
            pedestrians: vec![pedestrian(0, 0, 1.0)],
            obstacles: vec![ObstacleConfig {
                top_left: Position::new(0, 1),
                bottom_right: Position::new(2, 1),
            }],
            ..Default::default()
        };
        let (mut grid, field, mut scheduler) = setup(scenario, SimulatorOptions::default());

        let report = scheduler.advance(&mut grid, &field, 0.0);
        assert_eq!(report.stuck, vec![(PedestrianId(0), 0.0)]);
        assert!(grid.pedestrian(PedestrianId(0)).unwrap().stuck);
        assert!(scheduler.is_idle());

        let report = scheduler.advance(&mut grid, &field, 10.0);
        assert_eq!(report, AdvanceReport::default());
        assert_eq!(grid.state(Position::new(0, 0)), Some(CellState::Pedestrian));
    }

    #[test]
    fn test_stuck_on_obstacle() {
        let scenario = Scenario {
            grid: GridConfig {
                rows: 1,
                cols: 3,
                target: Position::new(0, 2),
            },
            pedestrians: vec![pedestrian(0, 0, 1.0)],
            obstacles: vec![ObstacleConfig::cell(Position::new(0, 1))],
            ..Default::default()
        };
        let options = SimulatorOptions {
            obstacle_avoidance: false,
            ..Default::default()
        };
        let (mut grid, field, mut scheduler) = setup(scenario, options);
        assert!(field.is_visited(Position::new(0, 0)));

        let report = scheduler.advance(&mut grid, &field, 0.0);
        assert_eq!(report.stuck.len(), 1);
        assert!(!scheduler.occupied().contains(&Position::new(0, 1)));
    }

    #[test]
    fn test_ignore_non_finite_timestamp() {
        let scenario = Scenario {
            grid: GridConfig {
                rows: 1,
                cols: 2,
                target: Position::new(0, 1),
            },
            pedestrians: vec![pedestrian(0, 0, 1.0)],
            ..Default::default()
        };
        let (mut grid, field, mut scheduler) = setup(scenario, SimulatorOptions::default());

        assert_eq!(
            scheduler.advance(&mut grid, &field, f64::NAN),
            AdvanceReport::default()
        );
        assert_eq!(scheduler.pending_events().len(), 1);
    }
}
