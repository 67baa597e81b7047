pub mod diagnostic;
pub mod direction;
pub mod error;
pub mod field;
pub mod grid;
pub mod scenario;
pub mod scheduler;
pub mod util;

use std::time::Instant;

use diagnostic::{ArrivalRecord, PreprocessMetrics, StepMetrics};
use error::{ScenarioError, ScenarioResult};
use field::DistanceField;
use grid::{Grid, Pedestrian};
use log::info;
use scenario::Scenario;
use scheduler::{AdvanceReport, Scheduler};
use serde::Deserialize;

/// Simulator instance.
pub struct Simulator {
    options: SimulatorOptions,
    grid: Grid,
    field: DistanceField,
    scheduler: Scheduler,
    pub step: usize,
    pub timestamp: f64,
    pub preprocess_metrics: PreprocessMetrics,
    pub arrivals: Vec<ArrivalRecord>,
}

impl Simulator {
    pub fn new(options: SimulatorOptions, scenario: &Scenario) -> ScenarioResult<Self> {
        let grid = Grid::new(scenario, &options)?;

        let instant = Instant::now();
        let field = DistanceField::build(&grid, &options);
        let preprocess_metrics = PreprocessMetrics {
            time_calc_field: instant.elapsed().as_secs_f64(),
            reachable_cells: field.visited.iter().filter(|&&v| v).count(),
        };

        let scheduler = Scheduler::new(&grid, &options);

        info!("Simulator initialization finished");
        info!("Simulator options: {options:#?}");

        Ok(Simulator {
            options,
            grid,
            field,
            scheduler,
            step: 0,
            timestamp: 0.0,
            preprocess_metrics,
            arrivals: Vec::new(),
        })
    }

    /// Process every event due at or before `timestamp`.
    pub fn advance(&mut self, timestamp: f64) -> AdvanceReport {
        let report = self
            .scheduler
            .advance(&mut self.grid, &self.field, timestamp);

        self.timestamp = self.timestamp.max(timestamp);
        self.arrivals
            .extend(report.arrived.iter().map(|&(pedestrian, time)| ArrivalRecord {
                pedestrian,
                time,
            }));

        report
    }

    /// Advance the clock by one `delta_time` and collect step metrics.
    pub fn tick(&mut self) -> StepMetrics {
        let instant = Instant::now();

        self.step += 1;
        let timestamp = self.step as f64 * self.options.delta_time;
        let report = self.advance(timestamp);

        let pedestrians = self.grid.pedestrians();
        StepMetrics {
            timestamp,
            active_ped_count: self.grid.active_count(),
            arrived_count: pedestrians.iter().filter(|p| p.arrived).count(),
            stuck_count: pedestrians.iter().filter(|p| p.stuck).count(),
            events_processed: report.processed,
            waits: report.waits,
            time_advance: instant.elapsed().as_secs_f64(),
        }
    }

    /// Whether every pedestrian has arrived or got stuck.
    ///
    /// Each active pedestrian holds exactly one pending event, so this is the
    /// same as the scheduler running out of events.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn field(&self) -> &DistanceField {
        &self.field
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn list_pedestrians(&self) -> &[Pedestrian] {
        self.grid.pedestrians()
    }
}

/// Simulator options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatorOptions {
    /// Cost of a step between vertically adjacent cells.
    pub distance_by_row: f64,
    /// Cost of a step between horizontally adjacent cells.
    pub distance_by_col: f64,
    /// Whether obstacle cells are excluded from the distance field.
    pub obstacle_avoidance: bool,
    /// Extra cost of entering an obstacle cell when avoidance is off.
    pub obstacle_extra_cost: f64,
    /// Simulated time between ticks, also the length of a wait.
    pub delta_time: f64,
    /// Seed of the track color generator.
    pub seed: u64,
    /// Upper bound on pedestrian speed, in distance units per unit of time.
    pub max_speed: f64,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        SimulatorOptions {
            distance_by_row: 1.0,
            distance_by_col: 1.0,
            obstacle_avoidance: true,
            obstacle_extra_cost: 0.0,
            delta_time: 1.0,
            seed: 0,
            max_speed: 100.0,
        }
    }
}

impl SimulatorOptions {
    pub fn validate(&self) -> ScenarioResult<()> {
        let positive = [
            ("distance_by_row", self.distance_by_row),
            ("distance_by_col", self.distance_by_col),
            ("delta_time", self.delta_time),
            ("max_speed", self.max_speed),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScenarioError::InvalidOption { name, value });
            }
        }

        let extra = self.obstacle_extra_cost;
        if !(extra.is_finite() && extra >= 0.0) {
            return Err(ScenarioError::InvalidOption {
                name: "obstacle_extra_cost",
                value: extra,
            });
        }

        Ok(())
    }
}
