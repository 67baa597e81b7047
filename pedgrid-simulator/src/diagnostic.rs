use serde::Serialize;

use crate::grid::{Color, Grid, PedestrianId};

#[derive(Debug, Default, Clone, Serialize)]
pub struct DiagnosticLog {
    pub scenario: String,
    pub total_steps: usize,
    pub preprocess_metrics: PreprocessMetrics,
    pub step_metrics: StepMetricsCollection,
    pub arrivals: Vec<ArrivalRecord>,
    pub final_grid: Option<GridSnapshot>,
}

impl DiagnosticLog {
    pub fn push(&mut self, step_metrics: StepMetrics) {
        self.step_metrics.push(step_metrics);
        self.total_steps += 1;
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct StepMetricsCollection {
    pub timestamp: Vec<f64>,
    pub active_ped_count: Vec<usize>,
    pub arrived_count: Vec<usize>,
    pub stuck_count: Vec<usize>,
    pub events_processed: Vec<usize>,
    pub waits: Vec<usize>,
    pub time_advance: Vec<f64>,
}

impl StepMetricsCollection {
    pub fn push(&mut self, metrics: StepMetrics) {
        self.timestamp.push(metrics.timestamp);
        self.active_ped_count.push(metrics.active_ped_count);
        self.arrived_count.push(metrics.arrived_count);
        self.stuck_count.push(metrics.stuck_count);
        self.events_processed.push(metrics.events_processed);
        self.waits.push(metrics.waits);
        self.time_advance.push(metrics.time_advance);
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PreprocessMetrics {
    pub time_calc_field: f64,
    pub reachable_cells: usize,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct StepMetrics {
    pub timestamp: f64,
    pub active_ped_count: usize,
    pub arrived_count: usize,
    pub stuck_count: usize,
    pub events_processed: usize,
    pub waits: usize,
    pub time_advance: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ArrivalRecord {
    pub pedestrian: PedestrianId,
    pub time: f64,
}

/// Cell states as symbols and colors, one string/row each.
#[derive(Debug, Clone, Serialize)]
pub struct GridSnapshot {
    pub rows: Vec<String>,
    pub colors: Vec<Vec<Color>>,
}

impl GridSnapshot {
    pub fn capture(grid: &Grid) -> Self {
        let cells = grid.cells();
        GridSnapshot {
            rows: cells
                .rows()
                .into_iter()
                .map(|row| row.iter().map(|c| c.state().symbol()).collect())
                .collect(),
            colors: cells
                .rows()
                .into_iter()
                .map(|row| row.iter().map(|c| c.color()).collect())
                .collect(),
        }
    }
}
