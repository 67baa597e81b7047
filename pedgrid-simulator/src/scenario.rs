use serde::Deserialize;

use crate::{util::Position, SimulatorOptions};

const fn f_one() -> f64 {
    1.0
}

/// Scenario data
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Scenario {
    pub grid: GridConfig,
    #[serde(default)]
    pub pedestrians: Vec<PedestrianConfig>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    #[serde(default)]
    pub options: SimulatorOptions,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,
    pub target: Position,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PedestrianConfig {
    pub position: Position,
    #[serde(default = "f_one")]
    pub speed: f64,
}

impl Default for PedestrianConfig {
    fn default() -> Self {
        PedestrianConfig {
            position: Position::default(),
            speed: 1.0,
        }
    }
}

/// Axis-aligned block of obstacle cells, inclusive on both corners.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ObstacleConfig {
    pub top_left: Position,
    pub bottom_right: Position,
}

impl ObstacleConfig {
    pub fn cell(position: Position) -> Self {
        ObstacleConfig {
            top_left: position,
            bottom_right: position,
        }
    }
}
