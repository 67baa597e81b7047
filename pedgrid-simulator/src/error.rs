//! Scenario validation errors.

use thiserror::Error;

use crate::{grid::PedestrianId, util::Position};

/// Errors produced while building a simulator from a scenario.
#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    #[error("grid must have at least one row and one column, got {rows}x{cols}")]
    EmptyGrid { rows: usize, cols: usize },

    #[error("grid of {rows}x{cols} cells is too large")]
    GridTooLarge { rows: usize, cols: usize },

    #[error("target {0} lies outside the grid")]
    TargetOutOfBounds(Position),

    #[error("target {0} lies inside an obstacle")]
    TargetBlocked(Position),

    #[error("obstacle #{index} corner {position} lies outside the grid")]
    ObstacleOutOfBounds { index: usize, position: Position },

    #[error("obstacle #{index} has its top-left corner {top_left} past its bottom-right corner {bottom_right}")]
    InvertedObstacle {
        index: usize,
        top_left: Position,
        bottom_right: Position,
    },

    #[error("pedestrian {id} at {position} lies outside the grid")]
    PedestrianOutOfBounds { id: PedestrianId, position: Position },

    #[error("pedestrian {id} has invalid speed {speed}")]
    InvalidSpeed { id: PedestrianId, speed: f64 },

    #[error("pedestrian {id} speed {speed} exceeds the maximum of {max_speed}")]
    SpeedAboveLimit {
        id: PedestrianId,
        speed: f64,
        max_speed: f64,
    },

    #[error("pedestrian {id} starts inside an obstacle at {position}")]
    PedestrianOnObstacle { id: PedestrianId, position: Position },

    #[error("pedestrian {id} starts on the target {position}")]
    PedestrianOnTarget { id: PedestrianId, position: Position },

    #[error("pedestrians {first} and {second} both start at {position}")]
    PedestrianOverlap {
        first: PedestrianId,
        second: PedestrianId,
        position: Position,
    },

    #[error("option `{name}` has invalid value {value}")]
    InvalidOption { name: &'static str, value: f64 },
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;
