use std::{fmt, mem};

use ndarray::{s, Array2};
use serde::Serialize;

use crate::{
    error::{ScenarioError, ScenarioResult},
    scenario::Scenario,
    util::Position,
    SimulatorOptions,
};

/// RGB color of a cell or a pedestrian track.
pub type Color = [u8; 3];

pub const WHITE: Color = [200, 200, 200];
pub const BLACK: Color = [0, 0, 0];
pub const RED: Color = [205, 55, 0];
pub const YELLOW: Color = [205, 205, 0];

/// Index of a pedestrian in the grid's pedestrian registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PedestrianId(pub u32);

impl PedestrianId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PedestrianId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of a single cell.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    #[default]
    Empty,
    Pedestrian,
    Obstacle,
    Target,
    /// Left behind by a pedestrian, tagged with its track color.
    Visited(Color),
}

impl CellState {
    /// Display color of the state.
    pub fn color(&self) -> Color {
        match self {
            CellState::Empty => WHITE,
            CellState::Pedestrian => RED,
            CellState::Obstacle => BLACK,
            CellState::Target => YELLOW,
            CellState::Visited(color) => *color,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            CellState::Empty => '.',
            CellState::Pedestrian => 'P',
            CellState::Obstacle => '#',
            CellState::Target => 'T',
            CellState::Visited(_) => '*',
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    position: Position,
    state: CellState,
    accessible: bool,
}

impl Cell {
    fn new(position: Position) -> Self {
        Cell {
            position,
            state: CellState::Empty,
            accessible: true,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn state(&self) -> CellState {
        self.state
    }

    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    pub fn color(&self) -> Color {
        self.state.color()
    }

    fn set_state(&mut self, state: CellState) {
        self.state = state;
        self.accessible = state != CellState::Obstacle;
    }
}

/// Pedestrian instance
#[derive(Debug, Clone)]
pub struct Pedestrian {
    pub id: PedestrianId,
    pub position: Position,
    /// Divides step costs to obtain travel time.
    pub speed: f64,
    pub track_color: Color,
    pub arrived: bool,
    pub stuck: bool,
}

impl Pedestrian {
    pub fn is_terminal(&self) -> bool {
        self.arrived || self.stuck
    }
}

#[derive(Debug, Clone)]
pub struct Target {
    pub position: Position,
    /// Pedestrians absorbed by the target, in arrival order.
    pub arrivals: Vec<PedestrianId>,
}

/// Cellular grid holding cell states, pedestrians and the target.
pub struct Grid {
    shape: (usize, usize),
    cells: Array2<Cell>,
    pedestrians: Vec<Pedestrian>,
    target: Target,
}

impl Grid {
    /// Build the grid from a scenario, rejecting any out-of-bounds or overlapping placement.
    pub fn new(scenario: &Scenario, options: &SimulatorOptions) -> ScenarioResult<Self> {
        options.validate()?;

        let (rows, cols) = (scenario.grid.rows, scenario.grid.cols);
        if rows == 0 || cols == 0 {
            return Err(ScenarioError::EmptyGrid { rows, cols });
        }
        // positions are i32 and the cell buffer must fit in isize bytes
        let bytes = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(mem::size_of::<Cell>()));
        if rows > i32::MAX as usize
            || cols > i32::MAX as usize
            || bytes.map_or(true, |b| b > isize::MAX as usize)
        {
            return Err(ScenarioError::GridTooLarge { rows, cols });
        }
        let shape = (rows, cols);
        let mut cells = Array2::from_shape_fn(shape, |ix| Cell::new(Position::from(ix)));

        let target = scenario.grid.target;
        if !target.within(shape) {
            return Err(ScenarioError::TargetOutOfBounds(target));
        }

        for (index, obstacle) in scenario.obstacles.iter().enumerate() {
            let (top_left, bottom_right) = (obstacle.top_left, obstacle.bottom_right);
            for position in [top_left, bottom_right] {
                if !position.within(shape) {
                    return Err(ScenarioError::ObstacleOutOfBounds { index, position });
                }
            }
            if top_left.row > bottom_right.row || top_left.col > bottom_right.col {
                return Err(ScenarioError::InvertedObstacle {
                    index,
                    top_left,
                    bottom_right,
                });
            }

            cells
                .slice_mut(s![
                    top_left.row..=bottom_right.row,
                    top_left.col..=bottom_right.col
                ])
                .map_inplace(|cell| cell.set_state(CellState::Obstacle));
        }

        if cells[target].state == CellState::Obstacle {
            return Err(ScenarioError::TargetBlocked(target));
        }
        cells[target].set_state(CellState::Target);

        let mut rng = fastrand::Rng::with_seed(options.seed);
        let mut owners = Array2::<Option<PedestrianId>>::from_elem(shape, None);
        let mut pedestrians = Vec::with_capacity(scenario.pedestrians.len());

        for (i, config) in scenario.pedestrians.iter().enumerate() {
            let id = PedestrianId(i as u32);
            let position = config.position;

            if !position.within(shape) {
                return Err(ScenarioError::PedestrianOutOfBounds { id, position });
            }
            if !(config.speed.is_finite() && config.speed > 0.0) {
                return Err(ScenarioError::InvalidSpeed {
                    id,
                    speed: config.speed,
                });
            }
            if config.speed > options.max_speed {
                return Err(ScenarioError::SpeedAboveLimit {
                    id,
                    speed: config.speed,
                    max_speed: options.max_speed,
                });
            }
            match cells[position].state {
                CellState::Obstacle => {
                    return Err(ScenarioError::PedestrianOnObstacle { id, position })
                }
                CellState::Target => {
                    return Err(ScenarioError::PedestrianOnTarget { id, position })
                }
                _ => {}
            }
            if let Some(first) = owners[position] {
                return Err(ScenarioError::PedestrianOverlap {
                    first,
                    second: id,
                    position,
                });
            }

            owners[position] = Some(id);
            cells[position].set_state(CellState::Pedestrian);
            pedestrians.push(Pedestrian {
                id,
                position,
                speed: config.speed,
                track_color: [rng.u8(..), rng.u8(..), rng.u8(..)],
                arrived: false,
                stuck: false,
            });
        }

        Ok(Grid {
            shape,
            cells,
            pedestrians,
            target: Target {
                position: target,
                arrivals: Vec::new(),
            },
        })
    }

    /// Shape of the grid (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn cells(&self) -> &Array2<Cell> {
        &self.cells
    }

    pub fn cell(&self, position: Position) -> Option<&Cell> {
        self.cells.get(position)
    }

    pub fn state(&self, position: Position) -> Option<CellState> {
        self.cell(position).map(Cell::state)
    }

    pub fn is_obstacle(&self, position: Position) -> bool {
        self.cell(position).is_some_and(|cell| !cell.is_accessible())
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn pedestrians(&self) -> &[Pedestrian] {
        &self.pedestrians
    }

    pub fn pedestrian(&self, id: PedestrianId) -> Option<&Pedestrian> {
        self.pedestrians.get(id.index())
    }

    pub fn active_count(&self) -> usize {
        self.pedestrians.iter().filter(|p| !p.is_terminal()).count()
    }

    pub(crate) fn pedestrian_mut(&mut self, id: PedestrianId) -> Option<&mut Pedestrian> {
        self.pedestrians.get_mut(id.index())
    }

    pub(crate) fn set_state(&mut self, position: Position, state: CellState) {
        if let Some(cell) = self.cells.get_mut(position) {
            cell.set_state(state);
        }
    }

    pub(crate) fn record_arrival(&mut self, id: PedestrianId) {
        self.target.arrivals.push(id);
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("shape", &self.shape)
            .field("target", &self.target)
            .field("pedestrians", &self.pedestrians.len())
            .finish()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.rows() {
            let line: String = row.iter().map(|cell| cell.state.symbol()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
