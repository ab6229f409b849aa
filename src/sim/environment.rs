//! Environment model: the obstacle grid, the exit-cells grid, the
//! pedestrian-position grid, and the visit heatmap. Also the DTO
//! (`EnvironmentDescription`) that [`crate::io::environment_file`] parses the
//! text format into, kept separate from the grids it builds so the core
//! never has to know about file formats.

use thin_vec::ThinVec;

use super::cell::{ExitMarker, ObstacleCell};
use super::error::{SimResult, SimulationError};
use super::geometry::Coordinate;
use super::grid::Grid;

/// Parsed, format-agnostic description of a starting layout: which cells are
/// walls, which are doors, and where static pedestrians start. Produced by
/// `io::environment_file::parse`, consumed by [`Environment::from_description`].
#[derive(Debug, Clone)]
pub struct EnvironmentDescription {
    pub rows: usize,
    pub columns: usize,
    /// `true` where the source marked `#` or `_` (both are walls).
    pub walls: Vec<Vec<bool>>,
    /// `true` where the source marked `_` (a door, i.e. an exit cell).
    pub doors: Vec<Vec<bool>>,
    /// Starting coordinates of statically-placed pedestrians (`p`/`P`).
    pub pedestrian_origins: Vec<Coordinate>,
}

impl EnvironmentDescription {
    pub fn validate(&self) -> SimResult<()> {
        if self.rows == 0 || self.columns == 0 {
            return Err(SimulationError::Configuration(
                "environment must have non-zero rows and columns".into(),
            ));
        }
        if self.walls.len() != self.rows || self.doors.len() != self.rows {
            return Err(SimulationError::Configuration(
                "row count does not match declared L".into(),
            ));
        }
        for row in self.walls.iter().chain(self.doors.iter()) {
            if row.len() != self.columns {
                return Err(SimulationError::Configuration(
                    "row width does not match declared C".into(),
                ));
            }
        }
        Ok(())
    }
}

pub struct Environment {
    pub rows: usize,
    pub columns: usize,
    pub obstacle_grid: Grid<ObstacleCell>,
    pub exits_only_grid: Grid<ExitMarker>,
    pub pedestrian_position_grid: Grid<u32>,
    pub heatmap_grid: Grid<u32>,
}

impl Environment {
    /// Builds the environment grids from a parsed description, and groups
    /// adjacent door cells (4-connectivity flood fill) into exits, returning
    /// one [`super::exit::Exit`]-building coordinate list per group.
    pub fn from_description(
        description: &EnvironmentDescription,
    ) -> SimResult<(Environment, Vec<ThinVec<Coordinate>>)> {
        description.validate()?;

        let rows = description.rows;
        let columns = description.columns;

        let mut obstacle_grid = Grid::filled(rows, columns, ObstacleCell::Empty);
        let mut exits_only_grid = Grid::filled(rows, columns, ExitMarker::Empty);

        for line in 0..rows {
            for column in 0..columns {
                let at = Coordinate::new(line as i32, column as i32);
                if description.walls[line][column] {
                    obstacle_grid.set(at, ObstacleCell::Impassable);
                }
                if description.doors[line][column] {
                    exits_only_grid.set(at, ExitMarker::Exit);
                }
            }
        }

        let exit_groups = group_exit_cells(&exits_only_grid);

        let environment = Environment {
            rows,
            columns,
            obstacle_grid,
            exits_only_grid,
            pedestrian_position_grid: Grid::filled(rows, columns, 0u32),
            heatmap_grid: Grid::filled(rows, columns, 0u32),
        };

        Ok((environment, exit_groups))
    }

    pub fn in_bounds(&self, at: Coordinate) -> bool {
        self.obstacle_grid.in_bounds(at)
    }

    pub fn is_passable(&self, at: Coordinate) -> bool {
        matches!(self.obstacle_grid.get(at), Some(ObstacleCell::Empty))
            || matches!(self.exits_only_grid.get(at), Some(m) if m.is_usable_exit())
    }

    pub fn record_visit(&mut self, at: Coordinate) {
        if let Some(count) = self.heatmap_grid.get_mut(at) {
            *count += 1;
        }
    }
}

/// Groups door cells into connected components (4-connectivity), each
/// becoming one [`super::exit::Exit`]'s coordinate list, in scan order.
fn group_exit_cells(exits_only_grid: &Grid<ExitMarker>) -> Vec<ThinVec<Coordinate>> {
    let rows = exits_only_grid.rows();
    let columns = exits_only_grid.columns();
    let mut visited = Grid::filled(rows, columns, false);
    let mut groups = Vec::new();

    for at in exits_only_grid.iter_coordinates() {
        if !exits_only_grid.get(at).unwrap().is_exit_cell() || *visited.get(at).unwrap() {
            continue;
        }

        let mut group = ThinVec::new();
        let mut stack = vec![at];
        visited.set(at, true);

        while let Some(cur) = stack.pop() {
            group.push(cur);
            for neighbor in cur.axial_neighbors() {
                if exits_only_grid
                    .get(neighbor)
                    .is_some_and(|m| m.is_exit_cell())
                    && !*visited.get(neighbor).unwrap()
                {
                    visited.set(neighbor, true);
                    stack.push(neighbor);
                }
            }
        }

        group.sort();
        groups.push(group);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description(rows: usize, columns: usize) -> EnvironmentDescription {
        EnvironmentDescription {
            rows,
            columns,
            walls: vec![vec![false; columns]; rows],
            doors: vec![vec![false; columns]; rows],
            pedestrian_origins: Vec::new(),
        }
    }

    #[test]
    fn groups_adjacent_door_cells_into_one_exit() {
        let mut description = description(5, 5);
        description.doors[2][3] = true;
        description.doors[2][4] = true;
        description.doors[1][4] = true; // not adjacent to (2,4) diagonally only -> separate unless 4-adjacent
        let (_, groups) = Environment::from_description(&description).unwrap();
        // (2,3)-(2,4) adjacent horizontally, (1,4)-(2,4) adjacent vertically: all one group
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn separate_doors_become_separate_exits() {
        let mut description = description(5, 5);
        description.doors[0][0] = true;
        description.doors[4][4] = true;
        let (_, groups) = Environment::from_description(&description).unwrap();
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn mismatched_row_count_is_configuration_error() {
        let description = EnvironmentDescription {
            rows: 3,
            columns: 3,
            walls: vec![vec![false; 3]; 2],
            doors: vec![vec![false; 3]; 3],
            pedestrian_origins: Vec::new(),
        };
        assert!(matches!(
            Environment::from_description(&description),
            Err(SimulationError::Configuration(_))
        ));
    }
}
