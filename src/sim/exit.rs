//! Exit descriptors. Each exit owns its private structure (obstacle) view
//! and static-weight grid exclusively, reused across static-field
//! recalculations rather than reallocated (Design Notes, §9).

use thin_vec::ThinVec;

use super::cell::ObstacleCell;
use super::environment::Environment;
use super::geometry::Coordinate;
use super::grid::Grid;

pub struct Exit {
    pub width: u32,
    pub coordinates: ThinVec<Coordinate>,
    pub is_blocked_by_fire: bool,
    /// A private copy of the global obstacle layout, owned by this exit and
    /// reused by the Varas BFS-relaxation variant.
    pub private_structure_grid: Grid<ObstacleCell>,
    /// Per-exit static weight grid (Varas variant output).
    pub private_static_weight: Grid<f32>,
    /// `false` once the exit has been found to have no accessible axial
    /// approach (see `static_field::is_exit_accessible`).
    pub accessible: bool,
}

impl Exit {
    pub fn new(environment: &Environment, coordinates: ThinVec<Coordinate>) -> Self {
        let rows = environment.rows;
        let columns = environment.columns;

        let mut private_structure_grid = Grid::filled(rows, columns, ObstacleCell::Empty);
        private_structure_grid.copy_from(&environment.obstacle_grid);

        Exit {
            width: coordinates.len() as u32,
            private_static_weight: Grid::filled(rows, columns, 0.0),
            private_structure_grid,
            is_blocked_by_fire: false,
            accessible: true,
            coordinates,
        }
    }

    pub fn contains(&self, at: Coordinate) -> bool {
        self.coordinates.contains(&at)
    }
}
