//! Dynamic floor field: a scalar trail density left by moving pedestrians,
//! subject to decay and diffusion.

use super::cell::{FireCell, ObstacleCell};
use super::geometry::Coordinate;
use super::grid::Grid;

pub struct DynamicField {
    pub current: Grid<f32>,
    scratch: Grid<f32>,
}

impl DynamicField {
    pub fn new(rows: usize, columns: usize) -> Self {
        DynamicField {
            current: Grid::filled(rows, columns, 0.0),
            scratch: Grid::filled(rows, columns, 0.0),
        }
    }

    pub fn reset(&mut self) {
        self.current.fill(0.0);
    }

    pub fn deposit(&mut self, at: Coordinate) {
        if let Some(value) = self.current.get_mut(at) {
            *value += 1.0;
        }
    }

    /// Applies one decay+diffusion sweep:
    /// `next[i][j] = (1-a)(1-d)*curr[i][j] + a*(1-d)/4 * sum(axial passable neighbors)`,
    /// then renormalizes to unit sum (unless the total is zero) and swaps the
    /// buffer into `current` (no element-wise copy).
    pub fn decay_and_diffuse(
        &mut self,
        alpha: f32,
        delta: f32,
        obstacle_grid: &Grid<ObstacleCell>,
        fire_grid: &Grid<FireCell>,
    ) {
        self.scratch.fill(0.0);

        let stay = (1.0 - alpha) * (1.0 - delta);
        let spread = alpha * (1.0 - delta) / 4.0;

        for at in self.current.iter_coordinates() {
            let is_blocked = *obstacle_grid.get(at).unwrap() == ObstacleCell::Impassable
                || fire_grid.get(at).copied().unwrap_or_default().is_on_fire();
            if is_blocked {
                continue;
            }

            let mut value = stay * self.current[at];
            for neighbor in at.axial_neighbors() {
                let neighbor_blocked = obstacle_grid
                    .get(neighbor)
                    .map(|c| *c == ObstacleCell::Impassable)
                    .unwrap_or(true)
                    || fire_grid
                        .get(neighbor)
                        .copied()
                        .unwrap_or_default()
                        .is_on_fire();
                if neighbor_blocked {
                    continue;
                }
                value += spread * self.current[neighbor];
            }
            self.scratch.set(at, value);
        }

        self.scratch.normalize();
        self.current.swap(&mut self.scratch);
    }
}
