//! Pedestrian state machine and the per-timestep transition-probability
//! stencil.

use super::cell::{ExitMarker, FireCell, ObstacleCell, RiskLevel};
use super::geometry::{euclidean_distance, Coordinate, TOLERANCE};
use super::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PedestrianState {
    Moving,
    Stopped,
    Leaving,
    GotOut,
    Dead,
}

impl PedestrianState {
    pub fn is_live(self) -> bool {
        !matches!(self, PedestrianState::GotOut | PedestrianState::Dead)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PedestrianState::GotOut | PedestrianState::Dead)
    }
}

#[derive(Debug, Clone)]
pub struct Pedestrian {
    pub id: u32,
    pub state: PedestrianState,
    pub origin: Coordinate,
    pub previous: Coordinate,
    pub current: Coordinate,
    pub target: Coordinate,
    /// Indexed `[d_line + 1][d_column + 1]`; only the center and the four
    /// axial entries are ever populated, diagonals stay at 0 (Von Neumann
    /// movement only).
    pub probabilities: [[f32; 3]; 3],
}

impl Pedestrian {
    pub fn new(id: u32, origin: Coordinate) -> Self {
        Pedestrian {
            id,
            state: PedestrianState::Moving,
            origin,
            previous: origin,
            current: origin,
            target: origin,
            probabilities: [[0.0; 3]; 3],
        }
    }

    pub fn reset_to_origin(&mut self) {
        self.state = PedestrianState::Moving;
        self.previous = self.origin;
        self.current = self.origin;
        self.target = self.origin;
        self.probabilities = [[0.0; 3]; 3];
    }

    fn has_moved_last_step(&self) -> bool {
        self.previous != self.current
    }
}

/// Sensitivities and flags needed to build the transition-probability
/// stencil; a slice of [`crate::config::SimulationConfig`].
#[derive(Debug, Clone, Copy)]
pub struct TransitionParams {
    pub k_static: f32,
    pub k_dynamic: f32,
    pub k_fire: f32,
    pub risk_distance: f32,
    pub fire_alpha: f32,
    pub inertia: f32,
    /// When set, a pedestrian's own most recent cell contributes nothing to
    /// its own dynamic-field attraction (it shouldn't chase its own trace).
    pub ignore_latest_self_trace: bool,
}

/// The five Von Neumann stencil offsets, center first: this is also the
/// fixed scan order [`draw_target`] walks.
const STENCIL_OFFSETS: [(i32, i32); 5] = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)];

#[allow(clippy::too_many_arguments)]
pub fn compute_transition_probabilities(
    pedestrian: &mut Pedestrian,
    params: &TransitionParams,
    obstacle_grid: &Grid<ObstacleCell>,
    exits_only_grid: &Grid<ExitMarker>,
    fire_grid: &Grid<FireCell>,
    risky_cells_grid: &Grid<RiskLevel>,
    static_floor_field: &Grid<f32>,
    dynamic_floor_field: &Grid<f32>,
    fire_floor_field: &Grid<f32>,
    pedestrian_position_grid: &Grid<u32>,
) {
    pedestrian.probabilities = [[0.0; 3]; 3];

    let use_auxiliary_field =
        vision_is_obstructed_by_fire(pedestrian.current, exits_only_grid, obstacle_grid, fire_grid);

    let mut total = 0.0f32;
    let inertia_offset = if pedestrian.has_moved_last_step() {
        Some((
            pedestrian.current.line - pedestrian.previous.line,
            pedestrian.current.column - pedestrian.previous.column,
        ))
    } else {
        None
    };

    for &(d_line, d_column) in STENCIL_OFFSETS.iter() {
        let candidate = pedestrian.current.offset(d_line, d_column);
        let row = (d_line + 1) as usize;
        let col = (d_column + 1) as usize;

        let mut value = cell_probability_weight(
            candidate,
            params,
            obstacle_grid,
            exits_only_grid,
            fire_grid,
            risky_cells_grid,
            static_floor_field,
            dynamic_floor_field,
            fire_floor_field,
            use_auxiliary_field,
        );

        if d_line != 0 || d_column != 0 {
            // occupied-by-another-pedestrian rule never applies to the center cell
            if let Some(occupant) = pedestrian_position_grid.get(candidate) {
                if *occupant != 0 && *occupant != pedestrian.id {
                    value = 0.0;
                }
            }
        }

        if params.ignore_latest_self_trace && candidate == pedestrian.previous && value > 0.0 {
            let dynamic_contribution = (params.k_dynamic * dynamic_floor_field[candidate]).exp();
            if dynamic_contribution > 0.0 {
                value /= dynamic_contribution;
            }
        }

        if inertia_offset == Some((d_line, d_column)) {
            value *= params.inertia;
        }

        pedestrian.probabilities[row][col] = value;
        total += value;
    }

    if total > 0.0 {
        for &(d_line, d_column) in STENCIL_OFFSETS.iter() {
            let row = (d_line + 1) as usize;
            let col = (d_column + 1) as usize;
            pedestrian.probabilities[row][col] /= total;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cell_probability_weight(
    candidate: Coordinate,
    params: &TransitionParams,
    obstacle_grid: &Grid<ObstacleCell>,
    exits_only_grid: &Grid<ExitMarker>,
    fire_grid: &Grid<FireCell>,
    risky_cells_grid: &Grid<RiskLevel>,
    static_floor_field: &Grid<f32>,
    dynamic_floor_field: &Grid<f32>,
    fire_floor_field: &Grid<f32>,
    use_auxiliary_field: bool,
) -> f32 {
    if !obstacle_grid.in_bounds(candidate) {
        return 0.0;
    }
    let is_usable_exit = exits_only_grid.get(candidate).unwrap().is_usable_exit();
    if *obstacle_grid.get(candidate).unwrap() == ObstacleCell::Impassable && !is_usable_exit {
        return 0.0;
    }
    if fire_grid.get(candidate).copied().unwrap_or_default().is_on_fire() {
        return 0.0;
    }
    let risk = *risky_cells_grid.get(candidate).unwrap_or(&RiskLevel::NonRisky);
    if risk.is_danger() {
        return 0.0;
    }

    let static_value = if use_auxiliary_field {
        visible_exit_static_value(candidate, exits_only_grid, obstacle_grid, fire_grid)
    } else {
        static_floor_field[candidate]
    };

    let mut weight = (params.k_static * static_value).exp();
    weight *= (params.k_dynamic * dynamic_floor_field[candidate]).exp();

    let within_risk_distance = nearest_exit_within(candidate, exits_only_grid, params.risk_distance);
    let fire_alpha = if risk == RiskLevel::NonRisky && within_risk_distance {
        params.fire_alpha
    } else {
        1.0
    };
    weight /= (params.k_fire * fire_alpha * fire_floor_field[candidate]).exp();

    weight
}

fn nearest_exit_within(at: Coordinate, exits_only_grid: &Grid<ExitMarker>, distance: f32) -> bool {
    exits_only_grid.iter_coordinates().any(|exit_at| {
        exits_only_grid.get(exit_at).unwrap().is_usable_exit()
            && euclidean_distance(at, exit_at) <= distance
    })
}

/// `true` if at least one non-blocked exit cell's line of sight from `at` is
/// obstructed by a fire cell lying strictly between them.
fn vision_is_obstructed_by_fire(
    at: Coordinate,
    exits_only_grid: &Grid<ExitMarker>,
    obstacle_grid: &Grid<ObstacleCell>,
    fire_grid: &Grid<FireCell>,
) -> bool {
    if !fire_grid.iter_coordinates().any(|c| fire_grid.get(c).unwrap().is_on_fire()) {
        return false;
    }
    exits_only_grid.iter_coordinates().any(|exit_at| {
        exits_only_grid.get(exit_at).unwrap().is_usable_exit()
            && !has_line_of_sight(at, exit_at, obstacle_grid, fire_grid)
    })
}

/// Distance-based value (as in the Zheng static field) to the nearest exit
/// cell still visible from `at`, ignoring exits whose view is fire-blocked.
fn visible_exit_static_value(
    at: Coordinate,
    exits_only_grid: &Grid<ExitMarker>,
    obstacle_grid: &Grid<ObstacleCell>,
    fire_grid: &Grid<FireCell>,
) -> f32 {
    let distance = exits_only_grid
        .iter_coordinates()
        .filter(|&exit_at| {
            exits_only_grid.get(exit_at).unwrap().is_usable_exit()
                && has_line_of_sight(at, exit_at, obstacle_grid, fire_grid)
        })
        .map(|exit_at| euclidean_distance(at, exit_at))
        .fold(f32::MAX, f32::min);

    if distance == f32::MAX {
        0.0
    } else {
        1.0 / (distance + 1.0)
    }
}

/// Bresenham line-of-sight test: `false` if a fire cell lies strictly
/// between `from` and `to`.
pub fn has_line_of_sight(
    from: Coordinate,
    to: Coordinate,
    _obstacle_grid: &Grid<ObstacleCell>,
    fire_grid: &Grid<FireCell>,
) -> bool {
    for cell in bresenham_line(from, to).into_iter() {
        if cell == from || cell == to {
            continue;
        }
        if fire_grid.get(cell).copied().unwrap_or_default().is_on_fire() {
            return false;
        }
    }
    true
}

fn bresenham_line(from: Coordinate, to: Coordinate) -> Vec<Coordinate> {
    let mut points = Vec::new();
    let (mut x0, mut y0) = (from.column, from.line);
    let (x1, y1) = (to.column, to.line);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        points.push(Coordinate::new(y0, x0));
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }

    points
}

/// Draws `u` from `rng` and walks the stencil in the fixed scan order,
/// returning the first cell whose cumulative mass reaches `u`. Falls back to
/// the center cell on rounding exhaustion, and returns `None` (stay in
/// place) if every entry is zero.
pub fn draw_target(pedestrian: &Pedestrian, rng: &mut fastrand::Rng) -> Option<Coordinate> {
    let total: f32 = STENCIL_OFFSETS
        .iter()
        .map(|&(dl, dc)| pedestrian.probabilities[(dl + 1) as usize][(dc + 1) as usize])
        .sum();

    if total <= 0.0 {
        return None;
    }

    let u = rng.f32();
    let mut acc = 0.0f32;
    for &(d_line, d_column) in STENCIL_OFFSETS.iter() {
        let mass = pedestrian.probabilities[(d_line + 1) as usize][(d_column + 1) as usize];
        acc += mass;
        if acc >= u + TOLERANCE {
            return Some(pedestrian.current.offset(d_line, d_column));
        }
    }

    Some(pedestrian.current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::cell::ExitMarker;

    fn params() -> TransitionParams {
        TransitionParams {
            k_static: 1.0,
            k_dynamic: 0.0,
            k_fire: 0.0,
            risk_distance: 3.0,
            fire_alpha: 1.0,
            inertia: 2.0,
            ignore_latest_self_trace: false,
        }
    }

    #[test]
    fn stencil_sums_to_one_when_any_cell_is_open() {
        let rows = 5;
        let columns = 5;
        let obstacles = Grid::filled(rows, columns, ObstacleCell::Empty);
        let exits = Grid::filled(rows, columns, ExitMarker::Empty);
        let fire = Grid::filled(rows, columns, FireCell::Empty);
        let risk = Grid::filled(rows, columns, RiskLevel::NonRisky);
        let static_field = Grid::filled(rows, columns, 1.0f32);
        let dynamic_field = Grid::filled(rows, columns, 0.0f32);
        let fire_field = Grid::filled(rows, columns, 0.0f32);
        let positions = Grid::filled(rows, columns, 0u32);

        let mut ped = Pedestrian::new(1, Coordinate::new(2, 2));
        compute_transition_probabilities(
            &mut ped,
            &params(),
            &obstacles,
            &exits,
            &fire,
            &risk,
            &static_field,
            &dynamic_field,
            &fire_field,
            &positions,
        );

        let total: f32 = STENCIL_OFFSETS
            .iter()
            .map(|&(dl, dc)| ped.probabilities[(dl + 1) as usize][(dc + 1) as usize])
            .sum();
        assert_float_eq::assert_float_absolute_eq!(total, 1.0, 1e-5);
    }

    #[test]
    fn cornered_pedestrian_has_all_zero_stencil_and_stays() {
        let rows = 3;
        let columns = 3;
        let mut obstacles = Grid::filled(rows, columns, ObstacleCell::Empty);
        let center = Coordinate::new(1, 1);
        for n in center.axial_neighbors() {
            obstacles.set(n, ObstacleCell::Impassable);
        }
        let exits = Grid::filled(rows, columns, ExitMarker::Empty);
        let fire = Grid::filled(rows, columns, FireCell::Empty);
        let risk = Grid::filled(rows, columns, RiskLevel::NonRisky);
        let static_field = Grid::filled(rows, columns, 1.0f32);
        let dynamic_field = Grid::filled(rows, columns, 0.0f32);
        let fire_field = Grid::filled(rows, columns, 0.0f32);
        let positions = Grid::filled(rows, columns, 0u32);

        let mut ped = Pedestrian::new(1, center);
        compute_transition_probabilities(
            &mut ped,
            &params(),
            &obstacles,
            &exits,
            &fire,
            &risk,
            &static_field,
            &dynamic_field,
            &fire_field,
            &positions,
        );

        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(draw_target(&ped, &mut rng), None);
    }

    #[test]
    fn inertia_biases_continuation_s6() {
        // single-row grid: north/south neighbors of (0, 2) are out of bounds,
        // so only center/west/east can contribute. Center is forced to ~0 by
        // an extreme static value, leaving a clean west/east comparison where
        // the pedestrian moved east last step.
        let rows = 1;
        let columns = 5;
        let obstacles = Grid::filled(rows, columns, ObstacleCell::Empty);
        let exits = Grid::filled(rows, columns, ExitMarker::Empty);
        let fire = Grid::filled(rows, columns, FireCell::Empty);
        let risk = Grid::filled(rows, columns, RiskLevel::NonRisky);
        let mut static_field = Grid::filled(rows, columns, 0.0f32);
        static_field.set(Coordinate::new(0, 1), 0.5);
        static_field.set(Coordinate::new(0, 2), -1000.0);
        static_field.set(Coordinate::new(0, 3), 0.5);
        let dynamic_field = Grid::filled(rows, columns, 0.0f32);
        let fire_field = Grid::filled(rows, columns, 0.0f32);
        let positions = Grid::filled(rows, columns, 0u32);

        let mut ped = Pedestrian::new(1, Coordinate::new(0, 2));
        ped.previous = Coordinate::new(0, 1);
        ped.current = Coordinate::new(0, 2);

        compute_transition_probabilities(
            &mut ped,
            &params(),
            &obstacles,
            &exits,
            &fire,
            &risk,
            &static_field,
            &dynamic_field,
            &fire_field,
            &positions,
        );

        let east = ped.probabilities[1][2]; // (0, +1)
        assert_float_eq::assert_float_absolute_eq!(east, 2.0 / 3.0, 1e-4);
    }
}
