//! Fire subsystem: propagation, distance-to-fire, risk classification, the
//! fire floor field, and exit-blocking detection.

use super::cell::{ExitMarker, FireCell, ObstacleCell, RiskLevel};
use super::exit::Exit;
use super::geometry::{euclidean_distance, Coordinate};
use super::grid::Grid;

/// Cells within this Euclidean distance of fire are `Danger` (impassable to
/// pedestrians).
const DANGER_DISTANCE: f32 = 1.5;
/// Walls farther than this from any fire cell cannot be `Risky` (the
/// classification radius the spec allows limiting the wall-side scan to).
const RISKY_WALL_SCAN_RADIUS: f32 = 3.0;

pub struct FireField {
    pub fire_grid: Grid<FireCell>,
    staging_grid: Grid<FireCell>,
    pub initial_fire_grid: Grid<FireCell>,
    pub fire_distance_grid: Grid<f32>,
    pub risky_cells_grid: Grid<RiskLevel>,
    pub fire_floor_field: Grid<f32>,
    pub is_present: bool,
}

impl FireField {
    pub fn new(rows: usize, columns: usize, initial_fires: &[Coordinate], is_present: bool) -> Self {
        let mut fire_grid = Grid::filled(rows, columns, FireCell::Empty);
        for &at in initial_fires {
            fire_grid.set(at, FireCell::Fire);
        }
        let initial_fire_grid = fire_grid.clone();

        let mut field = FireField {
            staging_grid: fire_grid.clone(),
            fire_grid,
            initial_fire_grid,
            fire_distance_grid: Grid::filled(rows, columns, f32::MAX),
            risky_cells_grid: Grid::filled(rows, columns, RiskLevel::NonRisky),
            fire_floor_field: Grid::filled(rows, columns, 0.0),
            is_present,
        };
        if is_present {
            field.recompute_distance_and_risk(&Grid::filled(rows, columns, ObstacleCell::Empty));
        }
        field
    }

    /// Number of timesteps between fire-spread events, derived from the
    /// spread-rate parameters; always at least 1.
    pub fn spread_interval(cell_length: f32, spread_rate: f32, timestep_time: f32) -> u64 {
        if spread_rate <= 0.0 || timestep_time <= 0.0 {
            return 1;
        }
        ((cell_length / spread_rate / timestep_time).round() as u64).max(1)
    }

    /// Advances the fire by one Moore-neighborhood ring. Exit cells are never
    /// consumed by fire (they may later be marked `BlockedExit`, never
    /// `Fire`). Swaps the active/staging buffers rather than reallocating.
    pub fn propagate(&mut self, obstacle_grid: &Grid<ObstacleCell>, exits_only_grid: &Grid<ExitMarker>) {
        self.staging_grid.copy_from(&self.fire_grid);

        for at in self.fire_grid.iter_coordinates() {
            if !self.fire_grid.get(at).unwrap().is_on_fire() {
                continue;
            }
            for neighbor in at.moore_neighbors() {
                if !obstacle_grid.in_bounds(neighbor) {
                    continue;
                }
                if *obstacle_grid.get(neighbor).unwrap() == ObstacleCell::Impassable {
                    continue;
                }
                if exits_only_grid.get(neighbor).unwrap().is_exit_cell() {
                    continue;
                }
                self.staging_grid.set(neighbor, FireCell::Fire);
            }
        }

        self.fire_grid.swap(&mut self.staging_grid);
        self.is_present = true;
    }

    pub fn recompute_distance_and_risk(&mut self, obstacle_grid: &Grid<ObstacleCell>) {
        self.compute_distance_grid();
        self.classify_risk(obstacle_grid);
    }

    /// Shortest Euclidean distance from every cell to the nearest fire cell.
    /// Uses the coordinate-set binary-search narrowing retained from the
    /// source (see [`coordinate_sets`]) to bound the inner scan.
    fn compute_distance_grid(&mut self) {
        let fire_coordinates: Vec<Coordinate> = self
            .fire_grid
            .iter_coordinates()
            .filter(|&at| self.fire_grid.get(at).unwrap().is_on_fire())
            .collect();

        if fire_coordinates.is_empty() {
            self.fire_distance_grid.fill(f32::MAX);
            return;
        }

        let sets = coordinate_sets::CoordinateSets::build(&fire_coordinates);

        for at in self.fire_grid.iter_coordinates() {
            if self.fire_grid.get(at).unwrap().is_on_fire() {
                self.fire_distance_grid.set(at, 0.0);
                continue;
            }
            let distance = sets.nearest_distance(at, &fire_coordinates);
            self.fire_distance_grid.set(at, distance);
        }
    }

    /// Every non-fire, non-obstacle cell within 1.5 of fire is `Danger`.
    /// A wall within 1.5 of fire additionally marks its passable neighbors
    /// `Risky`. The wall-side scan is limited to walls within
    /// [`RISKY_WALL_SCAN_RADIUS`] of any fire, since nothing farther out can
    /// ever fall under the 1.5 threshold.
    fn classify_risk(&mut self, obstacle_grid: &Grid<ObstacleCell>) {
        self.risky_cells_grid.fill(RiskLevel::NonRisky);

        for at in self.fire_distance_grid.iter_coordinates() {
            let is_fire = self.fire_grid.get(at).unwrap().is_on_fire();
            let is_obstacle = *obstacle_grid.get(at).unwrap() == ObstacleCell::Impassable;
            let distance = self.fire_distance_grid[at];

            if !is_fire && !is_obstacle && distance < DANGER_DISTANCE {
                self.risky_cells_grid.set(at, RiskLevel::Danger);
            }
        }

        for at in self.fire_distance_grid.iter_coordinates() {
            let is_obstacle = *obstacle_grid.get(at).unwrap() == ObstacleCell::Impassable;
            if !is_obstacle || self.fire_distance_grid[at] > RISKY_WALL_SCAN_RADIUS {
                continue;
            }
            if self.fire_distance_grid[at] >= DANGER_DISTANCE {
                continue;
            }
            for neighbor in at.axial_neighbors() {
                let neighbor_passable = obstacle_grid
                    .get(neighbor)
                    .is_some_and(|c| *c == ObstacleCell::Empty);
                if neighbor_passable && *self.risky_cells_grid.get(neighbor).unwrap() != RiskLevel::Danger {
                    self.risky_cells_grid.set(neighbor, RiskLevel::Risky);
                }
            }
        }
    }

    /// `f[i][j] := 1 / fire_distance` within `fire_gamma` of fire, else 0,
    /// then normalized. All-zero when there is no fire.
    fn compute_floor_field(&mut self, fire_gamma: f32) {
        self.fire_floor_field.fill(0.0);
        if !self.is_present {
            return;
        }

        for at in self.fire_distance_grid.iter_coordinates() {
            let distance = self.fire_distance_grid[at];
            let is_fire = self.fire_grid.get(at).unwrap().is_on_fire();
            if is_fire || distance > fire_gamma || distance == 0.0 {
                continue;
            }
            self.fire_floor_field.set(at, 1.0 / distance);
        }

        self.fire_floor_field.normalize();
    }

    pub fn recompute_floor_field(&mut self, fire_gamma: f32) {
        self.compute_floor_field(fire_gamma);
    }
}

/// An exit is blocked by fire iff every 4-adjacent passable cell of every
/// exit-cell is fire. Returns `true` if this exit newly became blocked.
pub fn check_exit_blocked_by_fire(
    exit: &mut Exit,
    fire_grid: &Grid<FireCell>,
    obstacle_grid: &Grid<ObstacleCell>,
    exits_only_grid: &mut Grid<ExitMarker>,
) -> bool {
    if exit.is_blocked_by_fire {
        return false;
    }

    let mut cell_index = 0;
    let mut any_passable_non_fire_neighbor = false;

    while cell_index < exit.coordinates.len() {
        let at = exit.coordinates[cell_index];
        for neighbor in at.axial_neighbors() {
            let passable = obstacle_grid
                .get(neighbor)
                .is_some_and(|c| *c == ObstacleCell::Empty);
            if !passable {
                continue;
            }
            let on_fire = fire_grid.get(neighbor).copied().unwrap_or_default().is_on_fire();
            if !on_fire {
                any_passable_non_fire_neighbor = true;
            }
        }
        cell_index += 1;
    }

    if any_passable_non_fire_neighbor {
        return false;
    }

    exit.is_blocked_by_fire = true;
    for &at in exit.coordinates.iter() {
        exits_only_grid.set(at, ExitMarker::BlockedExit);
    }
    true
}

/// Source-retained optimization for distance-to-fire: partitions fire
/// coordinates into per-line and per-column sorted sets, so the nearest
/// candidates for a query cell can be narrowed with binary search instead of
/// scanning every fire cell.
pub mod coordinate_sets {
    use super::*;

    pub struct CoordinateSets {
        lines: Vec<i32>,
        columns: Vec<i32>,
    }

    impl CoordinateSets {
        pub fn build(fire_coordinates: &[Coordinate]) -> Self {
            let mut lines: Vec<i32> = fire_coordinates.iter().map(|c| c.line).collect();
            let mut columns: Vec<i32> = fire_coordinates.iter().map(|c| c.column).collect();
            lines.sort_unstable();
            lines.dedup();
            columns.sort_unstable();
            columns.dedup();
            CoordinateSets { lines, columns }
        }

        /// Narrows to at most three adjacent fire lines and three adjacent
        /// fire columns around `at`, then does a direct scan of the fire
        /// cells whose line or column falls in that narrowed band. Falls
        /// back to a full scan if the narrowed band is empty (degenerate
        /// single-line/-column fire layouts).
        pub fn nearest_distance(&self, at: Coordinate, fire_coordinates: &[Coordinate]) -> f32 {
            let near_lines = nearest_three(&self.lines, at.line);
            let near_columns = nearest_three(&self.columns, at.column);

            let mut best = f32::MAX;
            let mut found_candidate = false;

            for &fire_at in fire_coordinates {
                if near_lines.contains(&fire_at.line) || near_columns.contains(&fire_at.column) {
                    found_candidate = true;
                    let d = euclidean_distance(at, fire_at);
                    if d < best {
                        best = d;
                    }
                }
            }

            if found_candidate {
                best
            } else {
                fire_coordinates
                    .iter()
                    .map(|&fire_at| euclidean_distance(at, fire_at))
                    .fold(f32::MAX, f32::min)
            }
        }
    }

    /// Returns up to three values from a sorted, deduplicated slice that are
    /// adjacent to `target` (the values immediately below, at-or-above, and
    /// the next one after), via `partition_point` binary search.
    fn nearest_three(sorted_unique: &[i32], target: i32) -> [i32; 3] {
        let index = sorted_unique.partition_point(|&v| v < target);
        let mut result = [i32::MIN; 3];
        let mut slot = 0;
        if index > 0 {
            result[slot] = sorted_unique[index - 1];
            slot += 1;
        }
        if index < sorted_unique.len() {
            result[slot] = sorted_unique[index];
            slot += 1;
        }
        if index + 1 < sorted_unique.len() {
            result[slot] = sorted_unique[index + 1];
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thin_vec::thin_vec;

    #[test]
    fn propagation_forms_growing_square_s4() {
        let rows = 7;
        let columns = 7;
        let obstacles = Grid::filled(rows, columns, ObstacleCell::Empty);
        let exits = Grid::filled(rows, columns, ExitMarker::Empty);

        let mut fire = FireField::new(rows, columns, &[Coordinate::new(3, 3)], true);

        fire.propagate(&obstacles, &exits);
        for line in 2..=4 {
            for column in 2..=4 {
                assert!(
                    fire.fire_grid.get(Coordinate::new(line, column)).unwrap().is_on_fire(),
                    "expected fire at ({line},{column}) after 1 step"
                );
            }
        }
        assert!(!fire.fire_grid.get(Coordinate::new(1, 3)).unwrap().is_on_fire());

        fire.propagate(&obstacles, &exits);
        for line in 1..=5 {
            for column in 1..=5 {
                assert!(
                    fire.fire_grid.get(Coordinate::new(line, column)).unwrap().is_on_fire(),
                    "expected fire at ({line},{column}) after 2 steps"
                );
            }
        }
        assert!(!fire.fire_grid.get(Coordinate::new(0, 3)).unwrap().is_on_fire());
    }

    #[test]
    fn walls_block_propagation() {
        let rows = 5;
        let columns = 5;
        let mut obstacles = Grid::filled(rows, columns, ObstacleCell::Empty);
        for column in 0..columns {
            obstacles.set(Coordinate::new(2, column as i32), ObstacleCell::Impassable);
        }
        let exits = Grid::filled(rows, columns, ExitMarker::Empty);

        let mut fire = FireField::new(rows, columns, &[Coordinate::new(1, 2)], true);
        for _ in 0..3 {
            fire.propagate(&obstacles, &exits);
        }
        assert!(!fire.fire_grid.get(Coordinate::new(3, 2)).unwrap().is_on_fire());
        assert!(!fire.fire_grid.get(Coordinate::new(4, 2)).unwrap().is_on_fire());
    }

    #[test]
    fn exits_are_never_consumed_by_fire() {
        let rows = 3;
        let columns = 3;
        let obstacles = Grid::filled(rows, columns, ObstacleCell::Empty);
        let mut exits = Grid::filled(rows, columns, ExitMarker::Empty);
        exits.set(Coordinate::new(1, 2), ExitMarker::Exit);

        let mut fire = FireField::new(rows, columns, &[Coordinate::new(1, 1)], true);
        fire.propagate(&obstacles, &exits);
        assert!(!fire.fire_grid.get(Coordinate::new(1, 2)).unwrap().is_on_fire());
    }

    #[test]
    fn distance_is_zero_exactly_on_fire_cells() {
        let rows = 5;
        let columns = 5;
        let mut fire = FireField::new(rows, columns, &[Coordinate::new(2, 2)], true);
        fire.recompute_distance_and_risk(&Grid::filled(rows, columns, ObstacleCell::Empty));
        assert_eq!(fire.fire_distance_grid[Coordinate::new(2, 2)], 0.0);
        assert!(fire.fire_distance_grid[Coordinate::new(0, 0)] > 0.0);
    }

    #[test]
    fn cells_near_fire_are_danger() {
        let rows = 5;
        let columns = 5;
        let mut fire = FireField::new(rows, columns, &[Coordinate::new(2, 2)], true);
        fire.recompute_distance_and_risk(&Grid::filled(rows, columns, ObstacleCell::Empty));
        assert_eq!(
            *fire.risky_cells_grid.get(Coordinate::new(2, 3)).unwrap(),
            RiskLevel::Danger
        );
        assert_eq!(
            *fire.risky_cells_grid.get(Coordinate::new(4, 4)).unwrap(),
            RiskLevel::NonRisky
        );
    }

    #[test]
    fn exit_blocked_when_all_approaches_on_fire() {
        let rows = 3;
        let columns = 3;
        let obstacles = Grid::filled(rows, columns, ObstacleCell::Empty);
        let mut exits_only = Grid::filled(rows, columns, ExitMarker::Empty);
        let exit_at = Coordinate::new(1, 2);
        exits_only.set(exit_at, ExitMarker::Exit);

        let environment = super::super::environment::Environment::from_description(
            &super::super::environment::EnvironmentDescription {
                rows,
                columns,
                walls: vec![vec![false; columns]; rows],
                doors: vec![vec![false; columns]; rows],
                pedestrian_origins: vec![],
            },
        )
        .unwrap()
        .0;
        let mut exit = Exit::new(&environment, thin_vec![exit_at]);

        let mut fire_grid = Grid::filled(rows, columns, FireCell::Empty);
        fire_grid.set(Coordinate::new(1, 1), FireCell::Fire);

        let blocked = check_exit_blocked_by_fire(&mut exit, &fire_grid, &obstacles, &mut exits_only);
        assert!(blocked);
        assert!(exit.is_blocked_by_fire);
        assert_eq!(
            *exits_only.get(exit_at).unwrap(),
            ExitMarker::BlockedExit
        );
    }
}
