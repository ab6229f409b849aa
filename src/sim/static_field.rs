//! Static (geometric) floor field. Two variants, selected per run by
//! `config.static_field_variant`:
//!
//! - [`compute_zheng`]: direct Euclidean distance to the nearest usable exit
//!   cell, turned into an attraction value `1 / (d + 1)`.
//! - [`compute_varas_for_exit`]: per-exit BFS-relaxation (Dijkstra over a
//!   grid graph, mirroring the teacher's fast-marching `apply_fmm` in
//!   `environment.rs`), producing one private static-weight grid per exit.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::cell::{ExitMarker, FireCell, ObstacleCell};
use super::exit::Exit;
use super::geometry::{euclidean_distance, not_nan, Coordinate};
use super::grid::{is_diagonal_passable, Grid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticFieldVariant {
    Zheng,
    Varas,
}

/// Distance-based global static field ("Zheng"). Obstacles, fire cells and
/// blocked exits contribute zero; every other cell gets `1 / (d + 1)` where
/// `d` is its Euclidean distance to the nearest usable exit cell. The result
/// is normalized to a distribution.
pub fn compute_zheng(
    obstacle_grid: &Grid<ObstacleCell>,
    exits_only_grid: &Grid<ExitMarker>,
    fire_grid: &Grid<FireCell>,
) -> Grid<f32> {
    let rows = obstacle_grid.rows();
    let columns = obstacle_grid.columns();

    let exit_cells: Vec<Coordinate> = exits_only_grid
        .iter_coordinates()
        .filter(|&at| exits_only_grid.get(at).unwrap().is_usable_exit())
        .collect();

    let mut field = Grid::filled(rows, columns, 0.0f32);

    for at in obstacle_grid.iter_coordinates() {
        let is_usable_exit = exits_only_grid.get(at).unwrap().is_usable_exit();
        let is_impassable =
            *obstacle_grid.get(at).unwrap() == ObstacleCell::Impassable && !is_usable_exit;
        let is_fire = fire_grid.get(at).copied().unwrap_or_default().is_on_fire();
        let is_blocked_exit = *exits_only_grid.get(at).unwrap() == ExitMarker::BlockedExit;

        if is_impassable || is_fire || is_blocked_exit || exit_cells.is_empty() {
            continue;
        }

        let distance = exit_cells
            .iter()
            .map(|&exit_at| not_nan(euclidean_distance(at, exit_at)))
            .min()
            .map(|d| d.into_inner())
            .unwrap_or(f32::MAX);

        field.set(at, 1.0 / (distance + 1.0));
    }

    field.normalize();
    field
}

/// An exit is accessible iff at least one of its cells has a 4-neighbor that
/// is neither `Impassable` nor another exit cell (axial-only, per the
/// Open Questions resolution).
pub fn is_exit_accessible(
    exit: &Exit,
    obstacle_grid: &Grid<ObstacleCell>,
    exits_only_grid: &Grid<ExitMarker>,
) -> bool {
    exit.coordinates.iter().any(|&at| {
        at.axial_neighbors().into_iter().any(|neighbor| {
            let passable_obstacle = obstacle_grid
                .get(neighbor)
                .is_some_and(|c| *c == ObstacleCell::Empty);
            let not_exit = exits_only_grid
                .get(neighbor)
                .is_some_and(|m| !m.is_exit_cell());
            passable_obstacle && not_exit
        })
    })
}

/// BFS-relaxation static field for one exit ("Varas"). Returns `false` and
/// leaves the exit's weight grid untouched if the exit is inaccessible.
pub fn compute_varas_for_exit(
    exit: &mut Exit,
    obstacle_grid: &Grid<ObstacleCell>,
    exits_only_grid: &Grid<ExitMarker>,
    diagonal_cost: f32,
    prevent_corner_crossing: bool,
) -> bool {
    if !is_exit_accessible(exit, obstacle_grid, exits_only_grid) {
        exit.accessible = false;
        return false;
    }
    exit.accessible = true;

    exit.private_structure_grid.copy_from(obstacle_grid);
    exit.private_static_weight.fill(0.0);

    let mut queue = BinaryHeap::<(Reverse<ordered_float::NotNan<f32>>, Coordinate)>::new();

    for &at in exit.coordinates.iter() {
        exit.private_static_weight.set(at, 0.0);
        queue.push((Reverse(not_nan(0.0)), at));
    }

    while let Some((Reverse(dist), at)) = queue.pop() {
        let dist = dist.into_inner();
        let is_seed = exit.coordinates.contains(&at);
        if !is_seed && dist > exit.private_static_weight[at] {
            // stale entry superseded by a cheaper relaxation already processed
            continue;
        }

        for (d_line, d_column) in [(-1, 0), (1, 0), (0, -1), (0, 1), (-1, -1), (-1, 1), (1, -1), (1, 1)] {
            let neighbor = at.offset(d_line, d_column);
            if !obstacle_grid.in_bounds(neighbor) {
                continue;
            }
            if *obstacle_grid.get(neighbor).unwrap() == ObstacleCell::Impassable {
                continue;
            }

            let is_diagonal = d_line != 0 && d_column != 0;
            if is_diagonal
                && !is_diagonal_passable(
                    obstacle_grid,
                    at,
                    d_line,
                    d_column,
                    prevent_corner_crossing,
                )
            {
                continue;
            }

            if exit.coordinates.contains(&neighbor) {
                continue;
            }

            let step = if is_diagonal { diagonal_cost } else { 1.0 };
            let candidate = dist + step;
            let current = exit.private_static_weight[neighbor];

            if current == 0.0 || candidate < current {
                exit.private_static_weight.set(neighbor, candidate);
                queue.push((Reverse(not_nan(candidate)), neighbor));
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use thin_vec::thin_vec;

    fn open_environment(rows: usize, columns: usize) -> (Grid<ObstacleCell>, Grid<ExitMarker>) {
        (
            Grid::filled(rows, columns, ObstacleCell::Empty),
            Grid::filled(rows, columns, ExitMarker::Empty),
        )
    }

    #[test]
    fn zheng_field_is_positive_and_decreasing_with_distance() {
        let (mut obstacles, mut exits) = open_environment(5, 5);
        exits.set(Coordinate::new(2, 4), ExitMarker::Exit);
        let fire = Grid::filled(5, 5, FireCell::Empty);
        let _ = &mut obstacles;

        let field = compute_zheng(&obstacles, &exits, &fire);

        let near = field[Coordinate::new(2, 3)];
        let far = field[Coordinate::new(2, 0)];
        assert!(near > far, "near={near} far={far}");
        assert!(near > 0.0);
    }

    #[test]
    fn zheng_normalizes_to_unit_sum() {
        let (obstacles, mut exits) = open_environment(4, 4);
        exits.set(Coordinate::new(0, 0), ExitMarker::Exit);
        let fire = Grid::filled(4, 4, FireCell::Empty);
        let field = compute_zheng(&obstacles, &exits, &fire);
        assert_float_eq::assert_float_absolute_eq!(field.sum(), 1.0, 1e-5);
    }

    #[test]
    fn exit_inaccessible_when_walled_in() {
        let (mut obstacles, mut exits) = open_environment(3, 3);
        exits.set(Coordinate::new(1, 1), ExitMarker::Exit);
        for neighbor in Coordinate::new(1, 1).axial_neighbors() {
            obstacles.set(neighbor, ObstacleCell::Impassable);
        }
        let exit = Exit::new(
            &super::super::environment::Environment::from_description(
                &super::super::environment::EnvironmentDescription {
                    rows: 3,
                    columns: 3,
                    walls: vec![vec![false; 3]; 3],
                    doors: vec![vec![false; 3]; 3],
                    pedestrian_origins: vec![],
                },
            )
            .unwrap()
            .0,
            thin_vec![Coordinate::new(1, 1)],
        );
        assert!(!is_exit_accessible(&exit, &obstacles, &exits));
    }

    #[test]
    fn varas_distance_increases_with_hops_from_exit() {
        let (obstacles, mut exits) = open_environment(5, 5);
        let exit_at = Coordinate::new(2, 4);
        exits.set(exit_at, ExitMarker::Exit);

        let environment = super::super::environment::Environment::from_description(
            &super::super::environment::EnvironmentDescription {
                rows: 5,
                columns: 5,
                walls: vec![vec![false; 5]; 5],
                doors: vec![vec![false; 5]; 5],
                pedestrian_origins: vec![],
            },
        )
        .unwrap()
        .0;
        let mut exit = Exit::new(&environment, thin_vec![exit_at]);

        let accessible = compute_varas_for_exit(&mut exit, &obstacles, &exits, 1.5, false);
        assert!(accessible);

        let near = exit.private_static_weight[Coordinate::new(2, 3)];
        let far = exit.private_static_weight[Coordinate::new(2, 0)];
        assert!(near < far, "near={near} far={far}");
        assert_float_eq::assert_float_absolute_eq!(near, 1.0, 1e-5);
    }
}
