//! Per-timestep grid rendering, evacuation-time counts, mean-visit
//! heatmaps, and JSON diagnostic export.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use crate::sim::cell::{ExitMarker, ObstacleCell};
use crate::sim::diagnostic::DiagnosticLog;
use crate::sim::fire::FireField;
use crate::sim::geometry::Coordinate;
use crate::sim::simulation::Simulation;

/// Renders the current state of one simulation as a text grid: `#` wall,
/// `_` open exit, `x` fire-blocked exit, `*` fire, `P` a live pedestrian,
/// `.` empty floor. Fire takes precedence over a pedestrian standing on it
/// (that pedestrian is already `Dead`).
pub fn render_grid(simulation: &Simulation) -> String {
    render_grid_parts(
        simulation.environment.rows,
        simulation.environment.columns,
        |at| *simulation.environment.obstacle_grid.get(at).unwrap(),
        |at| *simulation.environment.exits_only_grid.get(at).unwrap(),
        |at| simulation.fire.fire_grid.get(at).copied().unwrap_or_default().is_on_fire(),
        |at| simulation.environment.pedestrian_position_grid.get(at).copied().unwrap_or(0) != 0,
    )
}

fn render_grid_parts(
    rows: usize,
    columns: usize,
    obstacle_at: impl Fn(Coordinate) -> ObstacleCell,
    exit_at: impl Fn(Coordinate) -> ExitMarker,
    fire_at: impl Fn(Coordinate) -> bool,
    pedestrian_at: impl Fn(Coordinate) -> bool,
) -> String {
    let mut output = String::with_capacity(rows * (columns + 1));
    for line in 0..rows {
        for column in 0..columns {
            let at = Coordinate::new(line as i32, column as i32);
            let ch = if fire_at(at) {
                '*'
            } else if pedestrian_at(at) {
                'P'
            } else {
                match exit_at(at) {
                    ExitMarker::Exit => '_',
                    ExitMarker::BlockedExit => 'x',
                    ExitMarker::Empty => {
                        if obstacle_at(at) == ObstacleCell::Impassable {
                            '#'
                        } else {
                            '.'
                        }
                    }
                }
            };
            output.push(ch);
        }
        output.push('\n');
    }
    output
}

/// `count[i][j] / num_runs`, formatted one row per line, values
/// space-separated with two decimal places.
pub fn render_mean_heatmap(simulation: &Simulation, num_runs: u32) -> String {
    let rows = simulation.environment.rows;
    let columns = simulation.environment.columns;
    let divisor = (num_runs.max(1)) as f32;

    let mut output = String::new();
    for line in 0..rows {
        for column in 0..columns {
            let at = Coordinate::new(line as i32, column as i32);
            let visits = simulation.environment.heatmap_grid.get(at).copied().unwrap_or(0);
            let _ = write!(output, "{:.2} ", visits as f32 / divisor);
        }
        output.push('\n');
    }
    output
}

/// Renders the fire-distance grid (debugging / diagnostics aid), `inf` for
/// cells with no reachable fire.
pub fn render_fire_distance(fire: &FireField) -> String {
    let mut output = String::new();
    for at in fire.fire_distance_grid.iter_coordinates() {
        if fire.fire_distance_grid[at] == f32::MAX {
            output.push_str("inf ");
        } else {
            let _ = write!(output, "{:.2} ", fire.fire_distance_grid[at]);
        }
        if at.column as usize == fire.fire_distance_grid.columns() - 1 {
            output.push('\n');
        }
    }
    output
}

pub fn write_diagnostic_json(path: impl AsRef<Path>, log: &DiagnosticLog) -> Result<()> {
    let steps = log.chronological();
    let file = std::fs::File::create(path.as_ref())
        .with_context(|| format!("creating diagnostic log file {}", path.as_ref().display()))?;
    serde_json::to_writer_pretty(file, &steps).context("serializing diagnostic log")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::cell::{ExitMarker, ObstacleCell};

    #[test]
    fn renders_walls_exits_and_pedestrians() {
        let text = render_grid_parts(
            2,
            3,
            |at| {
                if at == Coordinate::new(0, 0) {
                    ObstacleCell::Impassable
                } else {
                    ObstacleCell::Empty
                }
            },
            |at| {
                if at == Coordinate::new(1, 2) {
                    ExitMarker::Exit
                } else {
                    ExitMarker::Empty
                }
            },
            |_| false,
            |at| at == Coordinate::new(0, 1),
        );
        assert_eq!(text, "#P.\n.._\n");
    }

    #[test]
    fn fire_takes_precedence_over_pedestrian_marker() {
        let text = render_grid_parts(
            1,
            1,
            |_| ObstacleCell::Empty,
            |_| ExitMarker::Empty,
            |_| true,
            |_| true,
        );
        assert_eq!(text, "*\n");
    }
}
