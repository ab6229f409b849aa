//! Conflict detection and resolution: pedestrians competing for the same
//! target cell, and pairs swapping positions through an X-crossing.

use thin_vec::ThinVec;

use super::geometry::Coordinate;
use super::grid::Grid;
use super::pedestrian::Pedestrian;

#[derive(Debug, Clone, Default)]
pub struct CellConflict {
    pub pedestrian_ids: ThinVec<u32>,
    pub pedestrian_allowed: Option<u32>,
}

/// Draws which pedestrian (if any) is allowed to move into a contested
/// cell. With probability `mu` nobody moves this step; otherwise a winner is
/// drawn uniformly among the contenders.
pub fn resolve_same_target_conflicts(
    pedestrians: &[Pedestrian],
    mu: f32,
    rng: &mut fastrand::Rng,
) -> Vec<CellConflict> {
    let mut by_target: std::collections::HashMap<Coordinate, ThinVec<u32>> =
        std::collections::HashMap::new();

    for pedestrian in pedestrians {
        if pedestrian.target == pedestrian.current {
            continue;
        }
        by_target
            .entry(pedestrian.target)
            .or_default()
            .push(pedestrian.id);
    }

    let mut targets: Vec<Coordinate> = by_target.keys().copied().collect();
    targets.sort_unstable_by_key(|t| (t.line, t.column));

    let mut conflicts = Vec::new();
    for target in targets {
        let mut ids = by_target.remove(&target).unwrap();
        if ids.len() < 2 {
            continue;
        }
        ids.sort_unstable();

        let allowed = if rng.f32() < mu {
            None
        } else {
            let winner_index = super::geometry::rng_in_range(rng, 0, ids.len() as i32 - 1) as usize;
            Some(ids[winner_index])
        };

        conflicts.push(CellConflict {
            pedestrian_ids: ids,
            pedestrian_allowed: allowed,
        });
    }

    conflicts
}

/// An unordered pair of pedestrian indices whose planned moves cross paths
/// (A -> B's cell while B -> A's cell, or any two segments that intersect
/// strictly between their endpoints).
#[derive(Debug, Clone, Copy)]
pub struct CrossingConflict {
    pub first: u32,
    pub second: u32,
}

/// Detects X-crossings among pedestrians that plan to move this step,
/// scanning in row-major order and only comparing each pedestrian against
/// those below or to its right, mirroring a single top-left to bottom-right
/// sweep.
pub fn detect_x_crossings(pedestrians: &[Pedestrian]) -> Vec<CrossingConflict> {
    let movers: Vec<&Pedestrian> = pedestrians
        .iter()
        .filter(|p| p.target != p.current)
        .collect();

    let mut sorted = movers;
    sorted.sort_by_key(|p| (p.current.line, p.current.column));

    let mut crossings = Vec::new();
    for i in 0..sorted.len() {
        for j in (i + 1)..sorted.len() {
            let a = sorted[i];
            let b = sorted[j];
            if segments_cross(a.current, a.target, b.current, b.target) {
                crossings.push(CrossingConflict {
                    first: a.id,
                    second: b.id,
                });
            }
        }
    }
    crossings
}

/// Direct swap (A's target is B's current cell and vice-versa) or a true
/// geometric crossing of the two travel segments, excluding identical
/// segments (those fall through to the same-target conflict path) and
/// parallel/non-intersecting segments.
fn segments_cross(a_from: Coordinate, a_to: Coordinate, b_from: Coordinate, b_to: Coordinate) -> bool {
    if a_to == b_to {
        // handled as a same-target conflict, not a crossing
        return false;
    }
    if a_to == b_from && b_to == a_from {
        return true;
    }

    let (x1, y1) = (a_from.column as f32, a_from.line as f32);
    let (x2, y2) = (a_to.column as f32, a_to.line as f32);
    let (x3, y3) = (b_from.column as f32, b_from.line as f32);
    let (x4, y4) = (b_to.column as f32, b_to.line as f32);

    let denominator = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if denominator.abs() < super::geometry::TOLERANCE {
        // parallel (including collinear/equal-slope) segments never cross
        return false;
    }

    let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / denominator;
    let u = ((x1 - x3) * (y1 - y2) - (y1 - y3) * (x1 - x2)) / denominator;

    let eps = super::geometry::TOLERANCE;
    t > eps && t < 1.0 - eps && u > eps && u < 1.0 - eps
}

/// Draws the outcome of one crossing conflict: a coin flip decides which of
/// the two is denied. On an exact tie this never happens (the draw always
/// picks one), but ties in upstream ordering favor the lower pedestrian id.
pub fn resolve_x_crossing(conflict: &CrossingConflict, rng: &mut fastrand::Rng) -> u32 {
    if rng.bool() {
        conflict.first
    } else {
        conflict.second
    }
}

/// Applies resolved same-target conflicts: any pedestrian named in a
/// conflict who isn't the chosen winner has its target reset to its current
/// cell (stays in place).
pub fn apply_same_target_resolution(pedestrians: &mut [Pedestrian], conflicts: &[CellConflict]) {
    for conflict in conflicts {
        for &id in conflict.pedestrian_ids.iter() {
            if Some(id) != conflict.pedestrian_allowed {
                deny_move(pedestrians, id);
            }
        }
    }
}

/// Applies resolved X-crossings: the denied pedestrian's target is reset to
/// its current cell.
pub fn apply_x_crossing_resolution(pedestrians: &mut [Pedestrian], denied_id: u32) {
    deny_move(pedestrians, denied_id);
}

fn deny_move(pedestrians: &mut [Pedestrian], id: u32) {
    if let Some(pedestrian) = pedestrians.iter_mut().find(|p| p.id == id) {
        pedestrian.target = pedestrian.current;
    }
}

fn grid_occupant_sentinel() -> u32 {
    0
}

/// Rebuilds the pedestrian-position grid from scratch after moves have been
/// applied; `0` marks an empty cell.
pub fn rebuild_position_grid(grid: &mut Grid<u32>, pedestrians: &[Pedestrian]) {
    grid.fill(grid_occupant_sentinel());
    for pedestrian in pedestrians {
        if pedestrian.state.is_live() {
            grid.set(pedestrian.current, pedestrian.id);
        }
    }
}
