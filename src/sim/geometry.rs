//! Coordinates and the small numeric helpers shared by every field computation.

use ordered_float::NotNan;

/// Numeric slack used wherever floating-point sums are compared against an
/// exact target (probability mass, normalization totals, line intersections).
pub const TOLERANCE: f32 = 1e-6;

/// A cell address. `line` is the row (y-axis), `column` is the column (x-axis).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub line: i32,
    pub column: i32,
}

impl Coordinate {
    pub const fn new(line: i32, column: i32) -> Self {
        Coordinate { line, column }
    }

    pub fn offset(self, d_line: i32, d_column: i32) -> Self {
        Coordinate {
            line: self.line + d_line,
            column: self.column + d_column,
        }
    }

    /// The four axial (Von Neumann) neighbors, in a fixed compass order:
    /// up, down, left, right. Callers that need deterministic PRNG-draw
    /// ordering must not reorder this.
    pub fn axial_neighbors(self) -> [Coordinate; 4] {
        [
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(0, -1),
            self.offset(0, 1),
        ]
    }

    /// The eight Moore neighbors, axial entries first, then diagonals.
    pub fn moore_neighbors(self) -> [Coordinate; 8] {
        [
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(0, -1),
            self.offset(0, 1),
            self.offset(-1, -1),
            self.offset(-1, 1),
            self.offset(1, -1),
            self.offset(1, 1),
        ]
    }
}

pub fn euclidean_distance(a: Coordinate, b: Coordinate) -> f32 {
    let dl = (a.line - b.line) as f32;
    let dc = (a.column - b.column) as f32;
    (dl * dl + dc * dc).sqrt()
}

/// Draws an integer in `[low, high]` inclusive from `rng`.
pub fn rng_in_range(rng: &mut fastrand::Rng, low: i32, high: i32) -> i32 {
    debug_assert!(low <= high);
    low + rng.i32(0..=(high - low))
}

/// Bernoulli test: `true` with probability `p` (clamped to `[0, 1]`).
pub fn probability_test(rng: &mut fastrand::Rng, p: f32) -> bool {
    if p <= 0.0 {
        return false;
    }
    if p >= 1.0 {
        return true;
    }
    rng.f32() < p
}

/// Roulette-wheel selection: draws an index in `0..weights.len()` with
/// probability proportional to `weights[i]`. Returns `None` if every weight
/// is zero (or the slice is empty).
pub fn roulette_wheel(rng: &mut fastrand::Rng, weights: &[f32]) -> Option<usize> {
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let u = rng.f32() * total;
    let mut acc = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        acc += w;
        if acc >= u + TOLERANCE * total || i == weights.len() - 1 {
            return Some(i);
        }
    }
    None
}

/// Wraps an `f32` for use as a `BinaryHeap`/roulette ordering key, matching
/// the teacher's `Reverse<NotNan<f32>>` pattern for Dijkstra-style queues.
pub fn not_nan(x: f32) -> NotNan<f32> {
    NotNan::new(x).unwrap_or(NotNan::new(f32::MAX).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Coordinate::new(0, 0);
        let b = Coordinate::new(3, 4);
        assert_float_eq::assert_float_absolute_eq!(euclidean_distance(a, b), 5.0, TOLERANCE);
    }

    #[test]
    fn roulette_wheel_picks_only_nonzero_entry() {
        let mut rng = fastrand::Rng::with_seed(7);
        let weights = [0.0, 0.0, 2.0, 0.0];
        for _ in 0..20 {
            assert_eq!(roulette_wheel(&mut rng, &weights), Some(2));
        }
    }

    #[test]
    fn roulette_wheel_all_zero_is_none() {
        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(roulette_wheel(&mut rng, &[0.0, 0.0, 0.0]), None);
    }

    #[test]
    fn probability_test_extremes() {
        let mut rng = fastrand::Rng::with_seed(3);
        assert!(!probability_test(&mut rng, 0.0));
        assert!(probability_test(&mut rng, 1.0));
    }
}
