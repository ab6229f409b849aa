//! Grid primitives: allocation, filling, copying, bounds checks, and the
//! diagonal-passability test shared by the static-field and conflict code.

use ndarray::Array2;

use super::cell::ObstacleCell;
use super::geometry::Coordinate;

/// A dense `rows x columns` grid, row-major, owned exclusively by whichever
/// component allocated it (`Simulation`, or a single `Exit`'s private
/// grids). Wraps [`ndarray::Array2`] the way the teacher wraps its potential
/// and obstacle-existence fields.
#[derive(Debug, Clone)]
pub struct Grid<T> {
    cells: Array2<T>,
}

impl<T: Clone> Grid<T> {
    pub fn filled(rows: usize, columns: usize, value: T) -> Self {
        Grid {
            cells: Array2::from_elem((rows, columns), value),
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn columns(&self) -> usize {
        self.cells.ncols()
    }

    pub fn in_bounds(&self, at: Coordinate) -> bool {
        at.line >= 0
            && at.column >= 0
            && (at.line as usize) < self.rows()
            && (at.column as usize) < self.columns()
    }

    pub fn get(&self, at: Coordinate) -> Option<&T> {
        if !self.in_bounds(at) {
            return None;
        }
        Some(&self.cells[[at.line as usize, at.column as usize]])
    }

    pub fn get_mut(&mut self, at: Coordinate) -> Option<&mut T> {
        if !self.in_bounds(at) {
            return None;
        }
        Some(&mut self.cells[[at.line as usize, at.column as usize]])
    }

    pub fn set(&mut self, at: Coordinate, value: T) {
        debug_assert!(self.in_bounds(at), "write out of bounds: {at:?}");
        self.cells[[at.line as usize, at.column as usize]] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }

    pub fn copy_from(&mut self, other: &Grid<T>) {
        debug_assert_eq!(self.cells.dim(), other.cells.dim());
        self.cells.assign(&other.cells);
    }

    pub fn iter_coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        let columns = self.columns();
        (0..self.rows()).flat_map(move |line| {
            (0..columns).map(move |column| Coordinate::new(line as i32, column as i32))
        })
    }

    pub fn swap(&mut self, other: &mut Grid<T>) {
        std::mem::swap(&mut self.cells, &mut other.cells);
    }
}

impl std::ops::Index<Coordinate> for Grid<f32> {
    type Output = f32;
    fn index(&self, at: Coordinate) -> &f32 {
        &self.cells[[at.line as usize, at.column as usize]]
    }
}

impl<T> Grid<T>
where
    T: Copy + Default + std::iter::Sum,
{
    pub fn sum(&self) -> T {
        self.cells.iter().copied().sum()
    }
}

impl Grid<f32> {
    /// Normalizes in place so all entries sum to 1, unless the total is
    /// (numerically) zero, in which case the grid is left unchanged. This is
    /// the explicit `sum != 0.0` check called for in the Design Notes, never
    /// the source's `!normalization_value == 0` typo.
    pub fn normalize(&mut self) {
        let total = self.sum();
        if total != 0.0 {
            self.cells.mapv_inplace(|v| v / total);
        }
    }
}

/// A diagonal move from `from` along `(d_line, d_column)` (each `±1`) is
/// passable iff not both axial adjacents are impassable; with
/// `prevent_corner_crossing` set, neither may be.
pub fn is_diagonal_passable(
    obstacle_grid: &Grid<ObstacleCell>,
    from: Coordinate,
    d_line: i32,
    d_column: i32,
    prevent_corner_crossing: bool,
) -> bool {
    debug_assert!(d_line.abs() == 1 && d_column.abs() == 1);

    let horizontal = obstacle_grid
        .get(from.offset(0, d_column))
        .copied()
        .unwrap_or(ObstacleCell::Impassable);
    let vertical = obstacle_grid
        .get(from.offset(d_line, 0))
        .copied()
        .unwrap_or(ObstacleCell::Impassable);

    let horizontal_blocked = horizontal == ObstacleCell::Impassable;
    let vertical_blocked = vertical == ObstacleCell::Impassable;

    if prevent_corner_crossing {
        !horizontal_blocked && !vertical_blocked
    } else {
        !(horizontal_blocked && vertical_blocked)
    }
}
