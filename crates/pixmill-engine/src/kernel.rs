//! Convolution kernels and color matrices.
//!
//! Both are built from the caller-facing `Vec<Vec<f64>>` shape and
//! validated once, before any pixel work: fewer than three rows, or any
//! row shorter than three cells, is a configuration error.

use serde::{Deserialize, Serialize};

use crate::types::FilterError;

/// Smallest accepted kernel/matrix extent on either axis.
pub const MIN_EXTENT: usize = 3;

fn check_extent(rows: &[Vec<f64>], what: &str) -> Result<(), FilterError> {
    if rows.len() < MIN_EXTENT {
        return Err(FilterError::InvalidConfig(format!(
            "{what} must have at least {MIN_EXTENT} rows, got {}",
            rows.len()
        )));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() < MIN_EXTENT) {
        return Err(FilterError::InvalidConfig(format!(
            "{what} row {i} must have at least {MIN_EXTENT} columns, got {}",
            row.len()
        )));
    }
    Ok(())
}

/// A rectangular 2D weight grid, row-major.
///
/// The center used for wrap-around addressing is `(cols / 2, rows / 2)`,
/// so even-sized kernels lean toward the top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kernel {
    rows: usize,
    cols: usize,
    weights: Vec<f64>,
}

impl Kernel {
    /// Build and validate a kernel from rows of weights.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidConfig`] if there are fewer than
    /// three rows, a row has fewer than three columns, or rows differ in
    /// length.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, FilterError> {
        check_extent(&rows, "kernel")?;
        let cols = rows[0].len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(FilterError::InvalidConfig(format!(
                "kernel rows must all have {cols} columns, row {i} has {}",
                row.len()
            )));
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            weights: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// `(center_x, center_y)`.
    #[must_use]
    pub const fn center(&self) -> (usize, usize) {
        (self.cols / 2, self.rows / 2)
    }

    /// Weight at `(col, row)`.
    #[must_use]
    pub fn weight(&self, col: usize, row: usize) -> f64 {
        self.weights[row * self.cols + col]
    }

    /// Iterate `(col, row, weight)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.weights
            .iter()
            .enumerate()
            .map(|(i, &w)| (i % self.cols, i / self.cols, w))
    }

    /// Sum of all weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// A 3×3 matrix mapping `(r, g, b)` to `(r', g', b')`; row `i` produces
/// output channel `i`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorMatrix(pub [[f64; 3]; 3]);

impl ColorMatrix {
    /// Build from caller rows. Cells beyond the first 3×3 are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidConfig`] if the matrix is smaller
    /// than 3×3.
    pub fn new(rows: &[Vec<f64>]) -> Result<Self, FilterError> {
        check_extent(rows, "color matrix")?;
        Ok(Self(std::array::from_fn(|i| {
            std::array::from_fn(|j| rows[i][j])
        })))
    }

    /// Apply to a color.
    #[must_use]
    pub fn apply(&self, [r, g, b]: [f64; 3]) -> [f64; 3] {
        self.0.map(|row| r * row[0] + g * row[1] + b * row[2])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ones(rows: usize, cols: usize) -> Vec<Vec<f64>> {
        vec![vec![1.0; cols]; rows]
    }

    #[test]
    fn valid_kernel_dimensions() {
        let k = Kernel::new(ones(3, 5)).unwrap();
        assert_eq!(k.rows(), 3);
        assert_eq!(k.cols(), 5);
        assert_eq!(k.center(), (2, 1));
        assert!((k.sum() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn kernel_with_two_rows_is_rejected() {
        assert!(matches!(
            Kernel::new(ones(2, 3)),
            Err(FilterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn kernel_with_short_row_is_rejected() {
        let mut rows = ones(3, 3);
        rows[1].pop();
        assert!(matches!(
            Kernel::new(rows),
            Err(FilterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn ragged_kernel_is_rejected() {
        let mut rows = ones(3, 3);
        rows[2].push(1.0);
        assert!(matches!(
            Kernel::new(rows),
            Err(FilterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn even_kernel_center_rounds_down() {
        let k = Kernel::new(ones(4, 4)).unwrap();
        assert_eq!(k.center(), (2, 2));
    }

    #[test]
    fn cells_are_row_major() {
        let k = Kernel::new(vec![
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ])
        .unwrap();
        let cells: Vec<_> = k.cells().collect();
        assert_eq!(cells[0], (0, 0, 1.0));
        assert_eq!(cells[5], (2, 1, 6.0));
        assert!((k.weight(1, 2) - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn color_matrix_ignores_extra_cells() {
        let m = ColorMatrix::new(&[
            vec![1.0, 0.0, 0.0, 9.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![9.0, 9.0, 9.0],
        ])
        .unwrap();
        assert_eq!(m.apply([10.0, 20.0, 30.0]), [10.0, 20.0, 30.0]);
    }

    #[test]
    fn color_matrix_too_small_is_rejected() {
        assert!(ColorMatrix::new(&ones(3, 2)).is_err());
        assert!(ColorMatrix::new(&ones(1, 3)).is_err());
    }

    #[test]
    fn color_matrix_rows_produce_output_channels() {
        let swap = ColorMatrix([[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
        assert_eq!(swap.apply([1.0, 2.0, 3.0]), [3.0, 2.0, 1.0]);
    }
}
