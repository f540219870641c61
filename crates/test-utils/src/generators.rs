//! Test data generators for creating synthetic radar-like data.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

use ppn_common::{GridShape, MotionField};

/// Background reflectivity of the synthetic fields (dBZ).
pub const BACKGROUND_DBZ: f32 = -10.0;

/// Creates `n` values evenly spaced from `min` to `max` (inclusive).
///
/// # Example
///
/// ```
/// use test_utils::scaled_values;
///
/// let values = scaled_values(3, 0.0, 1.0);
/// assert_eq!(values, vec![0.0, 0.5, 1.0]);
/// ```
pub fn scaled_values(n: usize, min: f32, max: f32) -> Vec<f32> {
    if n == 1 {
        return vec![min];
    }
    let step = (max - min) / (n.saturating_sub(1)).max(1) as f32;
    (0..n).map(|i| min + step * i as f32).collect()
}

/// Creates a reflectivity field with a single Gaussian rain cell.
///
/// The cell peaks at `peak_dbz` in (`row`, `col`) and decays to
/// [`BACKGROUND_DBZ`] with a radius of about `radius` pixels.
///
/// # Returns
///
/// A `Vec<f32>` in row-major order.
pub fn rain_cell_field(grid: GridShape, row: f32, col: f32, peak_dbz: f32, radius: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(grid.len());
    let sigma2 = (radius * radius).max(1e-3);
    for r in 0..grid.height {
        for c in 0..grid.width {
            let dr = r as f32 - row;
            let dc = c as f32 - col;
            let weight = (-(dr * dr + dc * dc) / (2.0 * sigma2)).exp();
            data.push(BACKGROUND_DBZ + (peak_dbz - BACKGROUND_DBZ) * weight);
        }
    }
    data
}

/// Creates `n` reflectivity frames of a rain cell moving one pixel to the
/// right (positive x) per frame.
///
/// The first frame has the cell centred a quarter of the way across the
/// grid. Peak reflectivity is 45 dBZ.
pub fn reflectivity_frames(n: usize, grid: GridShape) -> Vec<Vec<f32>> {
    let row = grid.height as f32 / 2.0;
    let col0 = grid.width as f32 / 4.0;
    let radius = (grid.width.min(grid.height) as f32 / 6.0).max(1.0);
    (0..n)
        .map(|i| rain_cell_field(grid, row, col0 + i as f32, 45.0, radius))
        .collect()
}

/// Shift a field by whole pixels, filling uncovered pixels with `fill`.
pub fn shift_field(data: &[f32], grid: GridShape, dx: isize, dy: isize, fill: f32) -> Vec<f32> {
    let mut out = vec![fill; grid.len()];
    for r in 0..grid.height as isize {
        for c in 0..grid.width as isize {
            let (sr, sc) = (r - dy, c - dx);
            if sr >= 0 && sc >= 0 && (sr as usize) < grid.height && (sc as usize) < grid.width {
                out[r as usize * grid.width + c as usize] =
                    data[sr as usize * grid.width + sc as usize];
            }
        }
    }
    out
}

/// Spatially constant motion field.
pub fn uniform_motion(grid: GridShape, u: f32, v: f32) -> MotionField {
    MotionField::uniform(u, v, grid)
}

/// Motion rotating counter-clockwise about the grid centre, with zero
/// motion at the centre pixel.
pub fn rotating_motion(grid: GridShape, speed: f32) -> MotionField {
    let cy = (grid.height / 2) as f32;
    let cx = (grid.width / 2) as f32;
    let mut u = Vec::with_capacity(grid.len());
    let mut v = Vec::with_capacity(grid.len());
    for r in 0..grid.height {
        for c in 0..grid.width {
            u.push(-(r as f32 - cy) * speed);
            v.push((c as f32 - cx) * speed);
        }
    }
    // both planes have grid.len() values
    MotionField::new(u, v, grid).unwrap_or_else(|_| MotionField::zeros(grid))
}
