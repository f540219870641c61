//! Whole-domain translation estimator.

use ppn_common::{GridShape, MotionField, ObservationSeries};
use tracing::debug;

use crate::collaborators::MotionEstimator;
use crate::error::{NowcastError, Result};

pub const NAME: &str = "global-shift";

/// Largest shift searched, in pixels per timestep.
pub const DEFAULT_MAX_SHIFT: usize = 10;

/// Estimates one integer-pixel translation between the last two frames.
///
/// Every shift within `max_shift` is scored by the mean squared difference
/// over the overlapping area; the best one becomes a spatially uniform
/// motion field. Ties keep the smaller shift.
#[derive(Debug, Clone)]
pub struct GlobalShift {
    max_shift: usize,
}

impl Default for GlobalShift {
    fn default() -> Self {
        Self {
            max_shift: DEFAULT_MAX_SHIFT,
        }
    }
}

impl GlobalShift {
    pub fn new(max_shift: usize) -> Self {
        Self { max_shift }
    }
}

/// Mean squared difference of `cur[r][c]` and `prev[r - dy][c - dx]`, or
/// `None` when the overlap is smaller than a quarter of the grid.
fn shift_score(prev: &[f32], cur: &[f32], grid: GridShape, dx: isize, dy: isize) -> Option<f64> {
    let (h, w) = (grid.height as isize, grid.width as isize);
    let mut sum = 0.0;
    let mut count = 0usize;
    for r in dy.max(0)..(h + dy).min(h) {
        for c in dx.max(0)..(w + dx).min(w) {
            let a = cur[(r * w + c) as usize];
            let b = prev[((r - dy) * w + (c - dx)) as usize];
            if a.is_finite() && b.is_finite() {
                let d = (a - b) as f64;
                sum += d * d;
                count += 1;
            }
        }
    }
    (count > 0 && count * 4 >= grid.len()).then(|| sum / count as f64)
}

impl MotionEstimator for GlobalShift {
    fn name(&self) -> &str {
        NAME
    }

    fn estimate(&self, observations: &ObservationSeries) -> Result<MotionField> {
        let n = observations.num_frames();
        if n < 2 {
            return Err(NowcastError::engine(
                NAME,
                format!("needs at least two frames, got {}", n),
            ));
        }
        let grid = observations.grid();
        let prev = observations.frame(n - 2)?;
        let cur = observations.frame(n - 1)?;

        let max = self.max_shift as isize;
        let mut shifts: Vec<(isize, isize)> = (-max..=max)
            .flat_map(|dy| (-max..=max).map(move |dx| (dx, dy)))
            .collect();
        shifts.sort_by_key(|&(dx, dy)| (dx.abs() + dy.abs(), dy.abs(), dx.abs()));

        let mut best = (0, 0);
        let mut best_score = f64::INFINITY;
        for (dx, dy) in shifts {
            if let Some(score) = shift_score(prev, cur, grid, dx, dy) {
                if score < best_score {
                    best_score = score;
                    best = (dx, dy);
                }
            }
        }

        debug!(dx = best.0, dy = best.1, score = best_score, "Estimated global shift");
        Ok(MotionField::uniform(best.0 as f32, best.1 as f32, grid))
    }
}
