//! Radar fields, motion fields and observation series for tests.
//!
//! Generators are deterministic so tests can pin exact values. Used only as
//! a dev-dependency:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, observation_series};
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Creates a temporary directory that is removed when dropped.
pub fn scratch_dir() -> tempfile::TempDir {
    match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => panic!("failed to create temporary directory: {}", e),
    }
}

/// Assert that two numbers differ by at most `epsilon`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, eps) = ($left as f64, $right as f64, $epsilon as f64);
        if (left - right).abs() > eps {
            panic!(
                "assertion failed: {} is not within {} of {}",
                left, eps, right
            );
        }
    }};
}

/// Element-wise [`assert_approx_eq!`] over two slices. NaN matches NaN.
#[macro_export]
macro_rules! assert_slice_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left;
        let right = $right;
        assert_eq!(left.len(), right.len(), "slice lengths differ");
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let (l, r) = (*l as f64, *r as f64);
            if l.is_nan() && r.is_nan() {
                continue;
            }
            if (l - r).abs() > $epsilon as f64 {
                panic!(
                    "assertion failed at index {}: {} is not within {} of {}",
                    i, l, $epsilon, r
                );
            }
        }
    }};
}
