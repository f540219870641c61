//! Advection (motion) fields.

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};
use crate::field::GridShape;

/// A 2-D motion field in pixels per timestep.
///
/// Stored as two row-major planes; `u` is the x (column) component and `v`
/// the y (row) component. The archive layout is `[2, H, W]` with `u` first.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionField {
    u: Vec<f32>,
    v: Vec<f32>,
    grid: GridShape,
}

impl MotionField {
    pub fn new(u: Vec<f32>, v: Vec<f32>, grid: GridShape) -> Result<Self> {
        for plane in [&u, &v] {
            if plane.len() != grid.len() {
                return Err(FieldError::shape_mismatch(
                    &[grid.height, grid.width],
                    plane.len(),
                ));
            }
        }
        Ok(Self { u, v, grid })
    }

    /// Spatially constant motion.
    pub fn uniform(u: f32, v: f32, grid: GridShape) -> Self {
        Self {
            u: vec![u; grid.len()],
            v: vec![v; grid.len()],
            grid,
        }
    }

    pub fn zeros(grid: GridShape) -> Self {
        Self::uniform(0.0, 0.0, grid)
    }

    /// Split a `[2, H, W]` buffer.
    pub fn from_stacked(data: &[f32], grid: GridShape) -> Result<Self> {
        let n = grid.len();
        if data.len() != 2 * n {
            return Err(FieldError::shape_mismatch(
                &[2, grid.height, grid.width],
                data.len(),
            ));
        }
        Ok(Self {
            u: data[..n].to_vec(),
            v: data[n..].to_vec(),
            grid,
        })
    }

    pub fn u(&self) -> &[f32] {
        &self.u
    }

    pub fn v(&self) -> &[f32] {
        &self.v
    }

    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// `[2, H, W]`
    pub fn shape(&self) -> [usize; 3] {
        [2, self.grid.height, self.grid.width]
    }

    /// Concatenate the planes into a `[2, H, W]` buffer.
    pub fn to_stacked(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(2 * self.grid.len());
        out.extend_from_slice(&self.u);
        out.extend_from_slice(&self.v);
        out
    }
}

/// RNG derivation scheme used to reproduce per-member motion perturbations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationProtocol {
    /// Two draws per member from the root seed chain, precipitation first.
    StepsV1,
}

/// Regenerated per-member perturbed motion fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbedMotionSet {
    pub fields: Vec<MotionField>,
    pub seed: u64,
    pub protocol: DerivationProtocol,
}

impl PerturbedMotionSet {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stacked_roundtrip() {
        let grid = GridShape::new(2, 3);
        let motion = MotionField::new(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![-1.0, -2.0, -3.0, -4.0, -5.0, -6.0],
            grid,
        )
        .unwrap();

        let stacked = motion.to_stacked();
        assert_eq!(stacked.len(), 12);
        assert_eq!(stacked[6], -1.0);
        assert_eq!(MotionField::from_stacked(&stacked, grid).unwrap(), motion);
    }

    #[test]
    fn test_plane_length_checked() {
        let err = MotionField::new(vec![0.0; 4], vec![0.0; 3], GridShape::new(2, 2)).unwrap_err();
        assert!(matches!(err, FieldError::ShapeMismatch { actual: 3, .. }));
    }

    #[test]
    fn test_uniform() {
        let motion = MotionField::uniform(3.0, 4.0, GridShape::new(2, 2));
        assert_eq!(motion.shape(), [2, 2, 2]);
        assert!(motion.u().iter().all(|&u| u == 3.0));
        assert!(motion.v().iter().all(|&v| v == 4.0));
    }
}
