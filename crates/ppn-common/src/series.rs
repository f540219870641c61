//! Observation and forecast containers.

use chrono::{DateTime, Utc};

use crate::error::{FieldError, Result};
use crate::field::{FieldMetadata, GridShape};

/// Anything that owns a flat `f32` buffer plus its field metadata.
///
/// Unit and threshold operations are written against this trait so they
/// apply equally to observations and forecasts.
pub trait FieldData {
    fn values(&self) -> &[f32];
    fn values_mut(&mut self) -> &mut [f32];
    fn metadata(&self) -> &FieldMetadata;
    fn metadata_mut(&mut self) -> &mut FieldMetadata;

    /// Mutable access to values and metadata at the same time.
    fn parts_mut(&mut self) -> (&mut [f32], &mut FieldMetadata);
}

/// Time-ordered radar observations, oldest first, shape `[T, H, W]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSeries {
    data: Vec<f32>,
    grid: GridShape,
    timestamps: Vec<DateTime<Utc>>,
    metadata: FieldMetadata,
}

impl ObservationSeries {
    /// Build a series from individual frames.
    ///
    /// Every frame must hold `grid.len()` values and there must be one
    /// timestamp per frame.
    pub fn from_frames(
        frames: Vec<Vec<f32>>,
        grid: GridShape,
        timestamps: Vec<DateTime<Utc>>,
        metadata: FieldMetadata,
    ) -> Result<Self> {
        if frames.is_empty() {
            return Err(FieldError::Empty("observation series"));
        }
        if timestamps.len() != frames.len() {
            return Err(FieldError::ShapeMismatch {
                shape: vec![frames.len()],
                expected: frames.len(),
                actual: timestamps.len(),
            });
        }

        let mut data = Vec::with_capacity(frames.len() * grid.len());
        for frame in frames {
            if frame.len() != grid.len() {
                return Err(FieldError::shape_mismatch(
                    &[grid.height, grid.width],
                    frame.len(),
                ));
            }
            data.extend(frame);
        }

        Ok(Self {
            data,
            grid,
            timestamps,
            metadata,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.timestamps.len()
    }

    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// `[T, H, W]`
    pub fn shape(&self) -> [usize; 3] {
        [self.num_frames(), self.grid.height, self.grid.width]
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Timestamp of the newest frame.
    pub fn latest_timestamp(&self) -> DateTime<Utc> {
        // from_frames rejects empty series
        self.timestamps[self.timestamps.len() - 1]
    }

    pub fn frame(&self, index: usize) -> Result<&[f32]> {
        if index >= self.num_frames() {
            return Err(FieldError::IndexOutOfRange {
                axis: "frame",
                index,
                len: self.num_frames(),
            });
        }
        let n = self.grid.len();
        Ok(&self.data[index * n..(index + 1) * n])
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks(self.grid.len().max(1))
    }
}

impl FieldData for ObservationSeries {
    fn values(&self) -> &[f32] {
        &self.data
    }

    fn values_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut FieldMetadata {
        &mut self.metadata
    }

    fn parts_mut(&mut self) -> (&mut [f32], &mut FieldMetadata) {
        (&mut self.data, &mut self.metadata)
    }
}

/// Forecast fields with shape `[M, T, H, W]`.
///
/// Deterministic and unperturbed forecasts are stored as single-member
/// ensembles.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEnsemble {
    data: Vec<f32>,
    members: usize,
    timesteps: usize,
    grid: GridShape,
    metadata: FieldMetadata,
}

impl ForecastEnsemble {
    pub fn new(
        data: Vec<f32>,
        members: usize,
        timesteps: usize,
        grid: GridShape,
        metadata: FieldMetadata,
    ) -> Result<Self> {
        let shape = [members, timesteps, grid.height, grid.width];
        if data.len() != shape.iter().product::<usize>() {
            return Err(FieldError::shape_mismatch(&shape, data.len()));
        }
        Ok(Self {
            data,
            members,
            timesteps,
            grid,
            metadata,
        })
    }

    /// Stack per-member `[T, H, W]` buffers.
    pub fn from_members(
        members: Vec<Vec<f32>>,
        timesteps: usize,
        grid: GridShape,
        metadata: FieldMetadata,
    ) -> Result<Self> {
        if members.is_empty() {
            return Err(FieldError::Empty("forecast ensemble"));
        }
        let count = members.len();
        let per_member = timesteps * grid.len();
        let mut data = Vec::with_capacity(count * per_member);
        for member in members {
            if member.len() != per_member {
                return Err(FieldError::shape_mismatch(
                    &[timesteps, grid.height, grid.width],
                    member.len(),
                ));
            }
            data.extend(member);
        }
        Self::new(data, count, timesteps, grid, metadata)
    }

    pub fn num_members(&self) -> usize {
        self.members
    }

    pub fn num_timesteps(&self) -> usize {
        self.timesteps
    }

    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// `[M, T, H, W]`
    pub fn shape(&self) -> [usize; 4] {
        [self.members, self.timesteps, self.grid.height, self.grid.width]
    }

    /// All lead times of one member, `[T, H, W]`.
    pub fn member(&self, index: usize) -> Result<&[f32]> {
        if index >= self.members {
            return Err(FieldError::IndexOutOfRange {
                axis: "member",
                index,
                len: self.members,
            });
        }
        let n = self.timesteps * self.grid.len();
        Ok(&self.data[index * n..(index + 1) * n])
    }

    /// One 2-D field.
    pub fn field(&self, member: usize, leadtime: usize) -> Result<&[f32]> {
        if leadtime >= self.timesteps {
            return Err(FieldError::IndexOutOfRange {
                axis: "leadtime",
                index: leadtime,
                len: self.timesteps,
            });
        }
        let n = self.grid.len();
        let member = self.member(member)?;
        Ok(&member[leadtime * n..(leadtime + 1) * n])
    }
}

impl FieldData for ForecastEnsemble {
    fn values(&self) -> &[f32] {
        &self.data
    }

    fn values_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut FieldMetadata {
        &mut self.metadata
    }

    fn parts_mut(&mut self) -> (&mut [f32], &mut FieldMetadata) {
        (&mut self.data, &mut self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Unit;
    use chrono::TimeZone;

    fn meta() -> FieldMetadata {
        FieldMetadata::new(Unit::Dbz, -10.0, -10.0)
    }

    fn times(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2019, 8, 23, 12, 0, 0).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::minutes(5 * i as i64))
            .collect()
    }

    #[test]
    fn test_series_from_frames() {
        let grid = GridShape::new(2, 2);
        let series = ObservationSeries::from_frames(
            vec![vec![1.0; 4], vec![2.0; 4], vec![3.0; 4]],
            grid,
            times(3),
            meta(),
        )
        .unwrap();

        assert_eq!(series.shape(), [3, 2, 2]);
        assert_eq!(series.frame(2).unwrap(), &[3.0; 4]);
        assert_eq!(series.latest_timestamp(), times(3)[2]);
        assert_eq!(series.frames().count(), 3);
    }

    #[test]
    fn test_series_rejects_bad_frame() {
        let err = ObservationSeries::from_frames(
            vec![vec![1.0; 4], vec![2.0; 3]],
            GridShape::new(2, 2),
            times(2),
            meta(),
        )
        .unwrap_err();
        assert!(matches!(err, FieldError::ShapeMismatch { actual: 3, .. }));
    }

    #[test]
    fn test_series_rejects_empty() {
        let err =
            ObservationSeries::from_frames(vec![], GridShape::new(2, 2), vec![], meta()).unwrap_err();
        assert_eq!(err, FieldError::Empty("observation series"));
    }

    #[test]
    fn test_ensemble_indexing() {
        let grid = GridShape::new(1, 2);
        // member m, leadtime t -> value 10*m + t
        let members = (0..3)
            .map(|m| (0..2).flat_map(|t| vec![(10 * m + t) as f32; 2]).collect())
            .collect();
        let ensemble = ForecastEnsemble::from_members(members, 2, grid, meta()).unwrap();

        assert_eq!(ensemble.shape(), [3, 2, 1, 2]);
        assert_eq!(ensemble.field(2, 1).unwrap(), &[21.0, 21.0]);
        assert_eq!(ensemble.member(1).unwrap(), &[10.0, 10.0, 11.0, 11.0]);
        assert!(matches!(
            ensemble.field(0, 2),
            Err(FieldError::IndexOutOfRange { axis: "leadtime", .. })
        ));
        assert!(matches!(
            ensemble.member(3),
            Err(FieldError::IndexOutOfRange { axis: "member", .. })
        ));
    }

    #[test]
    fn test_ensemble_shape_check() {
        let err = ForecastEnsemble::new(vec![0.0; 5], 1, 1, GridShape::new(2, 2), meta()).unwrap_err();
        assert_eq!(
            err,
            FieldError::ShapeMismatch {
                shape: vec![1, 1, 2, 2],
                expected: 4,
                actual: 5
            }
        );
    }
}
