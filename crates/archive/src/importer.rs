//! Radar observation archive access.
//!
//! Each observation is a 2-D `float32` Zarr array at the root of its own
//! store, carrying [`FieldMetadata`] attributes. Files are located from a
//! [`DataSource`] by formatting the observation time into a directory and
//! file name pattern.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use ppn_common::{FieldMetadata, GridShape, ObservationSeries};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::error::{ArchiveError, Result};
use crate::layout::{format_time, ROOT};

/// Location and naming of one observation archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub root_path: PathBuf,
    /// strftime pattern of the dated sub-directory, may be empty.
    #[serde(default)]
    pub path_fmt: String,
    /// strftime pattern of the file stem.
    pub fn_pattern: String,
    pub fn_ext: String,
    /// Minutes between observations.
    pub timestep: u32,
}

impl DataSource {
    /// Path of the observation valid at `time`.
    pub fn path_for(&self, time: DateTime<Utc>) -> Result<PathBuf> {
        let mut path = self.root_path.clone();
        if !self.path_fmt.is_empty() {
            path.push(format_time(time, &self.path_fmt)?);
        }
        let stem = format_time(time, &self.fn_pattern)?;
        if self.fn_ext.is_empty() {
            path.push(stem);
        } else {
            path.push(format!("{}.{}", stem, self.fn_ext));
        }
        Ok(path)
    }
}

/// An observation located in the archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationFile {
    pub time: DateTime<Utc>,
    pub path: PathBuf,
}

/// Reads observation series from a [`DataSource`].
#[derive(Debug, Clone)]
pub struct ZarrImporter {
    source: DataSource,
}

impl ZarrImporter {
    pub fn new(source: DataSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// The observation at `start` and the `num_prev` before it, oldest first.
    ///
    /// Every file must exist; a gap fails the lookup.
    pub fn find_candidates(
        &self,
        start: DateTime<Utc>,
        num_prev: usize,
    ) -> Result<Vec<ObservationFile>> {
        let step = Duration::minutes(self.source.timestep as i64);
        let mut files = Vec::with_capacity(num_prev + 1);
        for k in (0..=num_prev).rev() {
            let time = start - step * k as i32;
            let path = self.source.path_for(time)?;
            if !path.exists() {
                return Err(ArchiveError::MissingObservation { time, path });
            }
            files.push(ObservationFile { time, path });
        }
        debug!(count = files.len(), %start, "Found observation files");
        Ok(files)
    }

    /// Read `files` into one series.
    ///
    /// All frames must share grid and metadata; the series takes the
    /// metadata of the frames.
    pub fn read(&self, files: &[ObservationFile]) -> Result<ObservationSeries> {
        let mut frames = Vec::with_capacity(files.len());
        let mut times = Vec::with_capacity(files.len());
        let mut common: Option<(GridShape, FieldMetadata)> = None;

        for file in files {
            let (values, grid, metadata) = read_frame(&file.path)?;
            match &common {
                None => common = Some((grid, metadata)),
                Some((g, m)) if *g == grid && *m == metadata => {}
                Some(_) => {
                    return Err(ArchiveError::InvalidMetadata(format!(
                        "{} does not match the grid or metadata of earlier frames",
                        file.path.display()
                    )))
                }
            }
            frames.push(values);
            times.push(file.time);
        }

        let (grid, metadata) = common
            .ok_or_else(|| ArchiveError::InvalidMetadata("no observation files given".to_string()))?;
        info!(frames = frames.len(), unit = %metadata.unit, "Read observations");
        Ok(ObservationSeries::from_frames(frames, grid, times, metadata)?)
    }

    /// [`find_candidates`](Self::find_candidates) then [`read`](Self::read).
    pub fn load(&self, start: DateTime<Utc>, num_prev: usize) -> Result<ObservationSeries> {
        let files = self.find_candidates(start, num_prev)?;
        self.read(&files)
    }
}

fn read_frame(path: &Path) -> Result<(Vec<f32>, GridShape, FieldMetadata)> {
    let store = FilesystemStore::new(path).map_err(|e| ArchiveError::read_failed(path, e))?;
    let array = Array::open(Arc::new(store), ROOT).map_err(|e| ArchiveError::read_failed(path, e))?;

    let shape = array.shape().to_vec();
    if shape.len() != 2 {
        return Err(ArchiveError::read_failed(
            path,
            format!("expected a 2-D array, found shape {:?}", shape),
        ));
    }
    let grid = GridShape::new(shape[0] as usize, shape[1] as usize);

    let metadata = FieldMetadata::from_attributes(array.attributes()).ok_or_else(|| {
        ArchiveError::InvalidMetadata(format!(
            "{} lacks unit, zerovalue or threshold attributes",
            path.display()
        ))
    })?;

    let subset = ArraySubset::new_with_start_shape(vec![0, 0], shape)
        .map_err(|e| ArchiveError::read_failed(path, e))?;
    let values: Vec<f32> = array
        .retrieve_array_subset_elements(&subset)
        .map_err(|e| ArchiveError::read_failed(path, e))?;

    Ok((values, grid, metadata))
}

/// Write one observation frame where a [`ZarrImporter`] will find it.
pub fn store_observation(
    path: &Path,
    values: &[f32],
    grid: GridShape,
    metadata: &FieldMetadata,
    time: DateTime<Utc>,
) -> Result<()> {
    if values.len() != grid.len() {
        return Err(ppn_common::FieldError::ShapeMismatch {
            shape: vec![grid.height, grid.width],
            expected: grid.len(),
            actual: values.len(),
        }
        .into());
    }
    std::fs::create_dir_all(path).map_err(|e| ArchiveError::io(path, e))?;
    let store = Arc::new(FilesystemStore::new(path).map_err(ArchiveError::storage)?);

    let mut attrs = metadata.to_attributes();
    attrs.insert("time".to_string(), json!(time.to_rfc3339()));

    let shape = vec![grid.height as u64, grid.width as u64];
    let chunk_grid: zarrs::array::ChunkGrid = shape
        .iter()
        .map(|&n| n.max(1))
        .collect::<Vec<u64>>()
        .try_into()
        .map_err(|e| ArchiveError::storage(format!("{:?}", e)))?;

    let array = ArrayBuilder::new(shape.clone(), DataType::Float32, chunk_grid, FillValue::from(f32::NAN))
        .attributes(attrs)
        .build(store, ROOT)
        .map_err(ArchiveError::storage)?;
    array.store_metadata().map_err(ArchiveError::storage)?;

    let subset = ArraySubset::new_with_start_shape(vec![0, 0], shape).map_err(ArchiveError::storage)?;
    array
        .store_array_subset_elements(&subset, values)
        .map_err(ArchiveError::storage)?;

    debug!(path = %path.display(), %time, "Stored observation");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source(root: &Path) -> DataSource {
        DataSource {
            root_path: root.to_path_buf(),
            path_fmt: "%Y%m%d".to_string(),
            fn_pattern: "%Y%m%d%H%M_radar.composite.lowest_FIN".to_string(),
            fn_ext: "zarr".to_string(),
            timestep: 5,
        }
    }

    #[test]
    fn test_path_for() {
        let t = Utc.with_ymd_and_hms(2019, 8, 23, 12, 5, 0).unwrap();
        let path = source(Path::new("/data/radar")).path_for(t).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/data/radar/20190823/201908231205_radar.composite.lowest_FIN.zarr")
        );
    }

    #[test]
    fn test_missing_observation() {
        let dir = tempfile::tempdir().unwrap();
        let importer = ZarrImporter::new(source(dir.path()));
        let t = Utc.with_ymd_and_hms(2019, 8, 23, 12, 0, 0).unwrap();

        let err = importer.find_candidates(t, 2).unwrap_err();
        match err {
            ArchiveError::MissingObservation { time, .. } => {
                assert_eq!(time, t - Duration::minutes(10));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
