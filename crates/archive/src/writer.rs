//! Nowcast archive writer.
//!
//! Forecasts are packed to `uint16` with a per-product offset and written
//! one array per lead time. Motion fields are kept as `float32`.
//!
//! The archive is assembled in a `<name>.partial` directory which replaces
//! the target only after every node has been written; a failure removes
//! the staging directory and leaves any previous archive untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use field_processor::{encode, QuantizedField};
use ppn_common::{valid_time, FieldData, ForecastEnsemble, MotionField, Projection, Unit};
use ppn_config::{Artifact, RunConfig, ScaleZero};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use zarrs::array::{ArrayBuilder, DataType, Element, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs_filesystem::FilesystemStore;

use crate::error::{ArchiveError, Result};
use crate::layout::{
    self, format_time, CONFIGURATION_GROUP, DETERMINISTIC_GROUP, META_GROUP, MOTION_ARRAY,
    PERTURBED_MOTION_GROUP, PROJECTION_GROUP, ROOT, UNPERTURBED_GROUP,
};
use crate::plan::{NowcastProducts, StoragePlan};

/// Quantization parameters of stored forecasts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingSettings {
    pub scaler: f64,
    pub scale_zero: ScaleZero,
}

impl EncodingSettings {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            scaler: config.scaler,
            scale_zero: config.scale_zero,
        }
    }

    fn offset(&self) -> Option<f64> {
        match self.scale_zero {
            ScaleZero::Auto => None,
            ScaleZero::Fixed(value) => Some(value),
        }
    }
}

/// Run-level attributes written to `/meta`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetadata {
    /// Wall-clock start of the run.
    pub started: DateTime<Utc>,
    /// Wall-clock end of forecast generation.
    pub ended: DateTime<Utc>,
    /// Time of the latest observation; lead times count from here.
    pub init_time: DateTime<Utc>,
    pub unit: Unit,
    pub seed: Option<u64>,
    /// Minutes between lead times.
    pub timestep: u32,
    /// strftime pattern of every time attribute.
    pub time_format: String,
    pub configuration: BTreeMap<String, String>,
    pub projection: Option<Projection>,
}

/// What a successful write produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub artifacts: Vec<Artifact>,
    pub arrays_written: usize,
    /// Uncompressed payload size.
    pub bytes_written: u64,
}

/// A forecast product encoded and ready to be written.
struct EncodedForecast<'a> {
    artifact: Artifact,
    forecast: &'a ForecastEnsemble,
    quantized: QuantizedField<u16>,
}

/// Writes [`NowcastProducts`] to a Zarr V3 directory store.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    encoding: EncodingSettings,
}

impl ArchiveWriter {
    pub fn new(encoding: EncodingSettings) -> Self {
        Self { encoding }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(EncodingSettings::from_config(config))
    }

    pub fn encoding(&self) -> EncodingSettings {
        self.encoding
    }

    /// Write the products selected by `plan` to `path`.
    ///
    /// Encoding and time formatting run before the first file is created,
    /// so an overflow or a bad `OUTPUT_TIME_FORMAT` leaves no trace on disk.
    pub fn write(
        &self,
        path: &Path,
        plan: &StoragePlan,
        products: &NowcastProducts,
        meta: &RunMetadata,
    ) -> Result<ArchiveSummary> {
        let encoded = self.encode_forecasts(plan, products)?;
        let meta_attrs = meta_attributes(meta)?;
        let valid_times = leadtime_labels(&encoded, meta)?;

        let staging = staging_path(path);
        if staging.exists() {
            remove_dir(&staging)?;
        }
        std::fs::create_dir_all(&staging).map_err(|e| ArchiveError::io(&staging, e))?;

        let mut summary = ArchiveSummary {
            path: path.to_path_buf(),
            artifacts: plan.artifacts().collect(),
            arrays_written: 0,
            bytes_written: 0,
        };

        let staged = self.write_nodes(
            &staging,
            plan,
            products,
            meta,
            &encoded,
            &valid_times,
            meta_attrs,
            &mut summary,
        );
        if let Err(e) = staged {
            warn!(path = %staging.display(), error = %e, "Archive write failed, removing staging directory");
            if let Err(cleanup) = std::fs::remove_dir_all(&staging) {
                warn!(error = %cleanup, "Failed to remove staging directory");
            }
            return Err(e);
        }

        if path.exists() {
            remove_dir(path)?;
        }
        std::fs::rename(&staging, path).map_err(|e| ArchiveError::io(path, e))?;

        info!(
            path = %path.display(),
            arrays = summary.arrays_written,
            bytes = summary.bytes_written,
            "Wrote nowcast archive"
        );
        Ok(summary)
    }

    fn encode_forecasts<'a>(
        &self,
        plan: &StoragePlan,
        products: &'a NowcastProducts,
    ) -> Result<Vec<EncodedForecast<'a>>> {
        let mut encoded = Vec::new();
        for (artifact, forecast) in products.forecasts() {
            if !plan.includes(artifact) {
                continue;
            }
            let quantized =
                encode::<u16>(forecast.values(), self.encoding.scaler, self.encoding.offset())
                    .map_err(|source| ArchiveError::Encoding {
                        product: artifact.to_string(),
                        source,
                    })?;
            debug!(
                %artifact,
                gain = quantized.gain,
                offset = quantized.offset,
                "Encoded forecast"
            );
            encoded.push(EncodedForecast {
                artifact,
                forecast,
                quantized,
            });
        }
        Ok(encoded)
    }

    #[allow(clippy::too_many_arguments)]
    fn write_nodes(
        &self,
        root: &Path,
        plan: &StoragePlan,
        products: &NowcastProducts,
        meta: &RunMetadata,
        encoded: &[EncodedForecast<'_>],
        valid_times: &[String],
        meta_attrs: Map<String, Value>,
        summary: &mut ArchiveSummary,
    ) -> Result<()> {
        let store = Arc::new(FilesystemStore::new(root).map_err(ArchiveError::storage)?);

        write_group(&store, ROOT, Map::new())?;

        for item in encoded {
            let groups: Vec<String> = match item.artifact {
                Artifact::Ensemble => (0..item.forecast.num_members())
                    .map(layout::member_group)
                    .collect(),
                Artifact::Unperturbed => vec![UNPERTURBED_GROUP.to_string()],
                _ => vec![DETERMINISTIC_GROUP.to_string()],
            };
            write_forecast(&store, item, &groups, valid_times, summary)?;
        }

        if plan.includes(Artifact::Motion) {
            if let Some(motion) = &products.motion {
                let mut attrs = Map::new();
                attrs.insert("components".to_string(), json!(["u", "v"]));
                attrs.insert("timestep".to_string(), json!(meta.timestep));
                write_motion(&store, MOTION_ARRAY, motion, attrs, summary)?;
            }
        }

        if plan.includes(Artifact::PerturbedMotion) {
            if let Some(set) = &products.perturbed_motion {
                let mut attrs = Map::new();
                attrs.insert("seed".to_string(), json!(set.seed));
                attrs.insert("protocol".to_string(), json!(set.protocol));
                write_group(&store, PERTURBED_MOTION_GROUP, attrs)?;
                for (member, field) in set.fields.iter().enumerate() {
                    let path = layout::perturbed_motion_array(member);
                    write_motion(&store, &path, field, Map::new(), summary)?;
                }
            }
        }

        write_group(&store, META_GROUP, meta_attrs)?;
        let configuration = meta
            .configuration
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        write_group(&store, CONFIGURATION_GROUP, configuration)?;
        let projection = meta
            .projection
            .as_ref()
            .map(Projection::to_attributes)
            .unwrap_or_default();
        write_group(&store, PROJECTION_GROUP, projection)?;

        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn remove_dir(path: &Path) -> Result<()> {
    std::fs::remove_dir_all(path).map_err(|e| ArchiveError::io(path, e))
}

fn meta_attributes(meta: &RunMetadata) -> Result<Map<String, Value>> {
    let mut attrs = Map::new();
    attrs.insert(
        "nowcast_started".to_string(),
        json!(format_time(meta.started, &meta.time_format)?),
    );
    attrs.insert(
        "nowcast_ended".to_string(),
        json!(format_time(meta.ended, &meta.time_format)?),
    );
    attrs.insert(
        "nowcast_init_time".to_string(),
        json!(format_time(meta.init_time, &meta.time_format)?),
    );
    attrs.insert("nowcast_units".to_string(), json!(meta.unit.as_str()));
    attrs.insert(
        "nowcast_seed".to_string(),
        meta.seed.map_or_else(|| json!("Unknown"), |s| json!(s)),
    );
    Ok(attrs)
}

/// Formatted valid time of every lead time of the longest forecast.
fn leadtime_labels(encoded: &[EncodedForecast<'_>], meta: &RunMetadata) -> Result<Vec<String>> {
    let count = encoded
        .iter()
        .map(|e| e.forecast.num_timesteps())
        .max()
        .unwrap_or(0);
    (0..count)
        .map(|i| format_time(valid_time(meta.init_time, i, meta.timestep), &meta.time_format))
        .collect()
}

fn write_group(store: &Arc<FilesystemStore>, path: &str, attrs: Map<String, Value>) -> Result<()> {
    let group = GroupBuilder::new()
        .attributes(attrs)
        .build(store.clone(), path)
        .map_err(ArchiveError::storage)?;
    group.store_metadata().map_err(ArchiveError::storage)
}

/// Create a single-chunk array at `path` and fill it with `data`.
fn write_array<T: Element>(
    store: &Arc<FilesystemStore>,
    path: &str,
    shape: Vec<u64>,
    data_type: DataType,
    fill_value: FillValue,
    attrs: Map<String, Value>,
    data: &[T],
) -> Result<u64> {
    let chunk_grid: zarrs::array::ChunkGrid = shape
        .iter()
        .map(|&n| n.max(1))
        .collect::<Vec<u64>>()
        .try_into()
        .map_err(|e| ArchiveError::storage(format!("{:?}", e)))?;

    let array = ArrayBuilder::new(shape.clone(), data_type, chunk_grid, fill_value)
        .attributes(attrs)
        .build(store.clone(), path)
        .map_err(ArchiveError::storage)?;
    array.store_metadata().map_err(ArchiveError::storage)?;

    let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape)
        .map_err(ArchiveError::storage)?;
    array
        .store_array_subset_elements(&subset, data)
        .map_err(ArchiveError::storage)?;

    Ok(std::mem::size_of_val(data) as u64)
}

fn write_forecast(
    store: &Arc<FilesystemStore>,
    item: &EncodedForecast<'_>,
    groups: &[String],
    valid_times: &[String],
    summary: &mut ArchiveSummary,
) -> Result<()> {
    let forecast = item.forecast;
    let grid = forecast.grid();
    let n = grid.len();
    let per_member = forecast.num_timesteps() * n;
    let q = &item.quantized;

    for (member, group) in groups.iter().enumerate() {
        write_group(store, group, Map::new())?;
        for leadtime in 0..forecast.num_timesteps() {
            let start = member * per_member + leadtime * n;
            let mut attrs = Map::new();
            attrs.insert("Valid for".to_string(), json!(valid_times[leadtime]));
            attrs.insert("gain".to_string(), json!(q.gain));
            attrs.insert("offset".to_string(), json!(q.offset));
            attrs.insert("nodata".to_string(), json!(q.nodata));

            summary.bytes_written += write_array(
                store,
                &layout::leadtime_array(group, leadtime),
                vec![grid.height as u64, grid.width as u64],
                DataType::UInt16,
                FillValue::from(q.nodata),
                attrs,
                &q.data[start..start + n],
            )?;
            summary.arrays_written += 1;
        }
        debug!(group = %group, leadtimes = forecast.num_timesteps(), "Wrote forecast group");
    }
    Ok(())
}

fn write_motion(
    store: &Arc<FilesystemStore>,
    path: &str,
    motion: &MotionField,
    attrs: Map<String, Value>,
    summary: &mut ArchiveSummary,
) -> Result<()> {
    let shape = motion.shape().iter().map(|&d| d as u64).collect();
    summary.bytes_written += write_array(
        store,
        path,
        shape,
        DataType::Float32,
        FillValue::from(f32::NAN),
        attrs,
        &motion.to_stacked(),
    )?;
    summary.arrays_written += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/tmp/out/nc_201908231200.zarr")),
            PathBuf::from("/tmp/out/nc_201908231200.zarr.partial")
        );
    }

    #[test]
    fn test_encoding_offset() {
        let auto = EncodingSettings {
            scaler: 100.0,
            scale_zero: ScaleZero::Auto,
        };
        let fixed = EncodingSettings {
            scaler: 100.0,
            scale_zero: ScaleZero::Fixed(-32.0),
        };
        assert_eq!(auto.offset(), None);
        assert_eq!(fixed.offset(), Some(-32.0));
    }
}
