//! Typed run configuration.

use std::collections::BTreeMap;

use ppn_common::Unit;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Physical domain the nowcast is computed in, or the stored output unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueDomain {
    /// Reflectivity (dBZ).
    Dbz,
    /// Rain rate (mm/h).
    Rrate,
}

impl ValueDomain {
    pub fn unit(&self) -> Unit {
        match self {
            Self::Dbz => Unit::Dbz,
            Self::Rrate => Unit::MmPerHour,
        }
    }
}

/// Parameters of the `bps` motion perturbation model.
///
/// Each triple `[p0, p1, p2]` defines the standard deviation of the
/// perturbation as `p0 * t^p1 + p2` for lead time `t` in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VelPertKwargs {
    pub p_par: [f64; 3],
    pub p_perp: [f64; 3],
}

impl Default for VelPertKwargs {
    /// Coefficients fitted for Lucas-Kanade motion over the FMI domain.
    fn default() -> Self {
        Self {
            p_par: [2.20837526, 0.33887032, -2.48995355],
            p_perp: [2.21722634, 0.32359621, -2.57402761],
        }
    }
}

/// Offset used when quantizing stored fields.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ScaleZero {
    /// Use the smallest finite value of each product.
    #[default]
    Auto,
    Fixed(f64),
}

impl Serialize for ScaleZero {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Fixed(value) => serializer.serialize_f64(*value),
        }
    }
}

impl<'de> Deserialize<'de> for ScaleZero {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(Self::Auto),
            Some(Repr::Number(value)) => Ok(Self::Fixed(value)),
            Some(Repr::Text(text)) if text.eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            Some(Repr::Text(text)) => Err(serde::de::Error::custom(format!(
                "SCALE_ZERO must be \"auto\", null or a number, got \"{}\"",
                text
            ))),
        }
    }
}

/// Fully resolved parameters of one nowcast run.
///
/// Built once by [`crate::ConfigResolver`] and shared read-only afterwards.
/// Keys serialize with the upper-case names used in profile files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct RunConfig {
    // Method selections
    /// Name of the observation data source.
    pub domain: String,
    pub optflow_method: String,
    pub nowcast_method: String,
    pub fft_method: String,
    pub generate_deterministic: bool,
    pub generate_ensemble: bool,
    pub generate_unperturbed: bool,
    /// Rebuild the per-member perturbed motion fields after the nowcast.
    pub regenerate_perturbed_motion: bool,
    pub value_domain: ValueDomain,

    // Z-R relation Z = a * R^b
    pub zr_a: f64,
    pub zr_b: f64,

    // Nowcasting
    pub num_prev_observations: usize,
    /// Minutes between observations and between lead times.
    pub nowcast_timestep: u32,
    /// Minutes.
    pub max_leadtime: u32,
    pub num_timesteps: Option<usize>,
    pub ensemble_size: usize,
    pub num_cascades: usize,
    pub num_workers: usize,
    /// mm/h
    pub rain_threshold: f64,
    pub norain_value: f64,
    pub dbz_threshold: f64,
    pub dbz_min: f64,
    pub kmperpixel: f64,
    pub seed: Option<u64>,

    // Motion perturbation
    pub vel_pert_method: Option<String>,
    /// `None` selects the perturbator's built-in coefficients.
    pub vel_pert_kwargs: Option<VelPertKwargs>,

    // Storage
    pub field_values: ValueDomain,
    pub output_path: Option<String>,
    pub output_time_format: String,
    pub store_ensemble: bool,
    pub store_unperturbed: bool,
    pub store_deterministic: bool,
    pub store_motion: bool,
    pub store_perturbed_motion: bool,
    pub scaler: f64,
    pub scale_zero: ScaleZero,

    // Logging
    pub write_log: bool,
    pub log_level: String,
    pub log_folder: String,
}

impl RunConfig {
    /// Number of forecast lead times.
    pub fn timesteps(&self) -> usize {
        self.num_timesteps.unwrap_or_else(|| {
            if self.nowcast_timestep == 0 {
                0
            } else {
                (self.max_leadtime / self.nowcast_timestep) as usize
            }
        })
    }

    /// Unit the observations are processed in.
    pub fn processing_unit(&self) -> Unit {
        self.value_domain.unit()
    }

    /// Unit of the stored forecasts.
    pub fn output_unit(&self) -> Unit {
        self.field_values.unit()
    }

    /// Configuration as a key/value table.
    pub fn to_table(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// Every key with its value rendered as text, sorted by key.
    ///
    /// Strings are written without quotes; everything else uses its JSON form.
    pub fn stringified(&self) -> BTreeMap<String, String> {
        self.to_table()
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect()
    }
}
