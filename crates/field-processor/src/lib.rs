//! Value-domain operations on radar fields.
//!
//! Two groups of operations live here:
//!
//! - **Transforms** ([`transform`], [`pipeline`]): Z-R conversion between
//!   reflectivity and rain rate, the decibel transform and thresholding.
//!   They consume a [`ppn_common::FieldData`] and return it with values
//!   and metadata rewritten together.
//! - **Encoding** ([`quantize`]): fixed-point packing of forecasts for
//!   storage with a reserved nodata code.
//!
//! # Example
//!
//! ```ignore
//! use field_processor::{preprocess_observations, postprocess_forecast};
//!
//! let observations = preprocess_observations(observations, &config)?;
//! // ... generate forecast in the processing domain ...
//! let forecast = postprocess_forecast(forecast, &config)?;
//! let encoded = field_processor::encode::<u16>(forecast.values(), 100.0, None)?;
//! ```

pub mod error;
pub mod pipeline;
pub mod quantize;
pub mod transform;

pub use error::{EncodingError, Result, TransformError};
pub use pipeline::{postprocess_forecast, preprocess_observations};
pub use quantize::{encode, finite_min, QuantizedField};
pub use transform::{
    dbz_to_rainrate, from_decibel, rainrate_to_dbz, rainrate_to_reflectivity,
    reflectivity_to_rainrate, threshold_and_clip, to_decibel,
};
