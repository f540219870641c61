//! Ordered transform chains applied before and after forecasting.

use ppn_common::{FieldData, Unit};
use ppn_config::{RunConfig, ValueDomain};
use tracing::info;

use crate::error::Result;
use crate::transform::{
    from_decibel, rainrate_to_reflectivity, reflectivity_to_rainrate, threshold_and_clip,
    to_decibel,
};

/// Bring observations into the processing domain.
///
/// Unit conversion runs before thresholding and the decibel transform runs
/// after it, so the logarithm only sees thresholded values:
///
/// * `rrate`: dBZ → mm/h, clip with `RAIN_THRESHOLD`/`NORAIN_VALUE`, dB.
/// * `dbz`: mm/h → dBZ, clip with `DBZ_THRESHOLD`/`DBZ_MIN`.
pub fn preprocess_observations<F: FieldData>(field: F, config: &RunConfig) -> Result<F> {
    let (a, b) = (config.zr_a, config.zr_b);
    let unit = field.metadata().unit;

    let field = match config.value_domain {
        ValueDomain::Rrate => {
            let field = if unit == Unit::Dbz {
                reflectivity_to_rainrate(field, a, b)?
            } else {
                field
            };
            let field = threshold_and_clip(field, config.rain_threshold, config.norain_value);
            to_decibel(field)?
        }
        ValueDomain::Dbz => {
            let field = if unit == Unit::MmPerHour {
                rainrate_to_reflectivity(field, a, b)?
            } else {
                field
            };
            threshold_and_clip(field, config.dbz_threshold, config.dbz_min)
        }
    };

    let meta = field.metadata();
    info!(
        unit = %meta.unit,
        transform = %meta.transform,
        threshold = meta.threshold,
        zerovalue = meta.zerovalue,
        "Preprocessed observations"
    );
    Ok(field)
}

/// Undo the decibel transform and convert to the `FIELD_VALUES` unit.
pub fn postprocess_forecast<F: FieldData>(field: F, config: &RunConfig) -> Result<F> {
    let field = if field.metadata().is_decibel() {
        from_decibel(field)?
    } else {
        field
    };

    let target = config.output_unit();
    let (a, b) = (config.zr_a, config.zr_b);
    match (field.metadata().unit, target) {
        (Unit::Dbz, Unit::MmPerHour) => reflectivity_to_rainrate(field, a, b),
        (Unit::MmPerHour, Unit::Dbz) => rainrate_to_reflectivity(field, a, b),
        _ => Ok(field),
    }
}
