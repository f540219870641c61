//! Unit conversions, decibel transform and thresholding.
//!
//! Every operation rewrites the values together with `unit`, `transform`,
//! `zerovalue` and `threshold`, so metadata always describes the data it
//! travels with. NaN values pass through unchanged except in
//! [`threshold_and_clip`], which replaces them.

use ppn_common::{FieldData, FieldMetadata, Transform, Unit};
use tracing::debug;

use crate::error::{Result, TransformError};

/// Decibel offset below the threshold used as zero value when the linear
/// zero value cannot be log-transformed.
const DB_FLOOR_OFFSET: f64 = 5.0;

fn require_unit(meta: &FieldMetadata, operation: &'static str, expected: Unit) -> Result<()> {
    if meta.unit != expected {
        return Err(TransformError::UnitMismatch {
            operation,
            expected,
            found: meta.unit,
        });
    }
    Ok(())
}

fn require_transform(
    meta: &FieldMetadata,
    operation: &'static str,
    expected: Transform,
) -> Result<()> {
    if meta.transform != expected {
        return Err(TransformError::TransformMismatch {
            operation,
            expected,
            found: meta.transform,
        });
    }
    Ok(())
}

fn require_zr(a: f64, b: f64) -> Result<()> {
    if !(a.is_finite() && a > 0.0) {
        return Err(TransformError::InvalidParameter { name: "ZR_A", value: a });
    }
    if !(b.is_finite() && b > 0.0) {
        return Err(TransformError::InvalidParameter { name: "ZR_B", value: b });
    }
    Ok(())
}

/// `R = (10^(dBZ/10) / a)^(1/b)`
pub fn dbz_to_rainrate(dbz: f64, a: f64, b: f64) -> f64 {
    (10f64.powf(dbz / 10.0) / a).powf(1.0 / b)
}

/// `dBZ = 10 log10(a R^b)`
pub fn rainrate_to_dbz(rate: f64, a: f64, b: f64) -> f64 {
    10.0 * (a * rate.powf(b)).log10()
}

/// Convert reflectivity (dBZ) to rain rate (mm/h) with `Z = a R^b`.
///
/// The field must be in dBZ with no value transform.
pub fn reflectivity_to_rainrate<F: FieldData>(mut field: F, a: f64, b: f64) -> Result<F> {
    const OP: &str = "reflectivity_to_rainrate";
    require_unit(field.metadata(), OP, Unit::Dbz)?;
    require_transform(field.metadata(), OP, Transform::None)?;
    require_zr(a, b)?;

    let (values, meta) = field.parts_mut();
    for v in values.iter_mut().filter(|v| !v.is_nan()) {
        *v = dbz_to_rainrate(*v as f64, a, b) as f32;
    }
    meta.threshold = dbz_to_rainrate(meta.threshold, a, b);
    meta.zerovalue = dbz_to_rainrate(meta.zerovalue, a, b);
    meta.unit = Unit::MmPerHour;

    debug!(a, b, threshold = meta.threshold, "Converted dBZ to mm/h");
    Ok(field)
}

/// Convert rain rate (mm/h) to reflectivity (dBZ) with `Z = a R^b`.
///
/// Non-positive rain rates have no reflectivity; they are set to the
/// reflectivity of `zerovalue` when it is positive, otherwise to
/// 5 dB below the reflectivity of `threshold`. That floor becomes the
/// new `zerovalue`.
pub fn rainrate_to_reflectivity<F: FieldData>(mut field: F, a: f64, b: f64) -> Result<F> {
    const OP: &str = "rainrate_to_reflectivity";
    require_unit(field.metadata(), OP, Unit::MmPerHour)?;
    require_transform(field.metadata(), OP, Transform::None)?;
    require_zr(a, b)?;

    let meta = field.metadata();
    let floor = if meta.zerovalue > 0.0 {
        rainrate_to_dbz(meta.zerovalue, a, b)
    } else if meta.threshold > 0.0 {
        rainrate_to_dbz(meta.threshold, a, b) - DB_FLOOR_OFFSET
    } else {
        return Err(TransformError::NonPositiveThreshold {
            operation: OP,
            threshold: meta.threshold,
        });
    };

    let (values, meta) = field.parts_mut();
    for v in values.iter_mut().filter(|v| !v.is_nan()) {
        *v = if *v > 0.0 {
            rainrate_to_dbz(*v as f64, a, b) as f32
        } else {
            floor as f32
        };
    }
    meta.threshold = if meta.threshold > 0.0 {
        rainrate_to_dbz(meta.threshold, a, b)
    } else {
        floor
    };
    meta.zerovalue = floor;
    meta.unit = Unit::Dbz;

    debug!(a, b, zerovalue = floor, "Converted mm/h to dBZ");
    Ok(field)
}

/// Apply `10 log10(x)` to the values, `threshold` and `zerovalue`.
///
/// Requires a linear field with a positive threshold. Non-positive values
/// (the no-rain class) become the decibel zero value: `10 log10(zerovalue)`
/// when `zerovalue` is positive, otherwise `10 log10(threshold) - 5`.
pub fn to_decibel<F: FieldData>(mut field: F) -> Result<F> {
    const OP: &str = "to_decibel";
    require_transform(field.metadata(), OP, Transform::None)?;
    let meta = field.metadata();
    if !(meta.threshold > 0.0) {
        return Err(TransformError::NonPositiveThreshold {
            operation: OP,
            threshold: meta.threshold,
        });
    }

    let threshold_db = 10.0 * meta.threshold.log10();
    let zerovalue_db = if meta.zerovalue > 0.0 {
        10.0 * meta.zerovalue.log10()
    } else {
        threshold_db - DB_FLOOR_OFFSET
    };

    let (values, meta) = field.parts_mut();
    for v in values.iter_mut().filter(|v| !v.is_nan()) {
        *v = if *v > 0.0 {
            10.0 * v.log10()
        } else {
            zerovalue_db as f32
        };
    }
    meta.threshold = threshold_db;
    meta.zerovalue = zerovalue_db;
    meta.transform = Transform::Decibel;

    debug!(threshold = threshold_db, zerovalue = zerovalue_db, "Applied dB transform");
    Ok(field)
}

/// Inverse of [`to_decibel`].
///
/// Only values equal to the decibel zero value return to the linear zero
/// value, which is `0` when the zero value is the `threshold - 5` floor.
/// Every other value, including one below the zero value, becomes
/// `10^(v/10)`, so positive inputs of [`to_decibel`] come back unchanged.
pub fn from_decibel<F: FieldData>(mut field: F) -> Result<F> {
    const OP: &str = "from_decibel";
    require_transform(field.metadata(), OP, Transform::Decibel)?;

    let meta = field.metadata();
    let zerovalue_db = meta.zerovalue;
    let linear_zero = if zerovalue_db == meta.threshold - DB_FLOOR_OFFSET {
        0.0
    } else {
        10f64.powf(zerovalue_db / 10.0)
    };
    let zero_cut = zerovalue_db as f32;

    let (values, meta) = field.parts_mut();
    for v in values.iter_mut().filter(|v| !v.is_nan()) {
        *v = if *v == zero_cut {
            linear_zero as f32
        } else {
            10f32.powf(*v / 10.0)
        };
    }
    meta.threshold = 10f64.powf(meta.threshold / 10.0);
    meta.zerovalue = linear_zero;
    meta.transform = Transform::None;

    debug!(threshold = meta.threshold, zerovalue = linear_zero, "Reverted dB transform");
    Ok(field)
}

/// Set non-finite values and values below `threshold` to `norain`.
///
/// Records `threshold` and `norain` as the field's threshold and zero value.
/// Lossy and idempotent.
pub fn threshold_and_clip<F: FieldData>(mut field: F, threshold: f64, norain: f64) -> F {
    let cut = threshold as f32;
    let fill = norain as f32;

    let (values, meta) = field.parts_mut();
    let mut clipped = 0usize;
    for v in values.iter_mut() {
        if !v.is_finite() || *v < cut {
            *v = fill;
            clipped += 1;
        }
    }
    meta.threshold = threshold;
    meta.zerovalue = norain;

    debug!(threshold, norain, clipped, "Thresholded field");
    field
}
