//! Fixed-point encoding of float fields for storage.
//!
//! A field is stored as `q = round((value - offset) * scaler)` in an
//! unsigned integer type whose maximum is reserved as the nodata code.
//! Readers recover `value = q * gain + offset` with `gain = 1 / scaler`.

use num_traits::{Bounded, NumCast, PrimInt, Unsigned};
use tracing::debug;

use crate::error::EncodingError;

/// Quantized field plus the attributes needed to decode it.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedField<T> {
    pub data: Vec<T>,
    pub gain: f64,
    pub offset: f64,
    pub nodata: T,
}

impl<T> QuantizedField<T>
where
    T: PrimInt + Unsigned,
{
    /// Reconstruct float values; nodata becomes NaN.
    pub fn decode(&self) -> Vec<f32> {
        self.data
            .iter()
            .map(|&q| {
                if q == self.nodata {
                    f32::NAN
                } else {
                    let q = q.to_f64().unwrap_or(f64::NAN);
                    (q * self.gain + self.offset) as f32
                }
            })
            .collect()
    }
}

/// Smallest finite value, or `None` when there is none.
pub fn finite_min(values: &[f32]) -> Option<f64> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .map(|&v| v as f64)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.min(v))))
}

/// Encode `values` as `T`.
///
/// `offset = None` uses the smallest finite value (0 for an all-NaN
/// field). Every value is range checked before the output is returned, so
/// an error never yields a partially encoded field.
pub fn encode<T>(values: &[f32], scaler: f64, offset: Option<f64>) -> Result<QuantizedField<T>, EncodingError>
where
    T: PrimInt + Unsigned + Bounded + NumCast,
{
    if !(scaler.is_finite() && scaler > 0.0) {
        return Err(EncodingError::InvalidScaler(scaler));
    }
    let offset = offset.or_else(|| finite_min(values)).unwrap_or(0.0);
    let nodata = T::max_value();
    let max = nodata.to_f64().unwrap_or(f64::MAX);

    let mut data = Vec::with_capacity(values.len());
    for &v in values {
        if !v.is_finite() {
            data.push(nodata);
            continue;
        }
        let scaled = ((v as f64 - offset) * scaler).round();
        if scaled >= max {
            return Err(EncodingError::Overflow {
                value: scaled,
                max: nodata.to_u64().unwrap_or(u64::MAX),
            });
        }
        if scaled < 0.0 {
            return Err(EncodingError::Underflow {
                value: v as f64,
                offset,
            });
        }
        // 0 <= scaled < max, so the cast cannot fail
        data.push(<T as NumCast>::from(scaled).unwrap_or(nodata));
    }

    debug!(count = data.len(), scaler, offset, "Encoded field");
    Ok(QuantizedField {
        data,
        gain: 1.0 / scaler,
        offset,
        nodata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_auto_offset_is_finite_min() {
        let q = encode::<u16>(&[f32::NAN, 2.5, -1.0, 4.0], 10.0, None).unwrap();
        assert_eq!(q.offset, -1.0);
        assert_eq!(q.data, vec![u16::MAX, 35, 0, 50]);
        assert_eq!(q.gain, 0.1);
        assert_eq!(q.nodata, 65535);
    }

    #[test]
    fn test_all_nan_field() {
        let q = encode::<u16>(&[f32::NAN, f32::INFINITY], 100.0, None).unwrap();
        assert_eq!(q.offset, 0.0);
        assert_eq!(q.data, vec![u16::MAX, u16::MAX]);
    }

    #[test]
    fn test_decode_inverts_within_gain() {
        let values = [-10.0f32, -3.33, 0.0, 17.25, f32::NAN, 55.5];
        let q = encode::<u16>(&values, 100.0, None).unwrap();
        let decoded = q.decode();

        for (orig, back) in values.iter().zip(&decoded) {
            if orig.is_nan() {
                assert!(back.is_nan());
            } else {
                assert_approx_eq!(*back, *orig, q.gain);
            }
        }
    }

    #[test]
    fn test_overflow_reports_max() {
        // (655.35 - 0) * 100 rounds to 65535, the nodata code
        let err = encode::<u16>(&[0.0, 655.35], 100.0, Some(0.0)).unwrap_err();
        assert!(matches!(err, EncodingError::Overflow { max: 65535, .. }));

        assert!(encode::<u16>(&[0.0, 655.3], 100.0, Some(0.0)).is_ok());
    }

    #[test]
    fn test_u8_output() {
        let q = encode::<u8>(&[0.0, 25.4], 10.0, Some(0.0)).unwrap();
        assert_eq!(q.data, vec![0, 254]);
        assert!(encode::<u8>(&[25.5], 10.0, Some(0.0)).is_err());
    }

    #[test]
    fn test_underflow_with_fixed_offset() {
        let err = encode::<u16>(&[-5.0], 10.0, Some(0.0)).unwrap_err();
        assert_eq!(err, EncodingError::Underflow { value: -5.0, offset: 0.0 });
    }

    #[test]
    fn test_invalid_scaler() {
        assert_eq!(
            encode::<u16>(&[1.0], 0.0, None).unwrap_err(),
            EncodingError::InvalidScaler(0.0)
        );
    }
}
