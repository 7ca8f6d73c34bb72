//! Post-scale/offset decoded values (spec §3 "DecodedValue").

use serde::Serialize;

use crate::basetype::RawValue;

/// A single decoded value. Numeric scalars have already had scale/offset
/// applied (`scaled = raw/scale - offset`); strings and byte blobs pass
/// through untouched, matching spec §3.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Explicit null (spec §4.2 step 3 "always-null session fields"; spec
    /// §4.5 phase 5 "if t lies in a paused interval the value is null").
    /// Distinct from simply omitting the field, which is how every other
    /// invalid value is handled (spec §7).
    Null,
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Rounds a float scalar to the nearest integer (used for `int` fields
    /// per spec §4.5 phase 5's interpolation rounding rule).
    pub fn round_if_int_field(self, is_int_field: bool) -> Scalar {
        match self {
            Scalar::Float(f) if is_int_field => Scalar::Integer(f.round() as i64),
            other => other,
        }
    }
}

/// A decoded field value: either one scalar, or an array of scalars (spec
/// §3: "array-valued field").
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    Scalar(Scalar),
    Array(Vec<Scalar>),
}

impl DecodedValue {
    pub fn integer(v: i64) -> Self {
        DecodedValue::Scalar(Scalar::Integer(v))
    }
    pub fn float(v: f64) -> Self {
        DecodedValue::Scalar(Scalar::Float(v))
    }
    pub fn text(v: impl Into<String>) -> Self {
        DecodedValue::Scalar(Scalar::Text(v.into()))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            DecodedValue::Scalar(s) => Some(s),
            DecodedValue::Array(v) if v.len() == 1 => v.first(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_f64)
    }
}

/// Applies `scaled = raw/scale - offset` to every numeric element of `raw`,
/// per spec §4.2 step 3. Non-numeric base types (`String`, `Byte`, raw
/// developer data with no declared scale) are passed through unchanged.
/// `scale` of `1.0` and `offset` of `0.0` are the defaults for fields with
/// no profile entry.
pub fn apply_scale_offset(raw: &RawValue, scale: f64, offset: f64) -> DecodedValue {
    let scaled = |raw_val: f64| -> Scalar {
        if scale == 1.0 && offset == 0.0 {
            // No conversion requested: keep integer-looking values as
            // integers rather than introducing a spurious ".0".
            if raw_val.fract() == 0.0 {
                Scalar::Integer(raw_val as i64)
            } else {
                Scalar::Float(raw_val)
            }
        } else {
            Scalar::Float(raw_val / scale - offset)
        }
    };

    match raw {
        RawValue::String(s) => DecodedValue::text(s.clone()),
        RawValue::Byte(v) | RawValue::Enum(v) | RawValue::Uint8(v) | RawValue::Uint8z(v) => {
            collect_numeric(v.iter().map(|x| *x as f64), scaled)
        }
        RawValue::Sint8(v) => collect_numeric(v.iter().map(|x| *x as f64), scaled),
        RawValue::Sint16(v) => collect_numeric(v.iter().map(|x| *x as f64), scaled),
        RawValue::Uint16(v) | RawValue::Uint16z(v) => {
            collect_numeric(v.iter().map(|x| *x as f64), scaled)
        }
        RawValue::Sint32(v) => collect_numeric(v.iter().map(|x| *x as f64), scaled),
        RawValue::Uint32(v) | RawValue::Uint32z(v) => {
            collect_numeric(v.iter().map(|x| *x as f64), scaled)
        }
        RawValue::Sint64(v) => collect_numeric(v.iter().map(|x| *x as f64), scaled),
        RawValue::Uint64(v) | RawValue::Uint64z(v) => {
            collect_numeric(v.iter().map(|x| *x as f64), scaled)
        }
        RawValue::Float32(v) => collect_numeric(v.iter().map(|x| *x as f64), scaled),
        RawValue::Float64(v) => collect_numeric(v.iter().copied(), scaled),
    }
}

fn collect_numeric(
    values: impl ExactSizeIterator<Item = f64>,
    scaled: impl Fn(f64) -> Scalar,
) -> DecodedValue {
    if values.len() == 1 {
        DecodedValue::Scalar(scaled(values.into_iter().next().unwrap_or(0.0)))
    } else {
        DecodedValue::Array(values.map(scaled).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_scale_and_offset() {
        let raw = RawValue::Uint16(vec![1000]);
        let v = apply_scale_offset(&raw, 100.0, 5.0);
        assert_eq!(v.as_f64(), Some(1000.0 / 100.0 - 5.0));
    }

    #[test]
    fn arrays_stay_arrays_after_scaling() {
        let raw = RawValue::Sint16(vec![10, 20, 30]);
        let v = apply_scale_offset(&raw, 1.0, 0.0);
        match v {
            DecodedValue::Array(items) => assert_eq!(items.len(), 3),
            _ => panic!("expected array"),
        }
    }
}
