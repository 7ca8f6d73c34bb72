//! FIT base types (spec §3, §6).
//!
//! A FIT base type id is a single byte: the low 5 bits select the type, the
//! high bits (endian-ability, reserved) are masked off here the same way the
//! teacher's `get_basevalues` does (`0b0001_1111 & basetype`).

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{FitError, Result};

/// Little/big endian, set per definition message (spec §3 "Endianness").
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub fn from_architecture(arch: u8) -> Result<Endianness> {
        match arch {
            0 => Ok(Endianness::Little),
            1 => Ok(Endianness::Big),
            other => Err(FitError::InvalidArchitecture(other)),
        }
    }
}

/// The FIT base types table (spec §6). The masked low-5-bit number used as
/// the match key below is the teacher's `base_type_number`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BaseType {
    Enum,
    Sint8,
    Uint8,
    Sint16,
    Uint16,
    Sint32,
    Uint32,
    String,
    Float32,
    Float64,
    Uint8z,
    Uint16z,
    Uint32z,
    Byte,
    Sint64,
    Uint64,
    Uint64z,
}

impl BaseType {
    /// Builds a `BaseType` from the raw id byte stored in a definition field.
    pub fn from_id(raw: u8) -> Result<BaseType> {
        let number = raw & 0b0001_1111;
        Ok(match number {
            0 => BaseType::Enum,
            1 => BaseType::Sint8,
            2 => BaseType::Uint8,
            3 => BaseType::Sint16,
            4 => BaseType::Uint16,
            5 => BaseType::Sint32,
            6 => BaseType::Uint32,
            7 => BaseType::String,
            8 => BaseType::Float32,
            9 => BaseType::Float64,
            10 => BaseType::Uint8z,
            11 => BaseType::Uint16z,
            12 => BaseType::Uint32z,
            13 => BaseType::Byte,
            14 => BaseType::Sint64,
            15 => BaseType::Uint64,
            16 => BaseType::Uint64z,
            _ => return Err(FitError::UnsupportedBaseType(raw)),
        })
    }

    /// Width in bytes of a single element, or `None` for `String` (variable).
    pub fn element_width(&self) -> Option<usize> {
        match self {
            BaseType::Enum
            | BaseType::Sint8
            | BaseType::Uint8
            | BaseType::Uint8z
            | BaseType::Byte => Some(1),
            BaseType::Sint16 | BaseType::Uint16 | BaseType::Uint16z => Some(2),
            BaseType::Sint32 | BaseType::Uint32 | BaseType::Uint32z | BaseType::Float32 => {
                Some(4)
            }
            BaseType::Sint64 | BaseType::Uint64 | BaseType::Uint64z | BaseType::Float64 => {
                Some(8)
            }
            BaseType::String => None,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            BaseType::Sint8 | BaseType::Sint16 | BaseType::Sint32 | BaseType::Sint64
        )
    }
}

/// A decoded cluster of raw values for one field, still in native scale
/// (before scale/offset and before epoch shift). Mirrors the teacher's
/// `structs::BaseType(Vec<T>)` shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Enum(Vec<u8>),
    Sint8(Vec<i8>),
    Uint8(Vec<u8>),
    Sint16(Vec<i16>),
    Uint16(Vec<u16>),
    Sint32(Vec<i32>),
    Uint32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Uint8z(Vec<u8>),
    Uint16z(Vec<u16>),
    Uint32z(Vec<u32>),
    Byte(Vec<u8>),
    Sint64(Vec<i64>),
    Uint64(Vec<u64>),
    Uint64z(Vec<u64>),
    String(String),
}

impl RawValue {
    /// Number of logical elements (1 for a scalar field, >1 for an array field).
    pub fn len(&self) -> usize {
        match self {
            RawValue::Enum(v) => v.len(),
            RawValue::Sint8(v) => v.len(),
            RawValue::Uint8(v) => v.len(),
            RawValue::Sint16(v) => v.len(),
            RawValue::Uint16(v) => v.len(),
            RawValue::Sint32(v) => v.len(),
            RawValue::Uint32(v) => v.len(),
            RawValue::Float32(v) => v.len(),
            RawValue::Float64(v) => v.len(),
            RawValue::Uint8z(v) => v.len(),
            RawValue::Uint16z(v) => v.len(),
            RawValue::Uint32z(v) => v.len(),
            RawValue::Byte(v) => v.len(),
            RawValue::Sint64(v) => v.len(),
            RawValue::Uint64(v) => v.len(),
            RawValue::Uint64z(v) => v.len(),
            RawValue::String(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when every element equals the base type's invalid sentinel
    /// (spec §3, §6). An all-invalid cluster means the field is omitted
    /// unless it's on the always-null allowlist (spec §7).
    pub fn is_invalid(&self) -> bool {
        match self {
            RawValue::Enum(v) | RawValue::Byte(v) => v.iter().all(|x| *x == 0xFF),
            RawValue::Sint8(v) => v.iter().all(|x| *x == 0x7F),
            RawValue::Uint8(v) => v.iter().all(|x| *x == 0xFF),
            RawValue::Sint16(v) => v.iter().all(|x| *x == 0x7FFF),
            RawValue::Uint16(v) => v.iter().all(|x| *x == 0xFFFF),
            RawValue::Sint32(v) => v.iter().all(|x| *x == 0x7FFF_FFFF),
            RawValue::Uint32(v) => v.iter().all(|x| *x == 0xFFFF_FFFF),
            RawValue::Sint64(v) => v.iter().all(|x| *x == 0x7FFF_FFFF_FFFF_FFFF),
            RawValue::Uint64(v) => v.iter().all(|x| *x == 0xFFFF_FFFF_FFFF_FFFF),
            // The "z" variants and string/byte invalid sentinel is 0 per spec §3.
            RawValue::Uint8z(v) | RawValue::Uint16z(v) => v.iter().all(|x| *x == 0),
            RawValue::Uint32z(v) => v.iter().all(|x| *x == 0),
            RawValue::Uint64z(v) => v.iter().all(|x| *x == 0),
            // Open question in spec §9: float sentinels are bit patterns equal to
            // the *integer* invalid value reinterpreted, which is unreliable for
            // real float data. We follow the source behaviour and compare the
            // bit pattern, documented explicitly here rather than silently.
            RawValue::Float32(v) => v.iter().all(|x| x.to_bits() == 0xFFFF_FFFF),
            RawValue::Float64(v) => v.iter().all(|x| x.to_bits() == 0xFFFF_FFFF_FFFF_FFFF),
            RawValue::String(s) => s.is_empty(),
        }
    }
}

/// Decodes `data` (exactly `size` bytes) as `base_type` values, applying
/// `endianness` for multi-byte elements. Strings are trimmed at the first
/// NUL. Mirrors `get_basevalues` in the teacher's `lib.rs`.
pub fn decode_raw(data: &[u8], base_type: BaseType, endianness: Endianness) -> Result<RawValue> {
    let width = base_type.element_width();

    if let Some(w) = width {
        if w > 1 && data.len() % w != 0 {
            // Treat as a malformed cluster rather than silently truncating.
            return Err(FitError::UnsupportedBaseType(0));
        }
    }

    Ok(match base_type {
        BaseType::Enum => RawValue::Enum(data.to_vec()),
        BaseType::Uint8 => RawValue::Uint8(data.to_vec()),
        BaseType::Uint8z => RawValue::Uint8z(data.to_vec()),
        BaseType::Byte => RawValue::Byte(data.to_vec()),
        BaseType::Sint8 => RawValue::Sint8(data.iter().map(|b| *b as i8).collect()),
        BaseType::Sint16 => {
            let mut buf = vec![0i16; data.len() / 2];
            read_i16(data, endianness, &mut buf);
            RawValue::Sint16(buf)
        }
        BaseType::Uint16 => {
            let mut buf = vec![0u16; data.len() / 2];
            read_u16(data, endianness, &mut buf);
            RawValue::Uint16(buf)
        }
        BaseType::Uint16z => {
            let mut buf = vec![0u16; data.len() / 2];
            read_u16(data, endianness, &mut buf);
            RawValue::Uint16z(buf)
        }
        BaseType::Sint32 => {
            let mut buf = vec![0i32; data.len() / 4];
            read_i32(data, endianness, &mut buf);
            RawValue::Sint32(buf)
        }
        BaseType::Uint32 => {
            let mut buf = vec![0u32; data.len() / 4];
            read_u32(data, endianness, &mut buf);
            RawValue::Uint32(buf)
        }
        BaseType::Uint32z => {
            let mut buf = vec![0u32; data.len() / 4];
            read_u32(data, endianness, &mut buf);
            RawValue::Uint32z(buf)
        }
        BaseType::Float32 => {
            let mut buf = vec![0f32; data.len() / 4];
            match endianness {
                Endianness::Little => LittleEndian::read_f32_into(data, &mut buf),
                Endianness::Big => BigEndian::read_f32_into(data, &mut buf),
            }
            RawValue::Float32(buf)
        }
        BaseType::Float64 => {
            let mut buf = vec![0f64; data.len() / 8];
            match endianness {
                Endianness::Little => LittleEndian::read_f64_into(data, &mut buf),
                Endianness::Big => BigEndian::read_f64_into(data, &mut buf),
            }
            RawValue::Float64(buf)
        }
        BaseType::Sint64 => {
            let mut buf = vec![0i64; data.len() / 8];
            match endianness {
                Endianness::Little => LittleEndian::read_i64_into(data, &mut buf),
                Endianness::Big => BigEndian::read_i64_into(data, &mut buf),
            }
            RawValue::Sint64(buf)
        }
        BaseType::Uint64 => {
            let mut buf = vec![0u64; data.len() / 8];
            match endianness {
                Endianness::Little => LittleEndian::read_u64_into(data, &mut buf),
                Endianness::Big => BigEndian::read_u64_into(data, &mut buf),
            }
            RawValue::Uint64(buf)
        }
        BaseType::Uint64z => {
            let mut buf = vec![0u64; data.len() / 8];
            match endianness {
                Endianness::Little => LittleEndian::read_u64_into(data, &mut buf),
                Endianness::Big => BigEndian::read_u64_into(data, &mut buf),
            }
            RawValue::Uint64z(buf)
        }
        BaseType::String => {
            // Trim at the first NUL (spec §4.2 step 3); fall back to the
            // full slice when none is present.
            let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
            let s = sanitize_string(&data[..end]);
            RawValue::String(s)
        }
    })
}

fn read_i16(data: &[u8], e: Endianness, buf: &mut [i16]) {
    match e {
        Endianness::Little => LittleEndian::read_i16_into(data, buf),
        Endianness::Big => BigEndian::read_i16_into(data, buf),
    }
}
fn read_u16(data: &[u8], e: Endianness, buf: &mut [u16]) {
    match e {
        Endianness::Little => LittleEndian::read_u16_into(data, buf),
        Endianness::Big => BigEndian::read_u16_into(data, buf),
    }
}
fn read_i32(data: &[u8], e: Endianness, buf: &mut [i32]) {
    match e {
        Endianness::Little => LittleEndian::read_i32_into(data, buf),
        Endianness::Big => BigEndian::read_i32_into(data, buf),
    }
}
fn read_u32(data: &[u8], e: Endianness, buf: &mut [u32]) {
    match e {
        Endianness::Little => LittleEndian::read_u32_into(data, buf),
        Endianness::Big => BigEndian::read_u32_into(data, buf),
    }
}

/// Drops non-printable control characters from an otherwise lossily-decoded
/// string, per spec §4.2 step 3 ("UTF-8-sanitise control characters").
fn sanitize_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sint8_reads_twos_complement() {
        let raw = decode_raw(&[0xE2], BaseType::Sint8, Endianness::Little).unwrap();
        assert_eq!(raw, RawValue::Sint8(vec![-30]));
    }

    #[test]
    fn uint16_invalid_sentinel() {
        let raw = decode_raw(&[0xFF, 0xFF], BaseType::Uint16, Endianness::Little).unwrap();
        assert!(raw.is_invalid());
    }

    #[test]
    fn string_trims_at_first_nul() {
        let raw = decode_raw(b"abc\0\0\0", BaseType::String, Endianness::Little).unwrap();
        assert_eq!(raw, RawValue::String("abc".to_string()));
    }

    #[test]
    fn array_field_splits_into_elements() {
        let raw = decode_raw(
            &[1, 0, 2, 0, 3, 0],
            BaseType::Uint16,
            Endianness::Little,
        )
        .unwrap();
        assert_eq!(raw, RawValue::Uint16(vec![1, 2, 3]));
    }
}
