//! FIT file header decoding (spec §4.1).

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FitError, Result};

/// Decoded 12- or 14-byte FIT header.
#[derive(Debug, Copy, Clone)]
pub struct FitHeader {
    pub header_size: u8,
    pub protocol_version: u8,
    pub profile_version: u16,
    pub data_size: u32,
    pub data_type: [u8; 4],
    /// Present only when `header_size == 14`. Not validated (spec §4.1: "many
    /// emitters leave it zero").
    pub crc: Option<u16>,
}

impl FitHeader {
    /// Total bytes the header + body occupy, i.e. the cursor position at
    /// which decoding must stop (spec §4.1, testable property #1).
    pub fn body_end(&self) -> usize {
        self.header_size as usize + self.data_size as usize
    }
}

/// Parses the first 12 or 14 bytes of a FIT stream.
pub fn decode_header(data: &[u8]) -> Result<FitHeader> {
    let header_size = *data.first().ok_or(FitError::Truncated {
        expected: 1,
        read: data.len(),
    })? as usize;

    if header_size != 12 && header_size != 14 {
        return Err(FitError::BadHeader(header_size));
    }
    if data.len() < header_size {
        return Err(FitError::Truncated {
            expected: header_size,
            read: data.len(),
        });
    }

    let protocol_version = data[1];
    let profile_version = LittleEndian::read_u16(&data[2..4]);
    let data_size = LittleEndian::read_u32(&data[4..8]);
    let data_type = [data[8], data[9], data[10], data[11]];

    // NOTE: spec §4.1's prose says `data_size == 0` is also a `NotFit`
    // condition, but spec §8 scenario 1 exercises a 12-byte header with
    // `data_size = 0` and expects a *successful* decode of an empty sink.
    // The scenario is the more concrete, testable requirement, so only the
    // ".FIT" marker check is enforced here; see DESIGN.md.
    if &data_type != b".FIT" {
        return Err(FitError::NotFit);
    }

    let crc = if header_size == 14 {
        Some(LittleEndian::read_u16(&data[12..14]))
    } else {
        None
    };

    Ok(FitHeader {
        header_size: header_size as u8,
        protocol_version,
        profile_version,
        data_size,
        data_type,
        crc,
    })
}
