//! Error types for the decode/post-process pipeline.
//!
//! Mirrors the teacher's `errors::ParseError`/`errors::FitError` split (a
//! low-level parse error plus a wrapper that can carry partial results),
//! but expressed with `thiserror` instead of hand-rolled `Display` impls.

use thiserror::Error;

/// Errors that can occur while decoding a FIT byte stream.
#[derive(Error, Debug)]
pub enum FitError {
    #[error("header size {0} is not 12 or 14 bytes")]
    BadHeader(usize),

    #[error("missing \".FIT\" marker or zero data_size in header")]
    NotFit,

    #[error("data message references local type {0} with no active definition")]
    UndefinedLocalType(u8),

    #[error("compressed-timestamp record encountered before any full timestamp was seen")]
    OrphanCompressedTimestamp,

    #[error("base type id {0} is not in the FIT base type table")]
    UnsupportedBaseType(u8),

    #[error("stream ended before data_size ({expected}) bytes of body were consumed (read {read})")]
    Truncated { expected: usize, read: usize },

    #[error("sink failed to persist message: {0}")]
    StoreError(String),

    #[error("invalid configuration option: {0}")]
    BadOption(String),

    #[error("unknown message {0:?} requested from sink")]
    UnknownMessage(String),

    #[error("architecture byte {0} is neither 0 (little) nor 1 (big)")]
    InvalidArchitecture(u8),

    #[error("developer field (index {developer_data_index}, number {field_number}) has no field_description")]
    UnknownFieldDescription {
        developer_data_index: u8,
        field_number: u8,
    },
}

pub type Result<T> = std::result::Result<T, FitError>;
