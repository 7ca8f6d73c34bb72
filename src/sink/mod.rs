//! `MessageSink` — the decoded-message destination (spec §4.4).
//!
//! Two implementations live here: [`in_memory::InMemorySink`] (a columnar
//! in-process store) and [`batched::BatchedTableSink`] (a buffering driver
//! over a caller-supplied relational transport). Grounded on the design
//! note in SPEC_FULL.md/spec.md §9: "abstract behind a `MessageSink`
//! capability set" — the core never talks to a real database, only to the
//! [`batched::BatchTransport`] trait an embedding host implements.

pub mod batched;
pub mod in_memory;

pub use batched::{BatchTransport, BatchedTableSink};
pub use in_memory::InMemorySink;

use crate::record_parser::FitMessage;

/// Common read-back shape both sinks expose for a single field (spec
/// §4.4.1 `get(message, field)`, §4.4.2 read-back view).
#[derive(Debug, Clone)]
pub enum Column {
    /// A single collapsed value (spec §4.4.1: "any field sequence of
    /// length 1 collapses to a bare scalar").
    Scalar(crate::value::DecodedValue),
    /// Insertion-ordered values for a non-`record` message.
    Sequence(Vec<crate::value::DecodedValue>),
    /// Timestamp-keyed values for a `record` field.
    TimeIndexed(std::collections::BTreeMap<i64, crate::value::DecodedValue>),
}

/// Receives one decoded [`FitMessage`] at a time. Both sink implementations
/// provide an inherent `insert` with the same shape; this trait lets
/// decode-time code (the post-processor, the driver loop) stay generic
/// over which one is in play.
pub trait MessageSink {
    fn insert(&mut self, message: FitMessage) -> crate::error::Result<()>;
}
