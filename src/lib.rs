//! Decodes FIT (Flexible & Interoperable Data Transfer) activity files into
//! a typed, queryable collection of messages.
//!
//! The crate root mirrors the teacher's top-level `parse_fit` entry point
//! (`lib/fit-rs/src/lib.rs`): read a header, decode the record stream, hand
//! the result to a sink. This crate splits that single function into
//! [`header::decode_header`], [`record_parser::decode_messages`], and a
//! [`sink::MessageSink`] implementation chosen by the caller, plus the
//! post-decode phases the teacher left to downstream analytics crates
//! (see [`postprocess`]).
#![warn(rust_2018_idioms)]

pub mod basetype;
pub mod config;
pub mod definition;
pub mod developer;
pub mod error;
pub mod header;
pub mod hr;
pub mod pacer;
pub mod pause;
pub mod postprocess;
pub mod profile;
pub mod record_parser;
pub mod sink;
pub mod units;
pub mod value;

use rayon::prelude::*;

pub use config::Config;
pub use error::{FitError, Result};
pub use header::FitHeader;
pub use pacer::{Pacer, PacerSignal};
pub use sink::{Column, InMemorySink, MessageSink};

/// Decodes `data` (a complete FIT byte stream) into a [`DecodedFit`], running
/// every post-decode phase from spec §4.5 against an in-process
/// [`InMemorySink`]. For the batched/relational sink, decode with
/// [`record_parser::decode_messages`] directly and insert into a
/// [`sink::BatchedTableSink`] of your own (see that module's docs) — the
/// core never constructs a database connection itself. That sink applies
/// its own unit conversion per message at flush time from the `Config` it
/// was built with, so both back-ends honor `cfg.units`/`cfg.pace` even
/// though only one of them runs through this function.
pub fn decode(data: &[u8], cfg: &Config) -> Result<DecodedFit> {
    decode_paced(data, cfg, &mut Pacer::disabled())
}

/// Same as [`decode`] but ticks `pacer` through every long loop spec §5
/// names (record decode, interpolation, unit conversion).
pub fn decode_paced(data: &[u8], cfg: &Config, pacer: &mut Pacer) -> Result<DecodedFit> {
    let fit_header = header::decode_header(data)?;
    let body_end = fit_header.body_end();
    if data.len() < body_end {
        return Err(FitError::Truncated {
            expected: body_end,
            read: data.len(),
        });
    }
    let body = &data[fit_header.header_size as usize..body_end];

    let (messages, hr_messages, developer_registry) = record_parser::decode_messages_paced(body, cfg, pacer)?;

    let mut sink = InMemorySink::new();
    for message in messages {
        sink.insert(message)?;
    }

    postprocess::run(&mut sink, &hr_messages, &developer_registry, cfg, pacer);

    Ok(DecodedFit {
        header: fit_header,
        sink,
        hr_message_count: hr_messages.len(),
        developer_field_count: developer_registry.descriptors().count(),
    })
}

/// A convenience view over a fully decoded, post-processed FIT file
/// (SPEC_FULL.md §B "`FitFile`-style convenience view"), mirroring the
/// teacher's `structs::FitFile` — a header plus the decoded data, with a
/// handful of summary accessors layered on top. Pure ergonomics: every
/// accessor here is derivable from the wrapped [`InMemorySink`].
#[derive(Debug)]
pub struct DecodedFit {
    pub header: FitHeader,
    sink: InMemorySink,
    hr_message_count: usize,
    developer_field_count: usize,
}

impl DecodedFit {
    /// Borrows the underlying sink for direct [`MessageSink`]/`get` access.
    pub fn sink(&self) -> &InMemorySink {
        &self.sink
    }

    /// Consumes the wrapper, handing back the sink it built.
    pub fn into_sink(self) -> InMemorySink {
        self.sink
    }

    /// Shorthand for `self.sink().get(message_name, field_name)`.
    pub fn get(&self, message_name: &str, field_name: &str) -> Result<Column> {
        self.sink.get(message_name, field_name)
    }

    /// Number of distinct message types this file carried (spec §3: every
    /// decoded message is catalogued under its message name).
    pub fn len(&self) -> usize {
        self.sink.message_names().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of raw `hr` (global 132) messages seen before burst
    /// reassembly folded them into `record.heart_rate` (spec §4.7).
    pub fn hr_message_count(&self) -> usize {
        self.hr_message_count
    }

    /// Number of developer field descriptors registered during decode
    /// (spec §4.4.2).
    pub fn developer_field_count(&self) -> usize {
        self.developer_field_count
    }

    /// Groups every catalogued message by name, reporting its field names
    /// (mirrors the teacher's `FitFile::group`, which buckets whole decoded
    /// messages by global id with `par_iter`; this sink is already bucketed
    /// by message name, so the parallel step is over field-name collection
    /// instead).
    pub fn group_by_message(&self) -> std::collections::HashMap<String, Vec<String>> {
        self.sink
            .message_names()
            .cloned()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|name| {
                let fields = self.sink.field_names(&name);
                (name, fields)
            })
            .collect()
    }
}
