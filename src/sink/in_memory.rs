//! `InMemorySink` (spec §4.4.1).
//!
//! Shape: `messages: name -> fields`. `record` fields are time-indexed
//! (`field_name -> (timestamp -> value)`); every other message's fields are
//! insertion-ordered sequences. Grounded on the teacher's `FitFile::group()`
//! (`lib/fit-rs/src/structs.rs`), which buckets decoded messages by global
//! message number into a `HashMap` — this sink buckets one level deeper,
//! by field name, since callers here want columns, not whole messages.

use std::collections::{BTreeMap, HashMap};

use crate::error::{FitError, Result};
use crate::record_parser::FitMessage;
use crate::sink::{Column, MessageSink};
use crate::value::DecodedValue;

#[derive(Debug, Clone, Default)]
struct RecordColumns {
    fields: HashMap<String, BTreeMap<i64, DecodedValue>>,
    /// Every `record.timestamp` value seen at insert time, duplicates
    /// included, in file order (spec §4.5 phase 3's `record.timestamp_original`).
    timestamps_seen: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
struct SequenceColumns {
    fields: HashMap<String, Vec<DecodedValue>>,
}

#[derive(Debug, Clone)]
enum MessageColumns {
    Record(RecordColumns),
    Other(SequenceColumns),
}

/// The in-memory, in-process columnar sink (spec §4.4.1).
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    messages: HashMap<String, MessageColumns>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once at least one `record` message has been inserted.
    pub fn has_message(&self, message_name: &str) -> bool {
        self.messages.contains_key(message_name)
    }

    pub fn message_names(&self) -> impl Iterator<Item = &String> {
        self.messages.keys()
    }

    /// Field names catalogued for a given message, in no particular order.
    pub fn field_names(&self, message_name: &str) -> Vec<String> {
        match self.messages.get(message_name) {
            Some(MessageColumns::Record(r)) => r.fields.keys().cloned().collect(),
            Some(MessageColumns::Other(o)) => o.fields.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Retrieves a column (spec §4.4.1 `get(message, field)`).
    ///
    /// Sequences of length 1 collapse to a bare scalar, except inside
    /// `developer_data` (spec §4.4.1), which this sink never does anyway
    /// since developer fields land under their owning message's name, not
    /// a synthetic `developer_data` bucket.
    pub fn get(&self, message_name: &str, field_name: &str) -> Result<Column> {
        match self
            .messages
            .get(message_name)
            .ok_or_else(|| FitError::UnknownMessage(message_name.to_string()))?
        {
            MessageColumns::Record(r) => {
                if field_name == "timestamp_original" {
                    let sequence = r.timestamps_seen.iter().map(|ts| DecodedValue::integer(*ts)).collect();
                    return Ok(Column::Sequence(sequence));
                }
                let column = r
                    .fields
                    .get(field_name)
                    .ok_or_else(|| FitError::UnknownMessage(format!("{message_name}.{field_name}")))?;
                Ok(Column::TimeIndexed(column.clone()))
            }
            MessageColumns::Other(o) => {
                let column = o
                    .fields
                    .get(field_name)
                    .ok_or_else(|| FitError::UnknownMessage(format!("{message_name}.{field_name}")))?;
                if message_name != "developer_data" && column.len() == 1 {
                    Ok(Column::Scalar(column[0].clone()))
                } else {
                    Ok(Column::Sequence(column.clone()))
                }
            }
        }
    }

    /// Mutable access used by the post-processor (spec §4.5), which rewrites
    /// `record` columns in place (signed repair, pruning, interpolation).
    pub fn record_field_mut(&mut self, field_name: &str) -> &mut BTreeMap<i64, DecodedValue> {
        let entry = self
            .messages
            .entry("record".to_string())
            .or_insert_with(|| MessageColumns::Record(RecordColumns::default()));
        match entry {
            MessageColumns::Record(r) => r.fields.entry(field_name.to_string()).or_default(),
            MessageColumns::Other(_) => unreachable!("record is always stored as MessageColumns::Record"),
        }
    }

    pub fn record_field(&self, field_name: &str) -> Option<&BTreeMap<i64, DecodedValue>> {
        match self.messages.get("record") {
            Some(MessageColumns::Record(r)) => r.fields.get(field_name),
            _ => None,
        }
    }

    pub fn record_field_names(&self) -> Vec<String> {
        self.field_names("record")
    }

    /// Replaces a `record` field's whole column (spec §4.5 phases 4-5:
    /// densification and interpolation both rebuild a column wholesale
    /// rather than editing it entry by entry).
    pub fn set_record_field(&mut self, field_name: &str, map: BTreeMap<i64, DecodedValue>) {
        let entry = self
            .messages
            .entry("record".to_string())
            .or_insert_with(|| MessageColumns::Record(RecordColumns::default()));
        if let MessageColumns::Record(r) = entry {
            r.fields.insert(field_name.to_string(), map);
        }
    }

    /// Applies `f` to every value of `field_name` on `message_name` in
    /// place (spec §4.5 phase 6 unit conversion). Works across both the
    /// time-indexed `record` shape and the insertion-ordered shape every
    /// other message uses.
    pub fn map_field_values(&mut self, message_name: &str, field_name: &str, f: impl Fn(&DecodedValue) -> DecodedValue) {
        match self.messages.get_mut(message_name) {
            Some(MessageColumns::Record(r)) => {
                if let Some(column) = r.fields.get_mut(field_name) {
                    for value in column.values_mut() {
                        *value = f(value);
                    }
                }
            }
            Some(MessageColumns::Other(o)) => {
                if let Some(column) = o.fields.get_mut(field_name) {
                    for value in column.iter_mut() {
                        *value = f(value);
                    }
                }
            }
            None => {}
        }
    }
}

impl MessageSink for InMemorySink {
    fn insert(&mut self, message: FitMessage) -> Result<()> {
        if message.message_name == "record" {
            let timestamp = message
                .fields
                .iter()
                .find(|(name, _)| name == "timestamp")
                .and_then(|(_, v)| v.as_f64())
                .map(|v| v as i64);

            let Some(ts) = timestamp else {
                // Spec §3's record invariant assumes every committed record
                // has a resolved timestamp by the time it reaches the sink
                // (the record parser guarantees this via compressed-ts
                // expansion / inheritance); a record with none is dropped
                // here rather than silently corrupting column alignment.
                return Ok(());
            };

            let entry = self
                .messages
                .entry("record".to_string())
                .or_insert_with(|| MessageColumns::Record(RecordColumns::default()));
            if let MessageColumns::Record(r) = entry {
                r.timestamps_seen.push(ts);
                for (name, value) in message.fields {
                    // First occurrence wins (spec §4.5 phase 3: "unique(record.timestamp)
                    // preserving first occurrence").
                    r.fields.entry(name).or_default().entry(ts).or_insert(value);
                }
            }
        } else {
            let entry = self
                .messages
                .entry(message.message_name.clone())
                .or_insert_with(|| MessageColumns::Other(SequenceColumns::default()));
            if let MessageColumns::Other(o) = entry {
                for (name, value) in message.fields {
                    o.fields.entry(name).or_default().push(value);
                }
            }
        }
        Ok(())
    }
}
