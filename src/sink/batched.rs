//! `BatchedTableSink` (spec §4.4.2): buffers decoded messages and flushes
//! them in bulk to a caller-supplied relational transport.
//!
//! The core never talks to a real database (spec §1: "the core depends
//! only on an abstract batch sink interface"). [`BatchTransport`] is that
//! interface; a host embeds this crate together with its own driver
//! (Postgres, SQLite, whatever) that implements it. Grounded on the design
//! note in spec.md §9 ("abstract behind a MessageSink capability set
//! {create_table(schema), add_columns(cols), insert_batch(rows),
//! query_column(msg, field), drop_all}") and, for the buffering/threshold
//! shape, the teacher's own preference for bulk `par_iter` batch
//! construction before a single write (`structs.rs`'s `filter`/`group`).

use std::collections::{HashMap, HashSet};

use crate::config::{sanitize_identifier, Config, Units};
use crate::error::Result;
use crate::pacer::Pacer;
use crate::postprocess::{converter_for, map_numeric, UNIT_CONVERTED_MESSAGES};
use crate::profile;
use crate::record_parser::FitMessage;
use crate::sink::{Column, MessageSink};
use crate::value::{DecodedValue, Scalar};

/// Row batch size for the spec §4.8 stop-point scan.
const STOP_POINT_BATCH_SIZE: usize = 1000;

/// Number of buffered messages (summed across all message names) that
/// triggers an automatic flush (spec §4.4.2 "Buffering discipline").
pub const BUFFER_THRESHOLD: usize = 1000;

/// Column types the transport is asked to create/alter. Inferred from the
/// decoded value shape rather than the original FIT base type, since the
/// sink only ever sees already-decoded [`DecodedValue`]s (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Float,
    Text,
    Blob,
    /// `record`'s derived spatial point column (spec §6 "spatial_point POINT
    /// NOT NULL").
    Point,
    /// `record.paused` / `record.stopped` (spec §6 "TINYINT(1)").
    Boolean,
}

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: SqlType,
}

#[derive(Debug, Clone)]
pub enum IndexSpec {
    Spatial(String),
    Secondary(String),
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub indexes: Vec<IndexSpec>,
}

/// One row ready for insertion: field name -> value. `None` is an explicit
/// SQL NULL.
pub type Row = HashMap<String, Option<DecodedValue>>;

/// The abstract relational back-end contract (spec §1, §4.4.2, §9).
pub trait BatchTransport {
    fn create_table(&mut self, schema: &TableSchema) -> Result<()>;
    fn add_columns(&mut self, table: &str, columns: &[ColumnSpec]) -> Result<()>;
    fn insert_batch(&mut self, table: &str, rows: &[Row]) -> Result<()>;
    /// Returns `(timestamp, value)` pairs in whatever order the transport's
    /// table holds them; `timestamp` is `None` for non-`record` tables.
    fn query_column(&mut self, table: &str, column: &str) -> Result<Vec<(Option<i64>, DecodedValue)>>;
    fn drop_table(&mut self, table: &str) -> Result<()>;

    /// Spec §4.8: the `record` table walked in ascending-timestamp batches of
    /// `limit`, resuming after `after_timestamp`. Used only by
    /// [`BatchedTableSink::compute_stop_points`].
    fn query_record_batch(&mut self, table: &str, after_timestamp: Option<i64>, limit: usize) -> Result<Vec<(i64, Row)>>;

    /// Spec §4.8's "rewrite the row via a temporary update table": applies
    /// `(timestamp, row)` overwrites in place. Rows are keyed by
    /// `record.timestamp`, which spec §4.4.2 already requires to be present
    /// and unique for every persisted record row.
    fn update_rows(&mut self, table: &str, updates: &[(i64, Row)]) -> Result<()>;
}

/// Mandatory `record` fields a message must carry to be persisted (spec
/// §4.4.2 "Record insert policy").
const RECORD_MANDATORY_FIELDS: &[&str] = &["position_lat", "position_long", "timestamp", "distance"];

/// HRV's sentinel-for-missing value (spec §4.4.1): `65.535` in the array
/// becomes `null` before JSON encoding.
const HRV_SENTINEL: f64 = 65.535;

fn hrv_times_json(values: &[Scalar]) -> String {
    let cleaned: Vec<Option<f64>> = values
        .iter()
        .map(|s| match s.as_f64() {
            Some(v) if (v - HRV_SENTINEL).abs() < f64::EPSILON => None,
            other => other,
        })
        .collect();
    serde_json::to_string(&cleaned).unwrap_or_else(|_| "[]".to_string())
}

fn sql_type_for(value: &DecodedValue) -> SqlType {
    match value {
        DecodedValue::Scalar(Scalar::Integer(_)) => SqlType::Integer,
        DecodedValue::Scalar(Scalar::Float(_)) => SqlType::Float,
        DecodedValue::Scalar(Scalar::Text(_)) => SqlType::Text,
        DecodedValue::Scalar(Scalar::Bytes(_)) => SqlType::Blob,
        DecodedValue::Array(items) => match items.first() {
            Some(Scalar::Integer(_)) => SqlType::Integer,
            Some(Scalar::Float(_)) => SqlType::Float,
            Some(Scalar::Text(_)) => SqlType::Text,
            _ => SqlType::Blob,
        },
    }
}

#[derive(Default)]
struct TableState {
    created: bool,
    columns: HashSet<String>,
    pending: Vec<FitMessage>,
}

/// The buffering, schema-evolving driver over a [`BatchTransport`] (spec
/// §4.4.2).
pub struct BatchedTableSink {
    transport: Box<dyn BatchTransport>,
    table_prefix: String,
    tables: HashMap<String, TableState>,
    buffered_count: usize,
    query_cache: HashMap<(String, String), Column>,
    cfg: Config,
}

impl BatchedTableSink {
    /// `cfg` drives this sink's own unit conversion (spec §4.5 phase 6,
    /// applied per-row at flush time rather than per-column like
    /// [`crate::sink::InMemorySink`]'s [`crate::postprocess::run`]) — the
    /// relational back-end applies the same transforms before insert.
    pub fn new(transport: Box<dyn BatchTransport>, table_name_prefix: &str, cfg: Config) -> Self {
        BatchedTableSink {
            transport,
            table_prefix: sanitize_identifier(table_name_prefix),
            tables: HashMap::new(),
            buffered_count: 0,
            query_cache: HashMap::new(),
            cfg,
        }
    }

    fn table_name(&self, message_name: &str) -> String {
        format!("{}_{}", self.table_prefix, message_name)
    }

    /// Forces a flush regardless of the buffering threshold (spec §4.4.2
    /// "on threshold or on explicit flush").
    pub fn flush(&mut self) -> Result<()> {
        let names: Vec<String> = self
            .tables
            .iter()
            .filter(|(_, state)| !state.pending.is_empty())
            .map(|(name, _)| name.clone())
            .collect();

        for table in names {
            self.flush_table(&table)?;
        }
        self.buffered_count = 0;
        Ok(())
    }

    fn flush_table(&mut self, table: &str) -> Result<()> {
        let state = self.tables.get_mut(table).expect("table tracked");
        if state.pending.is_empty() {
            return Ok(());
        }

        let is_record = table.ends_with("_record");
        let mut seen_columns: HashSet<String> = HashSet::new();
        for msg in &state.pending {
            for (name, _) in &msg.fields {
                seen_columns.insert(name.clone());
            }
        }
        if is_record {
            for mandatory in RECORD_MANDATORY_FIELDS {
                seen_columns.insert(mandatory.to_string());
            }
        }

        if !state.created {
            let mut columns: Vec<ColumnSpec> = seen_columns
                .iter()
                .map(|name| ColumnSpec {
                    name: name.clone(),
                    sql_type: state
                        .pending
                        .iter()
                        .find_map(|m| m.fields.iter().find(|(n, _)| n == name).map(|(_, v)| sql_type_for(v)))
                        .unwrap_or(SqlType::Text),
                })
                .collect();
            let mut indexes = Vec::new();
            if is_record {
                columns.push(ColumnSpec {
                    name: "spatial_point".to_string(),
                    sql_type: SqlType::Point,
                });
                columns.push(ColumnSpec {
                    name: "paused".to_string(),
                    sql_type: SqlType::Boolean,
                });
                columns.push(ColumnSpec {
                    name: "stopped".to_string(),
                    sql_type: SqlType::Boolean,
                });
                indexes.push(IndexSpec::Spatial("spatial_point".to_string()));
                indexes.push(IndexSpec::Secondary("distance".to_string()));
                indexes.push(IndexSpec::Secondary("timestamp".to_string()));
            }

            self.transport.create_table(&TableSchema {
                name: table.to_string(),
                columns,
                indexes,
            })?;
            state.created = true;
            state.columns = seen_columns.clone();
        } else {
            let new_columns: Vec<ColumnSpec> = seen_columns
                .difference(&state.columns)
                .map(|name| ColumnSpec {
                    name: name.clone(),
                    sql_type: SqlType::Text,
                })
                .collect();
            if !new_columns.is_empty() {
                self.transport.add_columns(table, &new_columns)?;
                state.columns.extend(seen_columns.iter().cloned());
            }
        }

        let message_name = table
            .strip_prefix(&format!("{}_", self.table_prefix))
            .unwrap_or(table)
            .to_string();

        let mut rows = Vec::with_capacity(state.pending.len());
        for msg in state.pending.drain(..) {
            if is_record && !has_all_mandatory_fields(&msg) {
                // spec §4.4.2 "Record insert policy": silently dropped.
                continue;
            }
            rows.push(build_row(&message_name, msg, &self.cfg));
        }

        if !rows.is_empty() {
            self.transport.insert_batch(table, &rows)?;
        }
        Ok(())
    }

    /// Releases every table this sink created (spec §4.4 lifecycle:
    /// "callers must explicitly request drop to release them").
    pub fn drop_tables(&mut self) -> Result<()> {
        for (table, state) in self.tables.iter_mut() {
            if state.created {
                self.transport.drop_table(table)?;
                state.created = false;
                state.columns.clear();
            }
        }
        self.query_cache.clear();
        Ok(())
    }

    /// Spec §4.4.2 read-back: at most one transport query per
    /// `(message, field)` pair, after which the result is cached.
    pub fn get(&mut self, message_name: &str, field_name: &str) -> Result<Column> {
        let key = (message_name.to_string(), field_name.to_string());
        if let Some(cached) = self.query_cache.get(&key) {
            return Ok(cached.clone());
        }

        let table = self.table_name(message_name);
        let rows = self.transport.query_column(&table, field_name)?;

        let column = if message_name == "record" && field_name != "timestamp" {
            let map: std::collections::BTreeMap<i64, DecodedValue> = rows
                .into_iter()
                .filter_map(|(ts, value)| ts.map(|t| (t, value)))
                .collect();
            Column::TimeIndexed(map)
        } else {
            let values: Vec<DecodedValue> = rows.into_iter().map(|(_, value)| value).collect();
            if values.len() == 1 {
                Column::Scalar(values.into_iter().next().unwrap())
            } else {
                Column::Sequence(values)
            }
        };

        self.query_cache.insert(key, column.clone());
        Ok(column)
    }

    /// Spec §4.8: walks the `record` table in ascending-timestamp batches of
    /// [`STOP_POINT_BATCH_SIZE`], enforcing monotonic non-decreasing
    /// `distance` and setting `stopped` from a caller-supplied predicate.
    /// Only meaningful after [`Self::flush`] has persisted every buffered
    /// record, so `flush`es first.
    pub fn compute_stop_points(&mut self, is_stopped: &dyn Fn(&Row) -> u8, pacer: &mut Pacer) -> Result<()> {
        self.flush()?;
        let table = self.table_name("record");

        let mut dist_delta = 0.0_f64;
        let mut last_distance: Option<f64> = None;
        let mut after: Option<i64> = None;

        loop {
            let batch = self.transport.query_record_batch(&table, after, STOP_POINT_BATCH_SIZE)?;
            if batch.is_empty() {
                break;
            }

            let mut updates = Vec::with_capacity(batch.len());
            for (timestamp, mut row) in batch {
                pacer.tick();

                let raw_distance = row.get("distance").and_then(|v| v.as_ref()).and_then(DecodedValue::as_f64);
                if let Some(raw) = raw_distance {
                    let adjusted = raw + dist_delta;
                    if let Some(prev) = last_distance {
                        if adjusted < prev {
                            dist_delta += prev - adjusted;
                        }
                    }
                    let corrected = raw + dist_delta;
                    last_distance = Some(corrected);
                    row.insert("distance".to_string(), Some(DecodedValue::float(corrected)));
                }

                let stopped = is_stopped(&row);
                row.insert("stopped".to_string(), Some(DecodedValue::integer(stopped as i64)));

                after = Some(timestamp);
                updates.push((timestamp, row));
            }

            self.transport.update_rows(&table, &updates)?;
        }

        self.query_cache.remove(&("record".to_string(), "distance".to_string()));
        self.query_cache.remove(&("record".to_string(), "stopped".to_string()));
        Ok(())
    }
}

fn has_all_mandatory_fields(msg: &FitMessage) -> bool {
    RECORD_MANDATORY_FIELDS
        .iter()
        .all(|required| msg.fields.iter().any(|(name, _)| name == required))
}

/// Builds one row, applying the same per-value unit conversion
/// [`crate::postprocess::run`] applies for [`crate::sink::InMemorySink`]
/// (spec §4.5 phase 6) — here per-message rather than per-column, since
/// there's no whole-column view to map over before the transport sees rows.
fn build_row(message_name: &str, msg: FitMessage, cfg: &Config) -> Row {
    let mut row: Row = HashMap::new();
    let mut lat = None;
    let mut lon = None;
    let convert = cfg.units != Units::Raw && UNIT_CONVERTED_MESSAGES.contains(&message_name);

    for (name, value) in msg.fields {
        if message_name == "hrv" {
            if let DecodedValue::Array(items) = &value {
                row.insert(name, Some(DecodedValue::text(hrv_times_json(items))));
                continue;
            }
        }
        let value = if convert {
            match converter_for(profile::kind_for_field(&name), cfg) {
                Some(converter) => map_numeric(&value, &converter),
                None => value,
            }
        } else {
            value
        };
        if message_name == "record" {
            match name.as_str() {
                "position_lat" => lat = value.as_f64(),
                "position_long" => lon = value.as_f64(),
                _ => {}
            }
        }
        row.insert(name, Some(value));
    }

    if message_name == "record" {
        if let (Some(lat), Some(lon)) = (lat, lon) {
            row.insert(
                "spatial_point".to_string(),
                Some(DecodedValue::text(format!("POINT({lon} {lat})"))),
            );
        }
        row.entry("paused".to_string()).or_insert(None);
        row.entry("stopped".to_string()).or_insert(None);
    }

    row
}

impl MessageSink for BatchedTableSink {
    fn insert(&mut self, message: FitMessage) -> Result<()> {
        let table = self.table_name(&message.message_name);
        self.tables.entry(table).or_default().pending.push(message);
        self.buffered_count += 1;
        if self.buffered_count >= BUFFER_THRESHOLD {
            self.flush()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for BatchedTableSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchedTableSink")
            .field("table_prefix", &self.table_prefix)
            .field("buffered_count", &self.buffered_count)
            .finish()
    }
}
