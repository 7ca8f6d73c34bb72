//! End-to-end `BatchedTableSink` scenarios (spec §4.4.2), against a small
//! in-memory [`BatchTransport`] of our own rather than the crate's private
//! test double, so these exercise the sink purely through its public API —
//! the shape a real embedding host's Postgres/SQLite driver would see.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use fitstore::config::{Config, Units};
use fitstore::pacer::Pacer;
use fitstore::record_parser::{decode_messages, FitMessage};
use fitstore::sink::batched::{BatchTransport, BatchedTableSink, ColumnSpec, Row, TableSchema, BUFFER_THRESHOLD};
use fitstore::sink::{Column, MessageSink};
use fitstore::value::DecodedValue;
use fitstore::Result;

#[derive(Default)]
struct Inner {
    created: HashSet<String>,
    altered: HashMap<String, Vec<String>>,
    rows: HashMap<String, Vec<Row>>,
}

#[derive(Clone, Default)]
struct SharedTransport(Rc<RefCell<Inner>>);

impl BatchTransport for SharedTransport {
    fn create_table(&mut self, schema: &TableSchema) -> Result<()> {
        self.0.borrow_mut().created.insert(schema.name.clone());
        Ok(())
    }
    fn add_columns(&mut self, table: &str, columns: &[ColumnSpec]) -> Result<()> {
        self.0
            .borrow_mut()
            .altered
            .entry(table.to_string())
            .or_default()
            .extend(columns.iter().map(|c| c.name.clone()));
        Ok(())
    }
    fn insert_batch(&mut self, table: &str, rows: &[Row]) -> Result<()> {
        self.0.borrow_mut().rows.entry(table.to_string()).or_default().extend(rows.iter().cloned());
        Ok(())
    }
    fn query_column(&mut self, table: &str, column: &str) -> Result<Vec<(Option<i64>, DecodedValue)>> {
        let rows = self.0.borrow().rows.get(table).cloned().unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let ts = row
                    .get("timestamp")
                    .and_then(|v| v.as_ref())
                    .and_then(|v| v.as_f64())
                    .map(|v| v as i64);
                row.get(column).cloned().flatten().map(|v| (ts, v))
            })
            .collect())
    }
    fn drop_table(&mut self, table: &str) -> Result<()> {
        self.0.borrow_mut().rows.remove(table);
        Ok(())
    }
    fn query_record_batch(&mut self, table: &str, after_timestamp: Option<i64>, limit: usize) -> Result<Vec<(i64, Row)>> {
        let mut rows: Vec<(i64, Row)> = self
            .0
            .borrow()
            .rows
            .get(table)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| {
                let ts = row.get("timestamp").and_then(|v| v.as_ref()).and_then(|v| v.as_f64())? as i64;
                Some((ts, row))
            })
            .collect();
        rows.sort_by_key(|(ts, _)| *ts);
        Ok(rows
            .into_iter()
            .filter(|(ts, _)| after_timestamp.map_or(true, |after| *ts > after))
            .take(limit)
            .collect())
    }
    fn update_rows(&mut self, table: &str, updates: &[(i64, Row)]) -> Result<()> {
        let mut inner = self.0.borrow_mut();
        let Some(existing) = inner.rows.get_mut(table) else {
            return Ok(());
        };
        for (ts, new_row) in updates {
            if let Some(slot) = existing.iter_mut().find(|row| {
                row.get("timestamp").and_then(|v| v.as_ref()).and_then(|v| v.as_f64()).map(|v| v as i64) == Some(*ts)
            }) {
                *slot = new_row.clone();
            }
        }
        Ok(())
    }
}

fn event(ts: i64) -> FitMessage {
    FitMessage {
        global_mesg_num: 21,
        message_name: "event".to_string(),
        fields: vec![("timestamp".to_string(), DecodedValue::integer(ts))],
    }
}

fn record(ts: i64, distance: f64) -> FitMessage {
    FitMessage {
        global_mesg_num: 20,
        message_name: "record".to_string(),
        fields: vec![
            ("timestamp".to_string(), DecodedValue::integer(ts)),
            ("position_lat".to_string(), DecodedValue::float(1.0)),
            ("position_long".to_string(), DecodedValue::float(2.0)),
            ("distance".to_string(), DecodedValue::float(distance)),
        ],
    }
}

/// Crossing `BUFFER_THRESHOLD` buffered messages flushes automatically,
/// without an explicit `flush()` call (spec §4.4.2 "Buffering discipline").
#[test]
fn crossing_buffer_threshold_flushes_automatically() {
    let shared = SharedTransport::default();
    let mut sink = BatchedTableSink::new(Box::new(shared.clone()), "acttest", Config::default());

    for ts in 0..(BUFFER_THRESHOLD - 1) as i64 {
        sink.insert(event(ts)).unwrap();
    }
    assert!(shared.0.borrow().rows.get("acttest_event").is_none());

    sink.insert(event((BUFFER_THRESHOLD - 1) as i64)).unwrap();
    assert_eq!(shared.0.borrow().rows.get("acttest_event").map(Vec::len), Some(BUFFER_THRESHOLD));
}

/// A field that first appears in a later batch triggers `add_columns`
/// rather than `create_table` again (spec §4.4.2 "schema evolution").
#[test]
fn new_field_in_later_batch_triggers_add_columns() {
    let shared = SharedTransport::default();
    let mut sink = BatchedTableSink::new(Box::new(shared.clone()), "acttest", Config::default());

    sink.insert(FitMessage {
        global_mesg_num: 21,
        message_name: "event".to_string(),
        fields: vec![("timestamp".to_string(), DecodedValue::integer(0))],
    })
    .unwrap();
    sink.flush().unwrap();
    assert!(!shared.0.borrow().altered.contains_key("acttest_event"));

    sink.insert(FitMessage {
        global_mesg_num: 21,
        message_name: "event".to_string(),
        fields: vec![
            ("timestamp".to_string(), DecodedValue::integer(1)),
            ("data".to_string(), DecodedValue::integer(7)),
        ],
    })
    .unwrap();
    sink.flush().unwrap();

    let inner = shared.0.borrow();
    let altered = inner.altered.get("acttest_event").expect("add_columns was called");
    assert!(altered.contains(&"data".to_string()));
}

/// A `record` message missing any mandatory field (spec §4.4.2 "Record
/// insert policy": `position_lat`, `position_long`, `timestamp`, `distance`)
/// is silently dropped at flush time rather than persisted with nulls.
#[test]
fn incomplete_record_is_dropped_at_flush() {
    let shared = SharedTransport::default();
    let mut sink = BatchedTableSink::new(Box::new(shared.clone()), "acttest", Config::default());

    sink.insert(FitMessage {
        global_mesg_num: 20,
        message_name: "record".to_string(),
        fields: vec![("timestamp".to_string(), DecodedValue::integer(0))],
    })
    .unwrap();
    sink.insert(record(1, 10.0)).unwrap();
    sink.flush().unwrap();

    match sink.get("record", "distance").unwrap() {
        Column::TimeIndexed(map) => {
            assert_eq!(map.len(), 1);
            assert!(map.contains_key(&1));
        }
        _ => panic!("expected time-indexed column"),
    }
}

/// Decoding a byte stream straight into a [`BatchedTableSink`] (the
/// architecture the crate root's docs point hosts at for the relational
/// sink) and then running the spec §4.8 stop-point scan end to end.
#[test]
fn decode_into_batched_sink_then_compute_stop_points() {
    let mut body = vec![0x40, 0, 0];
    body.extend_from_slice(&20u16.to_le_bytes()); // record
    body.push(4); // four fields
    body.extend_from_slice(&[253, 4, 6]); // timestamp
    body.extend_from_slice(&[0, 4, 5]); // position_lat, sint32
    body.extend_from_slice(&[1, 4, 5]); // position_long, sint32
    body.extend_from_slice(&[5, 2, 4]); // distance, uint16

    for (ts, distance) in [(0u32, 1000u16), (1u32, 500u16)] {
        body.push(0x00);
        body.extend_from_slice(&ts.to_le_bytes());
        body.extend_from_slice(&1_000_000i32.to_le_bytes());
        body.extend_from_slice(&2_000_000i32.to_le_bytes());
        body.extend_from_slice(&distance.to_le_bytes());
    }

    let (messages, _, _) = decode_messages(&body, &Config::default()).unwrap();
    assert_eq!(messages.len(), 2);

    let shared = SharedTransport::default();
    let mut sink = BatchedTableSink::new(Box::new(shared.clone()), "acttest", Config::default());
    for msg in messages {
        sink.insert(msg).unwrap();
    }
    sink.flush().unwrap();

    let mut pacer = Pacer::disabled();
    sink.compute_stop_points(&|_row| 0, &mut pacer).unwrap();

    match sink.get("record", "distance").unwrap() {
        Column::TimeIndexed(map) => {
            let base = fitstore::record_parser::FIT_EPOCH_OFFSET;
            // second row's raw distance (5.0m) regresses from the first
            // (10.0m); the stop-point scan repairs it to hold steady.
            assert_eq!(map[&base].as_f64(), Some(10.0));
            assert_eq!(map[&(base + 1)].as_f64(), Some(10.0));
        }
        _ => panic!("expected time-indexed column"),
    }
}

/// Spec §4.5 phase 6 applies to the relational back-end too: `distance` is
/// converted to miles at flush time when `BatchedTableSink` is built with
/// `Units::Statute`, the same conversion `InMemorySink` users get from
/// `postprocess::run`.
#[test]
fn batched_sink_applies_unit_conversion_at_flush() {
    let mut body = vec![0x40, 0, 0];
    body.extend_from_slice(&20u16.to_le_bytes()); // record
    body.push(4);
    body.extend_from_slice(&[253, 4, 6]); // timestamp
    body.extend_from_slice(&[0, 4, 5]); // position_lat, sint32
    body.extend_from_slice(&[1, 4, 5]); // position_long, sint32
    body.extend_from_slice(&[5, 2, 4]); // distance, uint16

    body.push(0x00);
    body.extend_from_slice(&0u32.to_le_bytes());
    body.extend_from_slice(&1_000_000i32.to_le_bytes());
    body.extend_from_slice(&2_000_000i32.to_le_bytes());
    body.extend_from_slice(&160_934u16.to_le_bytes()); // distance raw -> 1609.34 m

    let mut cfg = Config::default();
    cfg.units = Units::Statute;

    let (messages, _, _) = decode_messages(&body, &cfg).unwrap();

    let shared = SharedTransport::default();
    let mut sink = BatchedTableSink::new(Box::new(shared.clone()), "acttest", cfg);
    for msg in messages {
        sink.insert(msg).unwrap();
    }
    sink.flush().unwrap();

    match sink.get("record", "distance").unwrap() {
        Column::TimeIndexed(map) => {
            let base = fitstore::record_parser::FIT_EPOCH_OFFSET;
            let miles = map[&base].as_f64().unwrap();
            assert!((miles - 1.0).abs() < 1e-3, "got {miles}");
        }
        _ => panic!("expected time-indexed column"),
    }
}
