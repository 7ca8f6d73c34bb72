//! End-to-end post-processing scenarios (spec §4.5), exercised through the
//! full [`decode`] entrypoint rather than by calling `postprocess::run`
//! directly, so these also cover the phase ordering `decode_paced` wires up.

use std::collections::HashSet;

use fitstore::config::{Config, FixField, Units};
use fitstore::sink::Column;
use fitstore::{decode, record_parser::FIT_EPOCH_OFFSET};

fn definition(local_type: u8, global: u16, fields: &[(u8, u8, u8)]) -> Vec<u8> {
    let mut def = vec![0x40 | local_type, 0, 0];
    def.extend_from_slice(&global.to_le_bytes());
    def.push(fields.len() as u8);
    for (num, size, base) in fields {
        def.extend_from_slice(&[*num, *size, *base]);
    }
    def
}

fn wrap_in_file(body: Vec<u8>) -> Vec<u8> {
    let mut file = vec![12u8, 16, 0x1E, 0x08, 0, 0, 0, 0, b'.', b'F', b'I', b'T'];
    let data_size = body.len() as u32;
    file[4..8].copy_from_slice(&data_size.to_le_bytes());
    file.extend(body);
    file
}

/// Two `record` messages a gap apart, carrying `timestamp` + `distance`
/// (uint16, scale 100) at either end of the gap.
fn sparse_distance_records(first_ts: u32, first_distance: u16, last_ts: u32, last_distance: u16) -> Vec<u8> {
    let mut body = definition(0, 20, &[(253, 4, 6), (5, 2, 4)]);
    body.push(0x00);
    body.extend_from_slice(&first_ts.to_le_bytes());
    body.extend_from_slice(&first_distance.to_le_bytes());
    body.push(0x00);
    body.extend_from_slice(&last_ts.to_le_bytes());
    body.extend_from_slice(&last_distance.to_le_bytes());
    body
}

/// Scenario 5 (spec §8): densification fills a 10-second gap between two
/// `record` timestamps with one row per second, and the opted-in `distance`
/// field is linearly interpolated across the new keys.
#[test]
fn densify_then_interpolate_fills_every_second() {
    let body = sparse_distance_records(0, 0, 10, 1000); // distance 0.0 -> 10.0 m
    let file = wrap_in_file(body);

    let mut cfg = Config::default();
    cfg.data_every_second = true;
    cfg.fix_data.insert(FixField::Distance);

    let decoded = decode(&file, &cfg).unwrap();

    match decoded.get("record", "timestamp").unwrap() {
        Column::TimeIndexed(map) => assert_eq!(map.len(), 11),
        _ => panic!("expected time-indexed timestamp column"),
    }
    match decoded.get("record", "distance").unwrap() {
        Column::TimeIndexed(map) => {
            let base = FIT_EPOCH_OFFSET;
            assert_eq!(map[&base].as_f64(), Some(0.0));
            assert_eq!(map[&(base + 5)].as_f64(), Some(5.0));
            assert_eq!(map[&(base + 10)].as_f64(), Some(10.0));
        }
        _ => panic!("expected time-indexed distance column"),
    }
}

/// Without an entry in `fix_data`, a sparse field is left exactly as decoded
/// — no densification side effect sneaks interpolation in for free.
#[test]
fn unrequested_field_is_left_sparse() {
    let body = sparse_distance_records(0, 0, 10, 1000);
    let file = wrap_in_file(body);

    let cfg = Config::default();
    let decoded = decode(&file, &cfg).unwrap();

    match decoded.get("record", "distance").unwrap() {
        Column::TimeIndexed(map) => assert_eq!(map.len(), 2),
        _ => panic!("expected time-indexed distance column"),
    }
}

/// Spec §4.5 phase 6 / §6: statute units convert `distance` (m -> miles) and
/// `speed` (m/s -> mph), and `Units::Raw` performs no conversion, including
/// no semicircle decoding — it reproduces the raw decode of the same file.
#[test]
fn statute_units_convert_distance_and_speed() {
    let mut body = definition(0, 20, &[(253, 4, 6), (5, 2, 4), (6, 2, 4)]);
    body.push(0x00);
    body.extend_from_slice(&0u32.to_le_bytes());
    body.extend_from_slice(&160_934u16.to_le_bytes()); // distance raw -> 1609.34 m (/100 scale)
    body.extend_from_slice(&4470u16.to_le_bytes()); // speed raw -> 4.47 m/s (/1000 scale)

    let file = wrap_in_file(body);

    let mut cfg = Config::default();
    cfg.units = Units::Statute;
    let decoded = decode(&file, &cfg).unwrap();

    let distance_miles = match decoded.get("record", "distance").unwrap() {
        Column::TimeIndexed(map) => *map.values().next().unwrap().as_f64().unwrap(),
        _ => panic!("expected time-indexed column"),
    };
    assert!((distance_miles - 1.0).abs() < 1e-3, "got {distance_miles}");

    let speed_mph = match decoded.get("record", "speed").unwrap() {
        Column::TimeIndexed(map) => *map.values().next().unwrap().as_f64().unwrap(),
        _ => panic!("expected time-indexed column"),
    };
    assert!((speed_mph - 10.0).abs() < 0.1, "got {speed_mph}");

    cfg.units = Units::Raw;
    let raw = decode(&file, &cfg).unwrap();
    match raw.get("record", "distance").unwrap() {
        Column::TimeIndexed(map) => {
            let meters = map.values().next().unwrap().as_f64().unwrap();
            assert!((meters - 1609.34).abs() < 1e-9, "got {meters}");
        }
        _ => panic!("expected time-indexed column"),
    }
}

/// `cadence` defaults missing samples to 0 rather than interpolating or
/// nulling them against a pause, independent of which other fields were
/// requested via `fix_data`.
#[test]
fn cadence_gap_defaults_to_zero_through_full_decode() {
    let mut body = definition(0, 20, &[(253, 4, 6), (4, 1, 2)]); // record: timestamp, cadence (uint8)
    body.push(0x00);
    body.extend_from_slice(&0u32.to_le_bytes());
    body.push(80);
    body.push(0x00);
    body.extend_from_slice(&1u32.to_le_bytes());
    body.push(0xFF); // invalid cadence sample, dropped before interpolation sees it

    let file = wrap_in_file(body);
    let mut cfg = Config::default();
    cfg.fix_data = HashSet::from([FixField::Cadence]);
    let decoded = decode(&file, &cfg).unwrap();

    match decoded.get("record", "cadence").unwrap() {
        Column::TimeIndexed(map) => {
            let base = FIT_EPOCH_OFFSET;
            assert_eq!(map[&base].as_f64(), Some(80.0));
            assert_eq!(map[&(base + 1)].as_f64(), Some(0.0));
        }
        _ => panic!("expected time-indexed cadence column"),
    }
}
