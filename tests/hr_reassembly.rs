//! End-to-end heart-rate burst reassembly (spec §4.7), exercised through the
//! full [`decode`] entrypoint with a genuine multi-delta `event_timestamp_12`
//! burst rather than the single-sample case already covered in-crate.

use fitstore::config::Config;
use fitstore::record_parser::FIT_EPOCH_OFFSET;
use fitstore::sink::Column;
use fitstore::decode;

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

/// One `hr` (global 132) message whose `event_timestamp_12` burst packs two
/// 12-bit deltas (1024 and 2048 ticks, i.e. +1s and +2s past the message's
/// own `event_timestamp`) across three `filtered_bpm` samples, landing on
/// three consecutive `record.heart_rate` seconds.
#[test]
fn multi_delta_burst_lands_on_three_consecutive_seconds() {
    let mut body = definition(0, 20, &[(253, 4, 6)]); // record: timestamp only
    for ts in 100u32..=102 {
        body.push(0x00);
        body.extend_from_slice(&ts.to_le_bytes());
    }

    // hr: timestamp, event_timestamp (1024ths), event_timestamp_12 (3 raw
    // bytes packing two 12-bit deltas), filtered_bpm (3 uint8 samples).
    body.extend(definition(1, 132, &[(253, 4, 6), (9, 4, 6), (10, 3, 13), (6, 3, 2)]));
    body.push(0x01);
    body.extend_from_slice(&100u32.to_le_bytes()); // timestamp = 100
    body.extend_from_slice(&0u32.to_le_bytes()); // event_timestamp = 0 ticks
    body.extend_from_slice(&[0x00, 0x04, 0x80]); // deltas decode to [1024, 2048] ticks
    body.extend_from_slice(&[100, 110, 120]); // filtered_bpm

    let file = wrap_in_file(body);
    let decoded = decode(&file, &Config::default()).unwrap();

    assert_eq!(decoded.hr_message_count(), 1);

    match decoded.get("record", "heart_rate").unwrap() {
        Column::TimeIndexed(map) => {
            let base = 100 + FIT_EPOCH_OFFSET;
            assert_eq!(map[&base].as_f64(), Some(100.0));
            assert_eq!(map[&(base + 1)].as_f64(), Some(110.0));
            assert_eq!(map[&(base + 2)].as_f64(), Some(120.0));
        }
        _ => panic!("expected time-indexed heart_rate column"),
    }
}

/// A burst whose resolved seconds fall entirely outside the `record` table's
/// timestamp range contributes nothing rather than panicking or extending
/// the record timeline.
#[test]
fn out_of_range_burst_is_dropped_without_touching_record_timeline() {
    let mut body = definition(0, 20, &[(253, 4, 6)]);
    body.push(0x00);
    body.extend_from_slice(&5000u32.to_le_bytes());

    body.extend(definition(1, 132, &[(253, 4, 6), (9, 4, 6), (6, 1, 2)]));
    body.push(0x01);
    body.extend_from_slice(&0u32.to_le_bytes()); // far outside the lone record's timestamp
    body.extend_from_slice(&0u32.to_le_bytes());
    body.push(70);

    let file = wrap_in_file(body);
    let decoded = decode(&file, &Config::default()).unwrap();

    assert_eq!(decoded.hr_message_count(), 1);
    assert!(decoded.get("record", "heart_rate").is_err());
}
