//! The core record-header / definition-message / data-message decode loop
//! (spec §4.1 "record header", §4.2 "decode algorithm").
//!
//! Grounded on the teacher's `FitFile::new` main loop (`lib/fit-rs/src/lib.rs`),
//! which walks the same three record-header shapes (definition, data,
//! compressed-timestamp data) and keeps a 16-slot local-type table. The
//! teacher stops at scale/offset-free `BaseType` values; this module goes
//! one step further and resolves profile metadata + developer descriptors so
//! callers receive fully decoded, named field values.

use crate::basetype::{decode_raw, BaseType, Endianness, RawValue};
use crate::config::Config;
use crate::definition::{DefinitionTable, DeveloperFieldDefinition, FieldDefinition, MessageDefinition};
use crate::developer::DeveloperFieldRegistry;
use crate::error::{FitError, Result};
use crate::hr::HrMessage;
use crate::pacer::Pacer;
use crate::profile::{self, FieldKind};
use crate::value::{apply_scale_offset, DecodedValue, Scalar};

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z),
/// per spec §4.2 step 3.
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

/// One fully decoded FIT message (spec §3 "decoded message").
#[derive(Debug, Clone)]
pub struct FitMessage {
    pub global_mesg_num: u16,
    pub message_name: String,
    pub fields: Vec<(String, DecodedValue)>,
}

enum RecordHeader {
    Definition { local_type: u8, has_developer_fields: bool },
    Data { local_type: u8 },
    CompressedTimestampData { local_type: u8, time_offset: u8 },
}

fn parse_record_header(byte: u8) -> RecordHeader {
    if byte & 0x80 != 0 {
        RecordHeader::CompressedTimestampData {
            local_type: (byte >> 5) & 0b11,
            time_offset: byte & 0b0001_1111,
        }
    } else if byte & 0x40 != 0 {
        RecordHeader::Definition {
            local_type: byte & 0b0000_1111,
            has_developer_fields: byte & 0x20 != 0,
        }
    } else {
        RecordHeader::Data {
            local_type: byte & 0b0000_1111,
        }
    }
}

/// Resolves a 5-bit compressed-timestamp offset against the last full
/// timestamp seen, per spec §4.2 step 4's exact rollover rule.
fn resolve_compressed_timestamp(last: u32, offset: u8) -> u32 {
    let offset = offset as u32;
    let low = last & 0x1F;
    if offset >= low {
        (last & !0x1F) + offset
    } else {
        (last & !0x1F) + offset + 0x20
    }
}

fn take<'a>(data: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = *cursor + len;
    if end > data.len() {
        return Err(FitError::Truncated {
            expected: end,
            read: data.len(),
        });
    }
    let slice = &data[*cursor..end];
    *cursor = end;
    Ok(slice)
}

fn decode_definition(data: &[u8], cursor: &mut usize, local_type: u8, has_dev: bool) -> Result<MessageDefinition> {
    let _reserved = take(data, cursor, 1)?;
    let arch_byte = take(data, cursor, 1)?[0];
    let architecture = Endianness::from_architecture(arch_byte)?;

    let global_bytes = take(data, cursor, 2)?;
    let global_mesg_num = match architecture {
        Endianness::Little => u16::from_le_bytes([global_bytes[0], global_bytes[1]]),
        Endianness::Big => u16::from_be_bytes([global_bytes[0], global_bytes[1]]),
    };

    let num_fields = take(data, cursor, 1)?[0];
    let mut fields = Vec::with_capacity(num_fields as usize);
    for _ in 0..num_fields {
        let raw = take(data, cursor, 3)?;
        let base_type = BaseType::from_id(raw[2])?;
        fields.push(FieldDefinition {
            field_definition_number: raw[0],
            size: raw[1],
            base_type,
        });
    }

    let mut developer_fields = Vec::new();
    if has_dev {
        let num_dev = take(data, cursor, 1)?[0];
        for _ in 0..num_dev {
            let raw = take(data, cursor, 3)?;
            developer_fields.push(DeveloperFieldDefinition {
                field_number: raw[0],
                size: raw[1],
                developer_data_index: raw[2],
            });
        }
    }

    Ok(MessageDefinition {
        local_type,
        architecture,
        global_mesg_num,
        fields,
        developer_fields,
    })
}

/// Applies the FIT epoch shift to a `timestamp`-kind decoded value (spec
/// §4.2 step 3). Resolved at decode time rather than as a separate
/// post-process pass, since every other date-time field downstream
/// (interpolation, pruning) needs Unix-epoch seconds already.
fn shift_epoch(value: DecodedValue) -> DecodedValue {
    match value.as_f64() {
        Some(secs) => DecodedValue::integer(secs as i64 + FIT_EPOCH_OFFSET),
        None => value,
    }
}

fn decode_data_message(
    data: &[u8],
    cursor: &mut usize,
    def: &MessageDefinition,
    developer_registry: &mut DeveloperFieldRegistry,
    last_timestamp: &mut Option<u32>,
    compressed_timestamp: Option<u8>,
    cfg: &Config,
) -> Result<FitMessage> {
    let message_name = profile::message_name(def.global_mesg_num);
    let mut numbered: Vec<(u8, String, DecodedValue)> = Vec::with_capacity(def.fields.len());

    for field_def in &def.fields {
        let raw_bytes = take(data, cursor, field_def.size as usize)?;
        let raw = decode_raw(raw_bytes, field_def.base_type, def.architecture)?;

        let descriptor = profile::field(def.global_mesg_num, field_def.field_definition_number);
        let (name, scale, offset, kind) = match &descriptor {
            Some(d) => (d.name.to_string(), d.scale, d.offset, d.kind),
            None => {
                log::warn!(
                    "unknown field {} in message {} ({message_name})",
                    field_def.field_definition_number,
                    def.global_mesg_num
                );
                (
                    format!("field_{}", field_def.field_definition_number),
                    1.0,
                    0.0,
                    FieldKind::Number,
                )
            }
        };

        if field_def.field_definition_number == profile::TIMESTAMP_FIELD_NUMBER {
            if let RawValue::Uint32(v) = &raw {
                if let Some(&secs) = v.first() {
                    *last_timestamp = Some(secs);
                }
            }
        }

        if !cfg.field_is_allowed(&message_name, &name) {
            continue;
        }

        if raw.is_invalid() {
            if always_null(&message_name, &name) {
                numbered.push((
                    field_def.field_definition_number,
                    name,
                    DecodedValue::Scalar(Scalar::Null),
                ));
            }
            continue;
        }

        let mut value = apply_scale_offset(&raw, scale, offset);
        if kind == FieldKind::DateTime && !cfg.garmin_timestamps {
            value = shift_epoch(value);
        }
        numbered.push((field_def.field_definition_number, name, value));
    }

    for dev_field in &def.developer_fields {
        let desc = developer_registry.require(dev_field.developer_data_index, dev_field.field_number)?;
        let raw_bytes = take(data, cursor, dev_field.size as usize)?;
        let raw = decode_raw(raw_bytes, desc.base_type, def.architecture)?;
        if raw.is_invalid() {
            continue;
        }
        if !cfg.field_is_allowed(&message_name, &desc.field_name) {
            continue;
        }
        let value = apply_scale_offset(&raw, desc.scale, desc.offset);
        numbered.push((dev_field.field_number, desc.field_name.clone(), value));
    }

    // A compressed-timestamp record header supplies a `timestamp` field the
    // message's own definition never declared (spec §4.2 step 4).
    if let Some(offset) = compressed_timestamp {
        let last = last_timestamp.ok_or(FitError::OrphanCompressedTimestamp)?;
        let resolved = resolve_compressed_timestamp(last, offset);
        *last_timestamp = Some(resolved);
        let resolved_secs = resolved as i64;
        let shifted = if cfg.garmin_timestamps {
            resolved_secs
        } else {
            resolved_secs + FIT_EPOCH_OFFSET
        };
        numbered.push((
            profile::TIMESTAMP_FIELD_NUMBER,
            "timestamp".to_string(),
            DecodedValue::integer(shifted),
        ));
    }

    if def.global_mesg_num == 206 {
        let pairs: Vec<(u8, DecodedValue)> = numbered.iter().map(|(n, _, v)| (*n, v.clone())).collect();
        developer_registry.register(&pairs)?;
    }

    Ok(FitMessage {
        global_mesg_num: def.global_mesg_num,
        message_name,
        fields: numbered.into_iter().map(|(_, name, value)| (name, value)).collect(),
    })
}

fn always_null(message_name: &str, field_name: &str) -> bool {
    message_name == "session" && profile::ALWAYS_NULL_SESSION_FIELDS.contains(&field_name)
}

/// Spec §4.2 step 4, third bullet: a `record` data message with neither an
/// explicit timestamp field nor a compressed-timestamp header inherits
/// `max(record.timestamp) + 1`. Updates `max_record_ts` either way so later
/// records can keep inheriting forward.
fn ensure_record_timestamp(msg: &mut FitMessage, max_record_ts: &mut Option<i64>) {
    if msg.message_name != "record" {
        return;
    }
    let existing = msg
        .fields
        .iter()
        .find(|(name, _)| name == "timestamp")
        .and_then(|(_, value)| value.as_f64());

    match existing {
        Some(ts) => {
            let ts = ts as i64;
            *max_record_ts = Some(max_record_ts.map_or(ts, |m| m.max(ts)));
        }
        None => {
            if let Some(inherited) = max_record_ts.map(|m| m + 1) {
                msg.fields
                    .push(("timestamp".to_string(), DecodedValue::integer(inherited)));
                *max_record_ts = Some(inherited);
            }
        }
    }
}

/// Spec §4.2 step 3: a global message absent from the profile, with no
/// developer fields attached, is never decoded — just skipped by its
/// recorded byte length.
fn skip_unknown(def: &MessageDefinition) -> bool {
    !profile::is_known_message(def.global_mesg_num) && def.developer_fields.is_empty()
}

/// Decodes every record in `body` (the FIT stream's bytes between the header
/// and the trailing CRC), returning one [`FitMessage`] per data message in
/// file order (spec §4.2, testable property #2: ordering is preserved), every
/// `hr` message collected separately for burst reassembly (spec §4.7), and
/// the developer-field registry accumulated along the way (spec §4.3's
/// post-decode native-field override needs it after the fact).
pub fn decode_messages(body: &[u8], cfg: &Config) -> Result<(Vec<FitMessage>, Vec<HrMessage>, DeveloperFieldRegistry)> {
    decode_messages_paced(body, cfg, &mut Pacer::disabled())
}

/// Converts an already scale/offset-applied numeric [`DecodedValue`] back
/// into raw bytes (used to feed [`HrMessage::event_timestamp_12`], whose
/// bit-packed layout must be re-examined byte by byte rather than read as a
/// decoded number).
fn decoded_to_bytes(value: &DecodedValue) -> Vec<u8> {
    let scalars: Vec<&Scalar> = match value {
        DecodedValue::Scalar(s) => vec![s],
        DecodedValue::Array(items) => items.iter().collect(),
    };
    scalars
        .into_iter()
        .filter_map(|s| s.as_f64())
        .map(|v| v as u8)
        .collect()
}

fn decoded_to_u32_vec(value: &DecodedValue) -> Vec<u32> {
    match value {
        DecodedValue::Scalar(s) => s.as_f64().map(|v| v as u32).into_iter().collect(),
        DecodedValue::Array(items) => items.iter().filter_map(|s| s.as_f64()).map(|v| v as u32).collect(),
    }
}

/// Builds an [`HrMessage`] from a decoded `hr` (global 132) [`FitMessage`],
/// or `None` when the message carries no `timestamp` (spec §4.7 needs an
/// anchor to project deltas onto the record timeline).
fn build_hr_message(msg: &FitMessage) -> Option<HrMessage> {
    if msg.message_name != "hr" {
        return None;
    }
    let field = |name: &str| msg.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v);

    let timestamp = field("timestamp").and_then(DecodedValue::as_f64)? as i64;
    let event_timestamp_1024 = field("event_timestamp").and_then(DecodedValue::as_f64).map(|v| (v * 1024.0).round() as u32).unwrap_or(0);
    let event_timestamp_12 = field("event_timestamp_12").map(decoded_to_bytes).unwrap_or_default();
    let filtered_bpm = field("filtered_bpm").map(decoded_to_u32_vec).unwrap_or_default();

    Some(HrMessage {
        timestamp,
        event_timestamp_1024,
        event_timestamp_12,
        filtered_bpm,
    })
}

/// Decodes a single record header plus its payload, installing a definition
/// or returning a completed data message. Factored out of
/// [`decode_messages_paced`] so that function can catch a mid-stream error
/// per record and decide, via `Config.partial_on_error`, whether to keep
/// whatever was already committed (spec SPEC_FULL.md §A.1).
fn decode_one_record(
    body: &[u8],
    cursor: &mut usize,
    defs: &mut DefinitionTable,
    developer_registry: &mut DeveloperFieldRegistry,
    last_timestamp: &mut Option<u32>,
    max_record_ts: &mut Option<i64>,
    cfg: &Config,
) -> Result<Option<FitMessage>> {
    let header_byte = take(body, cursor, 1)?[0];

    match parse_record_header(header_byte) {
        RecordHeader::Definition {
            local_type,
            has_developer_fields,
        } => {
            log::debug!("installing definition for local type {local_type}");
            let def = decode_definition(body, cursor, local_type, has_developer_fields)?;
            defs.install(def);
            Ok(None)
        }
        RecordHeader::Data { local_type } => {
            log::trace!("data message, local type {local_type}");
            let def = defs.get(local_type).ok_or(FitError::UndefinedLocalType(local_type))?.clone();
            if skip_unknown(&def) {
                log::warn!("skipping unknown global message {} by declared size", def.global_mesg_num);
                take(body, cursor, def.data_message_len())?;
                return Ok(None);
            }
            let mut msg = decode_data_message(body, cursor, &def, developer_registry, last_timestamp, None, cfg)?;
            ensure_record_timestamp(&mut msg, max_record_ts);
            Ok(Some(msg))
        }
        RecordHeader::CompressedTimestampData { local_type, time_offset } => {
            log::trace!("compressed-timestamp data message, local type {local_type}");
            let def = defs.get(local_type).ok_or(FitError::UndefinedLocalType(local_type))?.clone();
            if skip_unknown(&def) {
                log::warn!("skipping unknown global message {} by declared size", def.global_mesg_num);
                take(body, cursor, def.data_message_len())?;
                return Ok(None);
            }
            let mut msg = decode_data_message(body, cursor, &def, developer_registry, last_timestamp, Some(time_offset), cfg)?;
            ensure_record_timestamp(&mut msg, max_record_ts);
            Ok(Some(msg))
        }
    }
}

/// Same as [`decode_messages`] but ticks `pacer` once per record header
/// (spec §5).
pub fn decode_messages_paced(
    body: &[u8],
    cfg: &Config,
    pacer: &mut Pacer,
) -> Result<(Vec<FitMessage>, Vec<HrMessage>, DeveloperFieldRegistry)> {
    let mut cursor = 0usize;
    let mut defs = DefinitionTable::new();
    let mut developer_registry = DeveloperFieldRegistry::new();
    let mut last_timestamp: Option<u32> = None;
    let mut max_record_ts: Option<i64> = None;
    let mut messages = Vec::new();
    let mut hr_messages = Vec::new();

    while cursor < body.len() {
        pacer.tick();
        match decode_one_record(
            body,
            &mut cursor,
            &mut defs,
            &mut developer_registry,
            &mut last_timestamp,
            &mut max_record_ts,
            cfg,
        ) {
            Ok(Some(msg)) => {
                if let Some(hr) = build_hr_message(&msg) {
                    hr_messages.push(hr);
                }
                messages.push(msg);
            }
            Ok(None) => {}
            Err(e) => {
                if cfg.partial_on_error && !messages.is_empty() {
                    log::warn!(
                        "stopping decode early after error with {} messages already committed: {e}",
                        messages.len()
                    );
                    return Ok((messages, hr_messages, developer_registry));
                }
                return Err(e);
            }
        }
    }

    Ok((messages, hr_messages, developer_registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a minimal definition + one data record for global message 0
    /// (`file_id`), field 4 (`time_created`, uint32, datetime).
    fn sample_body() -> Vec<u8> {
        let mut body = Vec::new();
        // Definition message: header 0x40 (definition, local type 0)
        body.push(0x40);
        body.push(0); // reserved
        body.push(0); // architecture: little endian
        body.extend_from_slice(&0u16.to_le_bytes()); // global_mesg_num = file_id
        body.push(1); // num_fields
        body.extend_from_slice(&[4, 4, 6]); // field 4, size 4, base type uint32 (6)

        // Data message: header 0x00 (data, local type 0)
        body.push(0x00);
        body.extend_from_slice(&100u32.to_le_bytes());
        body
    }

    #[test]
    fn decodes_definition_then_data_message() {
        let (messages, _, _) = decode_messages(&sample_body(), &Config::default()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_name, "file_id");
        let (name, value) = &messages[0].fields[0];
        assert_eq!(name, "time_created");
        assert_eq!(value.as_f64(), Some((100 + FIT_EPOCH_OFFSET) as f64));
    }

    #[test]
    fn undefined_local_type_is_an_error() {
        let mut body = Vec::new();
        body.push(0x05); // data, local type 5, never defined
        let err = decode_messages(&body, &Config::default()).unwrap_err();
        assert!(matches!(err, FitError::UndefinedLocalType(5)));
    }

    #[test]
    fn compressed_timestamp_without_prior_timestamp_errors() {
        let mut body = Vec::new();
        body.push(0x40);
        body.push(0);
        body.push(0);
        body.extend_from_slice(&20u16.to_le_bytes()); // record
        body.push(1);
        body.extend_from_slice(&[5, 2, 4]); // distance, uint16
        body.push(0x80); // compressed timestamp header, local type 0, offset 0
        body.extend_from_slice(&[10, 0]);
        let err = decode_messages(&body, &Config::default()).unwrap_err();
        assert!(matches!(err, FitError::OrphanCompressedTimestamp));
    }

    #[test]
    fn resolves_compressed_timestamp_rollover() {
        // offset (5) is less than last's low 5 bits (1000 & 0x1F == 8), so
        // the elapsed time has wrapped past 0x20 ticks since `last`.
        assert_eq!(resolve_compressed_timestamp(1000, 5), (1000 & !0x1F) + 5 + 0x20);
        // last low bits greater than offset rolls over by 32
        let last = 1000u32;
        let low = last & 0x1F;
        if low > 3 {
            let resolved = resolve_compressed_timestamp(last, 3);
            assert_eq!(resolved, (last & !0x1F) + 3 + 0x20);
        }
    }

    fn def_header(local_type: u8, global: u16, fields: &[(u8, u8, u8)]) -> Vec<u8> {
        let mut def = vec![0x40 | local_type, 0, 0];
        def.extend_from_slice(&global.to_le_bytes());
        def.push(fields.len() as u8);
        for (num, size, base) in fields {
            def.extend_from_slice(&[*num, *size, *base]);
        }
        def
    }

    #[test]
    fn unknown_global_message_is_skipped_by_size() {
        let mut body = def_header(0, 65000, &[(0, 4, 6)]);
        body.push(0x00); // data, local type 0
        body.extend_from_slice(&42u32.to_le_bytes());
        let (messages, _, _) = decode_messages(&body, &Config::default()).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn record_without_timestamp_inherits_max_plus_one() {
        let mut body = def_header(0, 20, &[(253, 4, 6), (5, 2, 4)]); // timestamp, distance
        // first record: explicit timestamp 1000, distance 100
        body.push(0x00);
        body.extend_from_slice(&1000u32.to_le_bytes());
        body.extend_from_slice(&100u16.to_le_bytes());

        // second record: definition without timestamp field at all
        body.extend(def_header(1, 20, &[(5, 2, 4)]));
        body.push(0x01);
        body.extend_from_slice(&200u16.to_le_bytes());

        let (messages, _, _) = decode_messages(&body, &Config::default()).unwrap();
        assert_eq!(messages.len(), 2);
        let second_ts = messages[1]
            .fields
            .iter()
            .find(|(n, _)| n == "timestamp")
            .unwrap()
            .1
            .as_f64()
            .unwrap();
        assert_eq!(second_ts, (1000 + FIT_EPOCH_OFFSET + 1) as f64);
    }
}
