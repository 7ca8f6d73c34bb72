//! The static FIT profile catalogue (spec §4.3, §6).
//!
//! Grounded on the teacher's `messages::message_types`/`messages::field_types`
//! lookup functions (`lib/fit-rs/src/messages.rs`), extended with the
//! scale/offset/units/date-time metadata spec §3's `FieldDescriptor` needs —
//! the teacher only tracked names, since it stored raw `BaseType` values and
//! left scaling to callers.

mod messages;

/// What a field's *value* represents, beyond "just a number" — drives unit
/// conversion (spec §4.5 phase 6) and the date-time epoch shift (spec §4.2
/// step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    DateTime,
    SemicirclesAngle,
    DistanceMeters,
    AltitudeMeters,
    SpeedMetersPerSecond,
    TemperatureCelsius,
    Text,
}

/// A profile field entry (spec §3 "FieldDescriptor").
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub scale: f64,
    pub offset: f64,
    pub units: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    const fn new(name: &'static str, scale: f64, offset: f64, units: &'static str) -> Self {
        FieldDescriptor {
            name,
            scale,
            offset,
            units,
            kind: FieldKind::Number,
        }
    }

    const fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }
}

/// field number 253 is the universal `timestamp` field on every message
/// that carries one (spec §4.2 step 3: "date-time fields (field number 253
/// across all messages, ...)").
pub const TIMESTAMP_FIELD_NUMBER: u8 = 253;

/// Returns the human-readable message name for a global message number, or
/// an `UNDEFINED_MESSAGE_TYPE_n`-shaped fallback (spec §4.3: unknown
/// messages are not catalogued, only skipped).
pub fn message_name(global_mesg_num: u16) -> String {
    messages::message_name(global_mesg_num)
}

/// `true` when the profile catalogues this global message number at all
/// (spec §4.2 step 3: an uncatalogued global message with no developer
/// fields is skipped by size rather than decoded).
pub fn is_known_message(global_mesg_num: u16) -> bool {
    messages::is_known_message(global_mesg_num)
}

/// Looks up a field's profile entry for `(global_mesg_num, field_number)`.
/// `field_number == 253` always resolves to a synthetic `timestamp`
/// `DateTime` entry, regardless of whether the message is catalogued,
/// matching spec §4.2 step 3's "across all messages" wording.
pub fn field(global_mesg_num: u16, field_number: u8) -> Option<FieldDescriptor> {
    if field_number == TIMESTAMP_FIELD_NUMBER {
        return Some(
            FieldDescriptor::new("timestamp", 1.0, 0.0, "s").with_kind(FieldKind::DateTime),
        );
    }
    messages::field(global_mesg_num, field_number)
}

/// Session fields that must be emitted as an explicit null when invalid,
/// rather than omitted, to keep columns aligned across files (spec §7).
pub const ALWAYS_NULL_SESSION_FIELDS: &[&str] = &[
    "avg_heart_rate",
    "max_heart_rate",
    "avg_power",
    "max_power",
    "normalized_power",
    "total_work",
    "total_cycles",
    "avg_cadence",
    "max_cadence",
    "avg_fractional_cadence",
    "max_fractional_cadence",
    "training_stress_score",
    "intensity_factor",
    "threshold_power",
    "time_in_hr_zone",
    "total_training_effect",
    "total_ascent",
    "total_descent",
];

/// Resolves the physical [`FieldKind`] for a field on one of the four
/// unit-convertible messages (spec §4.5 phase 6, §6 "session, lap, record,
/// segment_lap") purely by field name. The physical field names (distance,
/// altitude, speed, temperature, lat/long) are shared verbatim across those
/// four messages in the catalogue above, so a name-based lookup avoids
/// threading the original field-number back through the decoded, already
/// name-keyed [`crate::record_parser::FitMessage`].
pub fn kind_for_field(field_name: &str) -> FieldKind {
    messages::kind_for_field(field_name)
}
