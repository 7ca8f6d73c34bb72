//! Message/field name + scale/offset/units tables.
//!
//! The message-name table is carried over near-verbatim from the teacher's
//! `messages::message_types::get_messagetype` (`lib/fit-rs/src/messages.rs`)
//! so that every global message number the real FIT SDK defines still gets
//! a readable name even when this crate's field-level profile (below)
//! doesn't catalogue its fields. Field-level entries are only populated for
//! the messages spec §6 enumerates as required.

use super::{FieldDescriptor, FieldKind};

pub(super) fn message_name(global: u16) -> String {
    match global {
        0 => "file_id",
        1 => "capabilities",
        2 => "device_settings",
        3 => "user_profile",
        4 => "hrm_profile",
        5 => "sdm_profile",
        6 => "bike_profile",
        7 => "zones_target",
        8 => "hr_zone",
        9 => "power_zone",
        10 => "met_zone",
        12 => "sport",
        15 => "goal",
        18 => "session",
        19 => "lap",
        20 => "record",
        21 => "event",
        23 => "device_info",
        26 => "workout",
        27 => "workout_step",
        28 => "schedule",
        30 => "weight_scale",
        31 => "course",
        32 => "course_point",
        33 => "totals",
        34 => "activity",
        35 => "software",
        37 => "file_capabilities",
        38 => "mesg_capabilities",
        39 => "field_capabilities",
        49 => "file_creator",
        51 => "blood_pressure",
        53 => "speed_zone",
        55 => "monitoring",
        72 => "training_file",
        78 => "hrv",
        80 => "ant_rx",
        81 => "ant_tx",
        82 => "ant_channel_id",
        101 => "length",
        103 => "monitoring_info",
        105 => "pad",
        106 => "slave_device",
        127 => "connectivity",
        128 => "weather_conditions",
        129 => "weather_alert",
        131 => "cadence_zone",
        132 => "hr",
        142 => "segment_lap",
        145 => "memo_glob",
        148 => "segment_id",
        149 => "segment_leaderboard_entry",
        150 => "segment_point",
        151 => "segment_file",
        158 => "workout_session",
        159 => "watchface_settings",
        160 => "gps_metadata",
        161 => "camera_event",
        162 => "timestamp_correlation",
        164 => "gyroscope_data",
        165 => "accelerometer_data",
        167 => "three_d_sensor_calibration",
        169 => "video_frame",
        174 => "obdii_data",
        177 => "nmea_sentence",
        178 => "aviation_attitude",
        184 => "video",
        185 => "video_title",
        186 => "video_description",
        187 => "video_clip",
        188 => "ohr_settings",
        200 => "exd_screen_configuration",
        201 => "exd_data_field_configuration",
        202 => "exd_data_concept_configuration",
        206 => "field_description",
        207 => "developer_data_id",
        208 => "magnetometer_data",
        209 => "barometer_data",
        210 => "one_d_sensor_calibration",
        225 => "set",
        227 => "stress_level",
        258 => "dive_settings",
        259 => "dive_gas",
        262 => "dive_alarm",
        264 => "exercise_title",
        268 => "dive_summary",
        _ => return format!("UNDEFINED_MESSAGE_TYPE_{global}"),
    }
    .to_string()
}

/// Global message numbers spec §6 requires the catalogue to carry fields
/// for.
const KNOWN_MESSAGES: &[u16] = &[
    0, 2, 3, 7, 12, 18, 19, 20, 21, 23, 34, 49, 78, 101, 132, 142, 206, 207, 258, 259, 262, 268,
];

pub(super) fn is_known_message(global: u16) -> bool {
    KNOWN_MESSAGES.contains(&global)
}

const DEG: FieldKind = FieldKind::SemicirclesAngle;
const DIST: FieldKind = FieldKind::DistanceMeters;
const ALT: FieldKind = FieldKind::AltitudeMeters;
const SPD: FieldKind = FieldKind::SpeedMetersPerSecond;
const TEMP: FieldKind = FieldKind::TemperatureCelsius;
const DT: FieldKind = FieldKind::DateTime;
const TXT: FieldKind = FieldKind::Text;

/// Physical kind of a field by name alone, for the unit-conversion pass
/// (spec §4.5 phase 6), which only ever sees already-decoded, name-keyed
/// columns on `session`/`lap`/`record`/`segment_lap`.
pub(super) fn kind_for_field(field_name: &str) -> FieldKind {
    match field_name {
        "position_lat" | "start_position_lat" | "end_position_lat" => DEG,
        "position_long" | "start_position_long" | "end_position_long" => DEG,
        "distance" | "total_distance" => DIST,
        "altitude" | "avg_altitude" | "max_altitude" | "enhanced_altitude" => ALT,
        "speed" | "avg_speed" | "max_speed" | "enhanced_speed" => SPD,
        "temperature" | "avg_temperature" | "max_temperature" => TEMP,
        _ => FieldKind::Number,
    }
}

pub(super) fn field(global: u16, num: u8) -> Option<FieldDescriptor> {
    let f = |name, scale, offset, units, kind| {
        Some(FieldDescriptor::new(name, scale, offset, units).with_kind(kind))
    };
    let plain = |name, scale, offset, units| f(name, scale, offset, units, FieldKind::Number);

    match (global, num) {
        // file_id
        (0, 0) => plain("type", 1.0, 0.0, ""),
        (0, 1) => plain("manufacturer", 1.0, 0.0, ""),
        (0, 2) => plain("product", 1.0, 0.0, ""),
        (0, 3) => plain("serial_number", 1.0, 0.0, ""),
        (0, 4) => f("time_created", 1.0, 0.0, "s", DT),
        (0, 5) => plain("number", 1.0, 0.0, ""),
        (0, 8) => f("product_name", 1.0, 0.0, "", TXT),

        // device_settings
        (2, 0) => plain("active_time_zone", 1.0, 0.0, ""),
        (2, 1) => plain("utc_offset", 1.0, 0.0, "s"),
        (2, 2) => plain("time_offset", 1.0, 0.0, "s"),
        (2, 4) => plain("time_mode", 1.0, 0.0, ""),
        (2, 5) => plain("time_zone_offset", 4.0, 0.0, "hr"),
        (2, 21) => plain("backlight_mode", 1.0, 0.0, ""),

        // user_profile
        (3, 0) => f("friendly_name", 1.0, 0.0, "", TXT),
        (3, 1) => plain("gender", 1.0, 0.0, ""),
        (3, 2) => plain("age", 1.0, 0.0, "years"),
        (3, 3) => plain("height", 100.0, 0.0, "m"),
        (3, 4) => plain("weight", 10.0, 0.0, "kg"),
        (3, 8) => plain("resting_heart_rate", 1.0, 0.0, "bpm"),
        (3, 9) => plain("default_max_running_heart_rate", 1.0, 0.0, "bpm"),
        (3, 10) => plain("default_max_biking_heart_rate", 1.0, 0.0, "bpm"),
        (3, 11) => plain("default_max_heart_rate", 1.0, 0.0, "bpm"),

        // zones_target
        (7, 1) => plain("max_heart_rate", 1.0, 0.0, "bpm"),
        (7, 2) => plain("threshold_heart_rate", 1.0, 0.0, "bpm"),
        (7, 3) => plain("functional_threshold_power", 1.0, 0.0, "watts"),
        (7, 5) => plain("hr_calc_type", 1.0, 0.0, ""),
        (7, 7) => plain("pwr_calc_type", 1.0, 0.0, ""),

        // sport
        (12, 0) => plain("sport", 1.0, 0.0, ""),
        (12, 1) => plain("sub_sport", 1.0, 0.0, ""),
        (12, 3) => f("name", 1.0, 0.0, "", TXT),

        // session / lap / segment_lap share most field numbers in the real
        // profile; kept as separate match arms per message for clarity.
        (18, 0) | (19, 0) | (142, 0) => plain("event", 1.0, 0.0, ""),
        (18, 1) | (19, 1) | (142, 1) => plain("event_type", 1.0, 0.0, ""),
        (18, 2) | (19, 2) | (142, 2) => f("start_time", 1.0, 0.0, "s", DT),
        (18, 3) | (19, 3) | (142, 3) => f("start_position_lat", 1.0, 0.0, "deg", DEG),
        (18, 4) | (19, 4) | (142, 4) => f("start_position_long", 1.0, 0.0, "deg", DEG),
        (18, 5) => plain("sport", 1.0, 0.0, ""),
        (18, 6) => plain("sub_sport", 1.0, 0.0, ""),
        (19, 5) | (142, 5) => f("end_position_lat", 1.0, 0.0, "deg", DEG),
        (19, 6) | (142, 6) => f("end_position_long", 1.0, 0.0, "deg", DEG),
        (18, 7) | (19, 7) | (142, 7) => plain("total_elapsed_time", 1000.0, 0.0, "s"),
        (18, 8) | (19, 8) | (142, 8) => plain("total_timer_time", 1000.0, 0.0, "s"),
        (18, 9) | (19, 9) | (142, 9) | (101, 3) => f("total_distance", 100.0, 0.0, "m", DIST),
        (18, 10) | (19, 10) => plain("total_cycles", 1.0, 0.0, "cycles"),
        (18, 11) | (19, 11) | (142, 11) => plain("total_calories", 1.0, 0.0, "kcal"),
        (18, 14) | (19, 13) | (142, 13) => f("avg_speed", 1000.0, 0.0, "m/s", SPD),
        (18, 15) | (19, 14) | (142, 14) => f("max_speed", 1000.0, 0.0, "m/s", SPD),
        (18, 16) | (19, 15) | (142, 15) => plain("avg_heart_rate", 1.0, 0.0, "bpm"),
        (18, 17) | (19, 16) | (142, 16) => plain("max_heart_rate", 1.0, 0.0, "bpm"),
        (18, 18) | (19, 17) => plain("avg_cadence", 1.0, 0.0, "rpm"),
        (18, 19) | (19, 18) => plain("max_cadence", 1.0, 0.0, "rpm"),
        (18, 20) | (19, 19) => plain("avg_power", 1.0, 0.0, "watts"),
        (18, 21) | (19, 20) => plain("max_power", 1.0, 0.0, "watts"),
        (18, 22) | (19, 21) | (142, 22) => f("total_ascent", 1.0, 0.0, "m", ALT),
        (18, 23) | (19, 22) | (142, 23) => f("total_descent", 1.0, 0.0, "m", ALT),
        (18, 24) => plain("total_training_effect", 10.0, 0.0, ""),
        (18, 34) => f("avg_altitude", 5.0, 500.0, "m", ALT),
        (18, 35) => f("max_altitude", 5.0, 500.0, "m", ALT),
        (18, 41) => f("avg_temperature", 1.0, 0.0, "C", TEMP),
        (18, 42) => f("max_temperature", 1.0, 0.0, "C", TEMP),
        (18, 49) => plain("normalized_power", 1.0, 0.0, "watts"),
        (18, 50) => plain("training_stress_score", 10.0, 0.0, ""),
        (18, 51) => plain("intensity_factor", 1000.0, 0.0, ""),

        // record
        (20, 0) => f("position_lat", 1.0, 0.0, "deg", DEG),
        (20, 1) => f("position_long", 1.0, 0.0, "deg", DEG),
        (20, 2) => f("altitude", 5.0, 500.0, "m", ALT),
        (20, 3) => plain("heart_rate", 1.0, 0.0, "bpm"),
        (20, 4) => plain("cadence", 1.0, 0.0, "rpm"),
        (20, 5) => f("distance", 100.0, 0.0, "m", DIST),
        (20, 6) => f("speed", 1000.0, 0.0, "m/s", SPD),
        (20, 7) => plain("power", 1.0, 0.0, "watts"),
        (20, 13) => f("temperature", 1.0, 0.0, "C", TEMP),
        (20, 31) => plain("gps_accuracy", 1.0, 0.0, "m"),
        (20, 73) => f("enhanced_speed", 1000.0, 0.0, "m/s", SPD),
        (20, 78) => f("enhanced_altitude", 5.0, 500.0, "m", ALT),

        // event
        (21, 0) => plain("event", 1.0, 0.0, ""),
        (21, 1) => plain("event_type", 1.0, 0.0, ""),
        (21, 2) => plain("data16", 1.0, 0.0, ""),
        (21, 3) => plain("data", 1.0, 0.0, ""),
        (21, 4) => plain("event_group", 1.0, 0.0, ""),

        // device_info
        (23, 0) => plain("device_index", 1.0, 0.0, ""),
        (23, 2) => plain("manufacturer", 1.0, 0.0, ""),
        (23, 3) => plain("serial_number", 1.0, 0.0, ""),
        (23, 4) => plain("product", 1.0, 0.0, ""),
        (23, 5) => plain("software_version", 100.0, 0.0, ""),
        (23, 10) => plain("battery_voltage", 256.0, 0.0, "V"),

        // activity
        (34, 0) => plain("total_timer_time", 1000.0, 0.0, "s"),
        (34, 1) => plain("num_sessions", 1.0, 0.0, ""),
        (34, 2) => plain("type", 1.0, 0.0, ""),
        (34, 3) => plain("event", 1.0, 0.0, ""),
        (34, 4) => plain("event_type", 1.0, 0.0, ""),
        (34, 5) => f("local_timestamp", 1.0, 0.0, "s", DT),
        (34, 6) => plain("event_group", 1.0, 0.0, ""),

        // file_creator
        (49, 0) => plain("software_version", 1.0, 0.0, ""),
        (49, 1) => plain("hardware_version", 1.0, 0.0, ""),

        // hrv: field 0 ("time") is a float array of RR-interval seconds,
        // sentinel 65.535 (spec §4.4.1).
        (78, 0) => plain("time", 1.0, 0.0, "s"),

        // length
        (101, 0) => plain("event", 1.0, 0.0, ""),
        (101, 1) => plain("event_type", 1.0, 0.0, ""),
        (101, 2) => f("start_time", 1.0, 0.0, "s", DT),
        (101, 4) => plain("total_timer_time", 1000.0, 0.0, "s"),

        // hr
        (132, 0) => plain("fractional_timestamp", 32768.0, 0.0, "s"),
        (132, 1) => plain("time256", 256.0, 0.0, "s"),
        (132, 6) => plain("filtered_bpm", 1.0, 0.0, "bpm"),
        (132, 9) => plain("event_timestamp", 1024.0, 0.0, "s"),
        (132, 10) => plain("event_timestamp_12", 1.0, 0.0, ""),

        // field_description
        (206, 0) => plain("developer_data_index", 1.0, 0.0, ""),
        (206, 1) => plain("field_definition_number", 1.0, 0.0, ""),
        (206, 2) => plain("fit_base_type_id", 1.0, 0.0, ""),
        (206, 3) => f("field_name", 1.0, 0.0, "", TXT),
        (206, 4) => plain("array", 1.0, 0.0, ""),
        (206, 5) => f("components", 1.0, 0.0, "", TXT),
        (206, 6) => plain("scale", 1.0, 0.0, ""),
        (206, 7) => plain("offset", 1.0, 0.0, ""),
        (206, 8) => f("units", 1.0, 0.0, "", TXT),
        (206, 9) => f("bits", 1.0, 0.0, "", TXT),
        (206, 10) => f("accumulate", 1.0, 0.0, "", TXT),
        (206, 13) => plain("fit_base_unit_id", 1.0, 0.0, ""),
        (206, 14) => plain("native_mesg_num", 1.0, 0.0, ""),
        (206, 15) => plain("native_field_num", 1.0, 0.0, ""),

        // developer_data_id
        (207, 2) => plain("manufacturer_id", 1.0, 0.0, ""),
        (207, 3) => plain("developer_data_index", 1.0, 0.0, ""),
        (207, 4) => plain("application_version", 1.0, 0.0, ""),

        // dive_settings
        (258, 0) => f("name", 1.0, 0.0, "", TXT),
        (258, 1) => plain("model", 1.0, 0.0, ""),
        (258, 2) => plain("gf_low", 1.0, 0.0, "%"),
        (258, 3) => plain("gf_high", 1.0, 0.0, "%"),
        (258, 4) => plain("water_type", 1.0, 0.0, ""),
        (258, 5) => plain("water_density", 1.0, 0.0, "kg/m^3"),

        // dive_gas
        (259, 0) => plain("helium_content", 1.0, 0.0, "%"),
        (259, 1) => plain("oxygen_content", 1.0, 0.0, "%"),
        (259, 2) => plain("status", 1.0, 0.0, ""),

        // dive_alarm
        (262, 0) => f("depth", 1000.0, 0.0, "m", ALT),
        (262, 1) => plain("time", 1.0, 0.0, "s"),
        (262, 2) => plain("enabled", 1.0, 0.0, ""),
        (262, 3) => plain("alarm_type", 1.0, 0.0, ""),
        (262, 4) => plain("sound", 1.0, 0.0, ""),
        (262, 5) => plain("dive_types", 1.0, 0.0, ""),

        // dive_summary
        (268, 0) => plain("reference_mesg", 1.0, 0.0, ""),
        (268, 1) => plain("reference_index", 1.0, 0.0, ""),
        (268, 2) => f("avg_depth", 1000.0, 0.0, "m", ALT),
        (268, 3) => f("max_depth", 1000.0, 0.0, "m", ALT),
        (268, 4) => plain("surface_interval", 1.0, 0.0, "s"),
        (268, 5) => plain("start_cns", 1.0, 0.0, "%"),
        (268, 6) => plain("end_cns", 1.0, 0.0, "%"),
        (268, 7) => plain("start_n2", 1.0, 0.0, "%"),
        (268, 8) => plain("end_n2", 1.0, 0.0, "%"),
        (268, 9) => plain("o2_toxicity", 1.0, 0.0, "OTUs"),
        (268, 10) => plain("dive_number", 1.0, 0.0, ""),
        (268, 11) => plain("bottom_time", 1000.0, 0.0, "s"),

        _ => None,
    }
}
