//! Decoder configuration (spec §6 "Configuration").

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Unit system used when converting `session`/`lap`/`record`/`segment_lap`
/// fields (spec §4.5 phase 6, §6 unit conversion table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    Metric,
    Statute,
    Raw,
}

impl Default for Units {
    fn default() -> Self {
        Units::Metric
    }
}

impl FromStr for Units {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metric" => Ok(Units::Metric),
            "statute" => Ok(Units::Statute),
            "raw" => Ok(Units::Raw),
            other => Err(FitError::BadOption(format!("unknown units {other:?}"))),
        }
    }
}

/// The record fields `fix_data` can request interpolation for (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixField {
    All,
    Cadence,
    Distance,
    HeartRate,
    LatLon,
    Speed,
    Power,
    Altitude,
    EnhancedSpeed,
    EnhancedAltitude,
}

impl FromStr for FixField {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "all" => FixField::All,
            "cadence" => FixField::Cadence,
            "distance" => FixField::Distance,
            "heart_rate" => FixField::HeartRate,
            "lat_lon" => FixField::LatLon,
            "speed" => FixField::Speed,
            "power" => FixField::Power,
            "altitude" => FixField::Altitude,
            "enhanced_speed" => FixField::EnhancedSpeed,
            "enhanced_altitude" => FixField::EnhancedAltitude,
            other => return Err(FitError::BadOption(format!("unknown fix_data entry {other:?}"))),
        })
    }
}

/// Which `MessageSink` implementation the caller wants (spec §4.4).
#[derive(Debug, Clone, Default)]
pub enum SinkKind {
    #[default]
    InMemory,
    Batched(BatchedSinkOptions),
}

/// Connection-shaped options for the batched/relational sink (spec §6
/// "buffer_input_to_db"). The core never opens a connection itself — these
/// are forwarded verbatim to whatever `BatchSink` the caller constructs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchedSinkOptions {
    pub table_name: String,
    pub data_source_name: String,
    pub username: String,
    pub password: String,
}

impl BatchedSinkOptions {
    /// Sanitizes a table-name prefix: non-alphanumeric characters become `_`
    /// (spec §6).
    pub fn sanitized_table_name(&self) -> String {
        sanitize_identifier(&self.table_name)
    }
}

pub(crate) fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Full decoder configuration (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub units: Units,
    pub pace: bool,
    pub garmin_timestamps: bool,
    pub fix_data: HashSet<FixField>,
    pub data_every_second: bool,
    pub limit_data: HashMap<String, HashSet<String>>,
    pub buffer_input_to_db: bool,
    #[serde(skip)]
    pub sink: SinkKindConfig,
    pub input_is_data: bool,
    pub overwrite_with_dev_data: bool,
    /// Not part of the original option list but required to make
    /// `FitError::Partial`-style recovery an explicit, opt-in choice
    /// (see SPEC_FULL.md §A.1) instead of an implicit variant.
    pub partial_on_error: bool,
}

/// `SinkKind` is not (de)serializable as-is (it holds no serde derive for
/// its in-memory variant's absence of state), so `Config`'s serde impl
/// skips it; callers reconstruct `sink` after deserializing the rest.
#[derive(Debug, Clone, Default)]
pub struct SinkKindConfig(pub SinkKind);

impl Default for Config {
    fn default() -> Self {
        Config {
            units: Units::default(),
            pace: false,
            garmin_timestamps: false,
            fix_data: HashSet::new(),
            data_every_second: false,
            limit_data: HashMap::new(),
            buffer_input_to_db: false,
            sink: SinkKindConfig::default(),
            input_is_data: false,
            overwrite_with_dev_data: true,
            partial_on_error: false,
        }
    }
}

impl Config {
    /// True when `field_name` on `message_name` should be interpolated
    /// (spec §4.5 phase 5, §6 `fix_data`).
    pub fn wants_fix(&self, message_name: &str, field_name: &str) -> bool {
        if message_name != "record" {
            return false;
        }
        if self.fix_data.contains(&FixField::All) {
            return true;
        }
        fix_field_for(field_name)
            .map(|f| self.fix_data.contains(&f))
            .unwrap_or(false)
    }

    /// True when `field_name` on `message_name` should be kept under
    /// `limit_data` (spec §6: "field_description and developer_data_id
    /// fields are always retained").
    pub fn field_is_allowed(&self, message_name: &str, field_name: &str) -> bool {
        if message_name == "field_description" || message_name == "developer_data_id" {
            return true;
        }
        if field_name == "timestamp" {
            return true;
        }
        match self.limit_data.get(message_name) {
            Some(allowed) => allowed.contains(field_name),
            None => true,
        }
    }
}

/// Maps a decoded `record` field name to the `fix_data` entry that covers
/// it. `FixField::from_str` parses the `fix_data` option strings themselves
/// (e.g. `"lat_lon"`), which don't match the sink's actual field names
/// (`position_lat`, `position_long`) — that mapping is done here instead.
fn fix_field_for(field_name: &str) -> Option<FixField> {
    match field_name {
        "position_lat" | "position_long" => Some(FixField::LatLon),
        other => FixField::from_str(other).ok(),
    }
}
