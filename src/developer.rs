//! Developer field descriptors (spec §4.2 step 2, §4.4.2 "developer data").
//!
//! Every developer field is announced by a preceding `field_description`
//! message (global 206) before any data message references it. Grounded on
//! the teacher's `structs::FitDeveloperDataIdMessage` /
//! `FitFieldDescriptionMessage` pair (`lib/fit-rs/src/structs.rs`), which
//! the teacher also keys by `(developer_data_index, field_definition_number)`.

use std::collections::HashMap;

use crate::basetype::BaseType;
use crate::error::{FitError, Result};
use crate::value::DecodedValue;

/// One `field_description` message's worth of metadata (spec §4.4.2).
#[derive(Debug, Clone)]
pub struct DeveloperFieldDescriptor {
    pub developer_data_index: u8,
    pub field_definition_number: u8,
    pub base_type: BaseType,
    pub field_name: String,
    pub scale: f64,
    pub offset: f64,
    pub units: String,
    /// Global message number of the native field this developer field
    /// shadows, if any (spec §4.3 "native_field_num on the record message").
    pub native_mesg_num: Option<u16>,
    pub native_field_num: Option<u8>,
}

/// Registry of developer field descriptors announced so far in the current
/// file decode, plus the raw `field_description`/`developer_data_id`
/// messages callers always see regardless of `limit_data` (spec §6).
#[derive(Debug, Clone, Default)]
pub struct DeveloperFieldRegistry {
    descriptors: HashMap<(u8, u8), DeveloperFieldDescriptor>,
}

impl DeveloperFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a decoded `field_description` (global 206) message's fields.
    /// `fields` is the already-decoded `(field_number, value)` pairs for
    /// that message.
    pub fn register(&mut self, fields: &[(u8, DecodedValue)]) -> Result<()> {
        let mut developer_data_index = None;
        let mut field_definition_number = None;
        let mut fit_base_type_id = None;
        let mut field_name = String::new();
        let mut scale = 1.0;
        let mut offset = 0.0;
        let mut units = String::new();
        let mut native_mesg_num = None;
        let mut native_field_num = None;

        for (num, value) in fields {
            match num {
                0 => developer_data_index = value.as_f64().map(|v| v as u8),
                1 => field_definition_number = value.as_f64().map(|v| v as u8),
                2 => fit_base_type_id = value.as_f64().map(|v| v as u8),
                3 => {
                    if let Some(crate::value::Scalar::Text(s)) = value.as_scalar() {
                        field_name = s.clone();
                    }
                }
                6 => scale = value.as_f64().unwrap_or(1.0).max(1.0),
                7 => offset = value.as_f64().unwrap_or(0.0),
                8 => {
                    if let Some(crate::value::Scalar::Text(s)) = value.as_scalar() {
                        units = s.clone();
                    }
                }
                13 => native_mesg_num = value.as_f64().map(|v| v as u16),
                14 => native_field_num = value.as_f64().map(|v| v as u8),
                _ => {}
            }
        }

        let (Some(developer_data_index), Some(field_definition_number), Some(base_type_id)) =
            (developer_data_index, field_definition_number, fit_base_type_id)
        else {
            // Incomplete descriptor: nothing to register yet, not an error
            // (spec §4.4.2 only requires the descriptor exist by the time a
            // data message references it).
            return Ok(());
        };

        let base_type = BaseType::from_id(base_type_id)?;
        if field_name.is_empty() {
            field_name = format!("developer_field_{field_definition_number}");
        }

        log::debug!(
            "registering developer field descriptor (dev index {developer_data_index}, field {field_definition_number}): {field_name}"
        );

        self.descriptors.insert(
            (developer_data_index, field_definition_number),
            DeveloperFieldDescriptor {
                developer_data_index,
                field_definition_number,
                base_type,
                field_name,
                scale,
                offset,
                units,
                native_mesg_num,
                native_field_num,
            },
        );
        Ok(())
    }

    pub fn get(&self, developer_data_index: u8, field_number: u8) -> Option<&DeveloperFieldDescriptor> {
        self.descriptors.get(&(developer_data_index, field_number))
    }

    /// All descriptors registered so far, for the post-decode `record`
    /// native-field override (spec §4.3).
    pub fn descriptors(&self) -> impl Iterator<Item = &DeveloperFieldDescriptor> {
        self.descriptors.values()
    }

    /// Spec §4.4.2: a data message's developer field that has no matching
    /// descriptor yet is a decode error, not a silent skip, since there is
    /// no way to know its base type or byte width.
    pub fn require(&self, developer_data_index: u8, field_number: u8) -> Result<&DeveloperFieldDescriptor> {
        self.get(developer_data_index, field_number)
            .ok_or(FitError::UnknownFieldDescription {
                developer_data_index,
                field_number,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DecodedValue;

    fn sample_fields() -> Vec<(u8, DecodedValue)> {
        vec![
            (0, DecodedValue::integer(0)),
            (1, DecodedValue::integer(4)),
            (2, DecodedValue::integer(2)), // uint16
            (3, DecodedValue::text("running_smoothness")),
            (6, DecodedValue::integer(10)),
            (7, DecodedValue::integer(0)),
            (8, DecodedValue::text("%")),
        ]
    }

    #[test]
    fn registers_and_resolves_a_descriptor() {
        let mut reg = DeveloperFieldRegistry::new();
        reg.register(&sample_fields()).unwrap();
        let desc = reg.require(0, 4).unwrap();
        assert_eq!(desc.field_name, "running_smoothness");
        assert_eq!(desc.scale, 10.0);
        assert_eq!(desc.units, "%");
    }

    #[test]
    fn unregistered_field_is_an_error() {
        let reg = DeveloperFieldRegistry::new();
        assert!(reg.require(0, 9).is_err());
    }

    #[test]
    fn missing_name_falls_back_to_synthetic_name() {
        let mut reg = DeveloperFieldRegistry::new();
        let mut fields = sample_fields();
        fields.retain(|(n, _)| *n != 3);
        reg.register(&fields).unwrap();
        let desc = reg.require(0, 4).unwrap();
        assert_eq!(desc.field_name, "developer_field_4");
    }
}
