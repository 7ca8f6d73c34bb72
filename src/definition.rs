//! Local message-type definitions (spec §4.2 step 2, §4.1 "local message
//! type").
//!
//! Grounded on the teacher's `structs::FitDefinitionMessage` plus its
//! per-file-decode local-type table (`lib/fit-rs/src/lib.rs`), which the
//! teacher keeps as a plain `HashMap<u8, FitDefinitionMessage>`. Spec §4.1
//! fixes the slot count at 16 (local message types 0-15), so a
//! fixed-size array replaces the hash map.

use crate::basetype::BaseType;

/// One field slot inside a definition message.
#[derive(Debug, Clone, Copy)]
pub struct FieldDefinition {
    pub field_definition_number: u8,
    pub size: u8,
    pub base_type: BaseType,
}

impl FieldDefinition {
    /// Number of elements an array-valued field carries, given its declared
    /// byte `size` and the base type's element width (spec §4.1: "size is a
    /// multiple of the base type's element width for array fields").
    pub fn element_count(&self) -> usize {
        match self.base_type.element_width() {
            Some(width) if width > 0 => (self.size as usize / width).max(1),
            _ => 1,
        }
    }
}

/// One developer field slot, resolved against a previously-seen
/// `field_description` message (spec §4.2 step 2, "developer fields").
#[derive(Debug, Clone, Copy)]
pub struct DeveloperFieldDefinition {
    pub developer_data_index: u8,
    pub field_number: u8,
    pub size: u8,
}

/// A fully parsed definition message: local type, byte order, the global
/// message it describes, and its field layout (spec §4.1).
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    pub local_type: u8,
    pub architecture: crate::basetype::Endianness,
    pub global_mesg_num: u16,
    pub fields: Vec<FieldDefinition>,
    pub developer_fields: Vec<DeveloperFieldDefinition>,
}

impl MessageDefinition {
    /// Total byte length of a data message built from this definition,
    /// excluding the one-byte record header.
    pub fn data_message_len(&self) -> usize {
        let fixed: usize = self.fields.iter().map(|f| f.size as usize).sum();
        let dev: usize = self.developer_fields.iter().map(|f| f.size as usize).sum();
        fixed + dev
    }
}

/// Lifecycle of one of the 16 local-message-type slots (SPEC_FULL.md §B:
/// explicit enum in place of the teacher's implicit `HashMap` absence-means-
/// undefined convention, since spec §4.1 calls out "undefined local type" as
/// a distinct decode error rather than a missing-key lookup).
#[derive(Debug, Clone, Default)]
pub enum SlotState {
    #[default]
    Empty,
    Defined(MessageDefinition),
}

/// The 16 local-message-type slots live for the duration of one file decode
/// (spec §4.1: "local message types are scoped to a single FIT file").
#[derive(Debug, Clone)]
pub struct DefinitionTable {
    slots: [SlotState; 16],
}

impl Default for DefinitionTable {
    fn default() -> Self {
        DefinitionTable {
            slots: Default::default(),
        }
    }
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs (or overwrites) the definition for `local_type`. Spec §4.1:
    /// "a later definition message for the same local type replaces the
    /// earlier one outright".
    pub fn install(&mut self, def: MessageDefinition) {
        let idx = def.local_type as usize;
        self.slots[idx] = SlotState::Defined(def);
    }

    pub fn get(&self, local_type: u8) -> Option<&MessageDefinition> {
        match &self.slots[local_type as usize] {
            SlotState::Defined(def) => Some(def),
            SlotState::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basetype::Endianness;

    fn sample_def(local_type: u8) -> MessageDefinition {
        MessageDefinition {
            local_type,
            architecture: Endianness::Little,
            global_mesg_num: 20,
            fields: vec![FieldDefinition {
                field_definition_number: 253,
                size: 4,
                base_type: BaseType::Uint32,
            }],
            developer_fields: vec![],
        }
    }

    #[test]
    fn unset_slot_is_none() {
        let table = DefinitionTable::new();
        assert!(table.get(3).is_none());
    }

    #[test]
    fn install_then_get_roundtrips() {
        let mut table = DefinitionTable::new();
        table.install(sample_def(3));
        let def = table.get(3).unwrap();
        assert_eq!(def.global_mesg_num, 20);
    }

    #[test]
    fn later_definition_replaces_earlier_for_same_slot() {
        let mut table = DefinitionTable::new();
        table.install(sample_def(0));
        let mut replacement = sample_def(0);
        replacement.global_mesg_num = 21;
        table.install(replacement);
        assert_eq!(table.get(0).unwrap().global_mesg_num, 21);
    }

    #[test]
    fn array_field_element_count_divides_by_width() {
        let fd = FieldDefinition {
            field_definition_number: 6,
            size: 8,
            base_type: BaseType::Uint8,
        };
        assert_eq!(fd.element_count(), 8);
    }
}
