//! Constant/witness table and its identifier allocator.
//!
//! Identifiers are single non-zero bytes, allocated from two sub-ranges of
//! one arena owned by the table (and therefore by one compiler instance):
//! witness placeholders ascend from 1, literal constants descend from 255.
//! The cursors meeting is a hard allocation error. Every identifier the
//! bytecode references must exist here, and the declared type recorded here
//! is authoritative during decompilation.

use std::collections::BTreeMap;

use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::error::{GuardError, GuardResult};
use crate::value::{GuardValue, ValueType};
use crate::wire::{self, DynBuf};

/// First identifier handed out to a witness placeholder.
pub const WITNESS_FIRST: u8 = 1;
/// First identifier handed out to a literal constant.
pub const LITERAL_FIRST: u8 = 255;

/// Payload of a constant-table entry.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstantPayload {
    /// A literal known at compile time.
    Literal(GuardValue),
    /// A placeholder whose value the caller supplies at verification time.
    Witness,
}

/// One constant-table entry: a declared type plus its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstantEntry {
    pub value_type: ValueType,
    pub payload: ConstantPayload,
}

/// The constant/witness table scoped to one compiler instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstantTable {
    entries: BTreeMap<u8, ConstantEntry>,
    // Cursors are u16 so the descending side can pass below 1 without
    // wrapping; crossing is detected before any identifier is handed out.
    next_witness: u16,
    next_literal: u16,
}

impl Default for ConstantTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantTable {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_witness: WITNESS_FIRST as u16,
            next_literal: LITERAL_FIRST as u16,
        }
    }

    /// Look up an entry by identifier.
    pub fn get(&self, identifier: u8) -> Option<&ConstantEntry> {
        self.entries.get(&identifier)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &ConstantEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    /// Iterate the witness entries in identifier order.
    pub fn witnesses(&self) -> impl Iterator<Item = (u8, &ValueType)> {
        self.iter()
            .filter(|(_, entry)| entry.payload.is_witness())
            .map(|(id, entry)| (id, &entry.value_type))
    }

    /// Register an entry, allocating an identifier from the correct
    /// sub-range when none is supplied.
    ///
    /// A literal payload must match the declared type; an explicit
    /// identifier must be non-zero and unused. Explicit identifiers do not
    /// move the range cursors.
    pub fn register(
        &mut self,
        value_type: ValueType,
        payload: ConstantPayload,
        identifier: Option<u8>,
    ) -> GuardResult<u8> {
        if let ConstantPayload::Literal(value) = &payload {
            if value.value_type() != value_type {
                return Err(GuardError::ValueTypeMismatch {
                    declared: value_type,
                    actual: value.value_type(),
                });
            }
            if !value.verify() {
                return Err(GuardError::ValueOutOfRange(value_type));
            }
        }

        let identifier = match identifier {
            Some(0) => return Err(GuardError::ReservedIdentifier),
            Some(explicit) => {
                if self.entries.contains_key(&explicit) {
                    return Err(GuardError::DuplicateIdentifier(explicit));
                }
                explicit
            }
            None => self.allocate(payload.is_witness())?,
        };

        debug!(
            "constant table: registered {} entry {} of type {}",
            if payload.is_witness() { "witness" } else { "literal" },
            identifier,
            value_type,
        );
        self.entries.insert(
            identifier,
            ConstantEntry {
                value_type,
                payload,
            },
        );
        Ok(identifier)
    }

    /// Take the next free identifier from the witness or literal sub-range,
    /// skipping identifiers already claimed explicitly.
    fn allocate(&mut self, witness: bool) -> GuardResult<u8> {
        loop {
            if self.next_witness > self.next_literal {
                return Err(GuardError::IdentifierSpaceExhausted {
                    witness: self.next_witness,
                    literal: self.next_literal,
                });
            }
            let candidate = if witness {
                let id = self.next_witness as u8;
                self.next_witness += 1;
                id
            } else {
                let id = self.next_literal as u8;
                self.next_literal -= 1;
                id
            };
            if !self.entries.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
    }

    /// Merge another table into this one, for guard combination.
    ///
    /// An identifier bound on both sides is a hard collision unless
    /// `allow_collisions` is set and both bindings are identical.
    pub fn merge(&mut self, other: &ConstantTable, allow_collisions: bool) -> GuardResult<()> {
        for (id, entry) in other.iter() {
            match self.entries.get(&id) {
                None => {
                    self.entries.insert(id, entry.clone());
                }
                Some(existing) if allow_collisions && existing == entry => {}
                Some(_) => return Err(GuardError::ConstantCollision(id)),
            }
        }
        self.next_witness = self.next_witness.max(other.next_witness);
        self.next_literal = self.next_literal.min(other.next_literal);
        Ok(())
    }

    /// Encode every entry to its stored wire form: the declared type tags,
    /// followed by the encoded value for literals. Witness entries carry no
    /// bytes beyond their type tags.
    pub fn encode(&self) -> GuardResult<Vec<(u8, Vec<u8>)>> {
        let mut out = Vec::with_capacity(self.entries.len());
        for (id, entry) in self.iter() {
            let mut buf = DynBuf::new();
            wire::encode_type(&entry.value_type, &mut buf);
            if let ConstantPayload::Literal(value) = &entry.payload {
                wire::encode_value(value, &mut buf)?;
            }
            out.push((id, buf.to_vec()));
        }
        Ok(out)
    }

    /// Decode a table from its stored wire form.
    ///
    /// The allocation cursors are rebuilt past the highest witness and below
    /// the lowest literal identifier, so a decoded table can keep allocating
    /// (for guard combination).
    pub fn decode(stored: &[(u8, Vec<u8>)]) -> GuardResult<Self> {
        let mut table = Self::new();
        for (id, bytes) in stored {
            if *id == 0 {
                return Err(GuardError::ReservedIdentifier);
            }
            let mut input: &[u8] = bytes;
            let value_type = wire::decode_type(&mut input)?;
            let payload = if input.is_empty() {
                ConstantPayload::Witness
            } else {
                let value = wire::decode_value(&value_type, &mut input)?;
                if !input.is_empty() {
                    return Err(GuardError::MalformedValue(
                        "trailing bytes after constant value",
                    ));
                }
                ConstantPayload::Literal(value)
            };
            if table.entries.contains_key(id) {
                return Err(GuardError::DuplicateIdentifier(*id));
            }
            if payload.is_witness() {
                table.next_witness = table.next_witness.max(*id as u16 + 1);
            } else {
                table.next_literal = table.next_literal.min(*id as u16 - 1);
            }
            table.entries.insert(*id, ConstantEntry { value_type, payload });
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn witness_identifiers_ascend_from_one() {
        let mut table = ConstantTable::new();
        for expected in 1..=4u8 {
            let id = table
                .register(ValueType::U64, ConstantPayload::Witness, None)
                .unwrap();
            assert_eq!(id, expected);
        }
    }

    #[test]
    fn literal_identifiers_descend_from_255() {
        let mut table = ConstantTable::new();
        for expected in (252..=255u8).rev() {
            let id = table
                .register(
                    ValueType::U8,
                    ConstantPayload::Literal(GuardValue::U8(expected)),
                    None,
                )
                .unwrap();
            assert_eq!(id, expected);
        }
    }

    #[test]
    fn crossing_cursors_is_an_allocation_error() {
        let mut table = ConstantTable::new();
        for _ in 0..255 {
            table
                .register(ValueType::Bool, ConstantPayload::Witness, None)
                .unwrap();
        }
        let err = table
            .register(ValueType::Bool, ConstantPayload::Witness, None)
            .unwrap_err();
        assert!(matches!(err, GuardError::IdentifierSpaceExhausted { .. }));
        // The literal side is exhausted too: the arena is shared.
        let err = table
            .register(
                ValueType::Bool,
                ConstantPayload::Literal(GuardValue::Bool(true)),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, GuardError::IdentifierSpaceExhausted { .. }));
    }

    #[test]
    fn explicit_identifiers_are_checked() {
        let mut table = ConstantTable::new();
        assert!(matches!(
            table.register(ValueType::Bool, ConstantPayload::Witness, Some(0)),
            Err(GuardError::ReservedIdentifier)
        ));
        table
            .register(ValueType::Bool, ConstantPayload::Witness, Some(42))
            .unwrap();
        assert!(matches!(
            table.register(ValueType::Bool, ConstantPayload::Witness, Some(42)),
            Err(GuardError::DuplicateIdentifier(42))
        ));
    }

    #[test]
    fn allocation_skips_explicitly_claimed_identifiers() {
        let mut table = ConstantTable::new();
        table
            .register(ValueType::Bool, ConstantPayload::Witness, Some(1))
            .unwrap();
        let id = table
            .register(ValueType::Bool, ConstantPayload::Witness, None)
            .unwrap();
        assert_eq!(id, 2);
    }

    #[test]
    fn literal_type_is_validated() {
        let mut table = ConstantTable::new();
        let err = table
            .register(
                ValueType::U64,
                ConstantPayload::Literal(GuardValue::U8(1)),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, GuardError::ValueTypeMismatch { .. }));
    }

    #[test]
    fn wire_roundtrip_preserves_entries_and_cursors() {
        let mut table = ConstantTable::new();
        let w = table
            .register(ValueType::U64, ConstantPayload::Witness, None)
            .unwrap();
        let l = table
            .register(
                ValueType::String,
                ConstantPayload::Literal(GuardValue::String("ops".into())),
                None,
            )
            .unwrap();

        let stored = table.encode().unwrap();
        let decoded = ConstantTable::decode(&stored).unwrap();
        assert_eq!(decoded.get(w).unwrap().payload, ConstantPayload::Witness);
        assert_eq!(
            decoded.get(l).unwrap().payload,
            ConstantPayload::Literal(GuardValue::String("ops".into()))
        );

        // Allocation continues past the decoded identifiers.
        let mut decoded = decoded;
        assert_eq!(
            decoded
                .register(ValueType::Bool, ConstantPayload::Witness, None)
                .unwrap(),
            w + 1
        );
        assert_eq!(
            decoded
                .register(
                    ValueType::Bool,
                    ConstantPayload::Literal(GuardValue::Bool(true)),
                    None
                )
                .unwrap(),
            l - 1
        );
    }

    #[test]
    fn merge_rejects_conflicting_identifiers() {
        let mut a = ConstantTable::new();
        a.register(ValueType::U64, ConstantPayload::Witness, Some(7))
            .unwrap();
        let mut b = ConstantTable::new();
        b.register(ValueType::Bool, ConstantPayload::Witness, Some(7))
            .unwrap();

        let mut merged = a.clone();
        assert!(matches!(
            merged.merge(&b, false),
            Err(GuardError::ConstantCollision(7))
        ));
        assert!(matches!(
            merged.merge(&b, true),
            Err(GuardError::ConstantCollision(7))
        ));

        // Identical bindings merge when explicitly allowed.
        let mut merged = a.clone();
        assert!(merged.merge(&a, false).is_err());
        let mut merged = a.clone();
        merged.merge(&a, true).unwrap();
        assert_eq!(merged.len(), 1);
    }
}
