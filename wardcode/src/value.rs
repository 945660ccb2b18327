//! Canonical value model shared by the compiler and the decompiler.
//!
//! The model is deliberately closed: every value a guard can mention is one
//! of the constructors below, and every constructor has a stable one-byte
//! wire tag (see [`crate::wire::magic`]). Containers (`Vector`, `Option`)
//! nest over the scalar constructors.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::error::GuardError;

/// Byte length of a ledger address on the wire.
pub const ADDRESS_LEN: usize = 32;

/// A 32-byte ledger address.
///
/// Displayed and parsed as `0x`-prefixed lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Wrap a raw 32-byte identifier.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(GuardError::MalformedValue("address must be 64 hex digits"));
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        for (i, chunk) in digits.as_bytes().chunks_exact(2).enumerate() {
            let hi = hex_nibble(chunk[0])?;
            let lo = hex_nibble(chunk[1])?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

fn hex_nibble(c: u8) -> Result<u8, GuardError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(GuardError::MalformedValue("invalid hex digit in address")),
    }
}

/// The declared type of a guard expression value.
///
/// Carries a stable wire tag per constructor; container constructors encode
/// their element tag immediately after their own.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueType {
    Bool,
    Address,
    U8,
    U64,
    U128,
    U256,
    String,
    Vector(Box<ValueType>),
    Option(Box<ValueType>),
}

impl ValueType {
    /// Whether this is one of the four unsigned integer widths.
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            ValueType::U8 | ValueType::U64 | ValueType::U128 | ValueType::U256
        )
    }

    /// Widening rank of an integer type (`U8` narrowest, `U256` widest).
    ///
    /// Returns `None` for non-integer types.
    pub const fn integer_rank(&self) -> Option<u8> {
        match self {
            ValueType::U8 => Some(0),
            ValueType::U64 => Some(1),
            ValueType::U128 => Some(2),
            ValueType::U256 => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "bool"),
            ValueType::Address => write!(f, "address"),
            ValueType::U8 => write!(f, "u8"),
            ValueType::U64 => write!(f, "u64"),
            ValueType::U128 => write!(f, "u128"),
            ValueType::U256 => write!(f, "u256"),
            ValueType::String => write!(f, "string"),
            ValueType::Vector(elem) => write!(f, "vector<{}>", elem),
            ValueType::Option(elem) => write!(f, "option<{}>", elem),
        }
    }
}

/// Zero-input references resolved by the runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContextKind {
    /// The address of the account invoking the privileged action.
    Signer,
    /// The current ledger time, milliseconds since the epoch.
    Clock,
    /// The address of the guard being evaluated.
    SelfGuard,
}

impl ContextKind {
    /// The fixed type a context reference evaluates to.
    pub fn return_type(&self) -> ValueType {
        match self {
            ContextKind::Signer | ContextKind::SelfGuard => ValueType::Address,
            ContextKind::Clock => ValueType::U64,
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKind::Signer => write!(f, "signer"),
            ContextKind::Clock => write!(f, "clock"),
            ContextKind::SelfGuard => write!(f, "self"),
        }
    }
}

/// A literal value carried by a guard expression or constant-table entry.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GuardValue {
    Bool(bool),
    Address(Address),
    U8(u8),
    U64(u64),
    U128(u128),
    /// Unsigned 256-bit integer; must stay below `2^256`.
    U256(BigUint),
    String(String),
    /// Homogeneous vector; the element type is declared explicitly so empty
    /// vectors stay typed.
    Vector(ValueType, Vec<GuardValue>),
    /// Optional value over the declared element type.
    Option(ValueType, Option<Box<GuardValue>>),
}

impl GuardValue {
    /// The declared [`ValueType`] of this value. Total.
    pub fn value_type(&self) -> ValueType {
        match self {
            GuardValue::Bool(_) => ValueType::Bool,
            GuardValue::Address(_) => ValueType::Address,
            GuardValue::U8(_) => ValueType::U8,
            GuardValue::U64(_) => ValueType::U64,
            GuardValue::U128(_) => ValueType::U128,
            GuardValue::U256(_) => ValueType::U256,
            GuardValue::String(_) => ValueType::String,
            GuardValue::Vector(elem, _) => ValueType::Vector(Box::new(elem.clone())),
            GuardValue::Option(elem, _) => ValueType::Option(Box::new(elem.clone())),
        }
    }

    /// Check internal consistency: integer range for `U256`, element types
    /// for containers.
    pub fn verify(&self) -> bool {
        match self {
            GuardValue::U256(value) => value.bits() <= 256,
            GuardValue::Vector(elem, items) => items
                .iter()
                .all(|item| &item.value_type() == elem && item.verify()),
            GuardValue::Option(elem, inner) => inner
                .as_ref()
                .is_none_or(|item| &item.value_type() == elem && item.verify()),
            _ => true,
        }
    }
}

/// The target object of a query opcode: a literal address, or a reference to
/// an address-typed constant-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum QueryTarget {
    Address(Address),
    Constant(u8),
}
