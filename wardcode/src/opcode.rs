//! Operator kinds and their arity/type rules.
//!
//! [`Operator::check`] is the single source of truth for operator typing:
//! the compiler calls it against its type stack before emitting an opcode,
//! and the decompiler calls it against its evaluation stack while replaying
//! a blob. Because both sides run the same exhaustive match, the two stack
//! machines cannot drift apart.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, FromRepr};

use crate::error::{GuardError, GuardResult};
use crate::value::ValueType;
use crate::wire::magic;

/// A guard expression operator.
///
/// The discriminant of each variant is its wire opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs, FromRepr)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Operator {
    /// Boolean negation. Unary.
    Not = magic::OP_NOT,
    /// Boolean conjunction over two or more operands.
    And = magic::OP_AND,
    /// Boolean disjunction over two or more operands.
    Or = magic::OP_OR,
    /// Generic equality; all operands must share one declared type.
    Equal = magic::OP_EQUAL,
    /// Widening integer comparisons over mixed unsigned widths.
    Greater = magic::OP_GREATER,
    GreaterEq = magic::OP_GREATER_EQ,
    Less = magic::OP_LESS,
    LessEq = magic::OP_LESS_EQ,
    /// Widening integer arithmetic; the result takes the widest operand type.
    Add = magic::OP_ADD,
    Sub = magic::OP_SUB,
    Mul = magic::OP_MUL,
    Div = magic::OP_DIV,
    /// Substring test over two or more strings.
    Contains = magic::OP_CONTAINS,
    /// Cast of one unsigned integer to an address. Unary.
    ToAddress = magic::OP_TO_ADDRESS,
}

impl Operator {
    /// The wire opcode of this operator.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Decode an operator from its wire opcode.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::from_repr(tag)
    }

    /// Whether this operator takes exactly one operand and therefore emits
    /// no arity byte.
    pub const fn is_unary(self) -> bool {
        matches!(self, Operator::Not | Operator::ToAddress)
    }

    /// Validate `operands` (in push order, `operands.len() == arity`) against
    /// this operator's family rule and return the result type.
    ///
    /// Family rules:
    /// - `Not`: exactly one boolean, yields bool.
    /// - `ToAddress`: exactly one integer of any width, yields address.
    /// - `And`/`Or`: two or more booleans, yields bool.
    /// - `Equal`: two or more operands of one identical declared type,
    ///   yields bool.
    /// - `Contains`: two or more strings, yields bool.
    /// - comparisons: two or more integers of any mixed widths, yields bool.
    /// - arithmetic: two or more integers of any mixed widths, yields the
    ///   widest operand type.
    pub fn check(self, arity: usize, operands: &[ValueType]) -> GuardResult<ValueType> {
        debug_assert_eq!(arity, operands.len());
        self.check_arity_bounds(arity)?;

        match self {
            Operator::Not => {
                self.require(operands, "boolean", ValueType::is_bool)?;
                Ok(ValueType::Bool)
            }
            Operator::And | Operator::Or => {
                self.require(operands, "boolean", ValueType::is_bool)?;
                Ok(ValueType::Bool)
            }
            Operator::Contains => {
                self.require(operands, "string", ValueType::is_string)?;
                Ok(ValueType::Bool)
            }
            Operator::Equal => {
                let first = &operands[0];
                if let Some(odd) = operands.iter().find(|&ty| ty != first) {
                    return Err(GuardError::OperandTypeMismatch {
                        op: self,
                        expected: "identically typed",
                        found: odd.clone(),
                    });
                }
                Ok(ValueType::Bool)
            }
            Operator::Greater | Operator::GreaterEq | Operator::Less | Operator::LessEq => {
                self.require(operands, "unsigned integer", ValueType::is_integer)?;
                Ok(ValueType::Bool)
            }
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => {
                self.require(operands, "unsigned integer", ValueType::is_integer)?;
                let mut widest = ValueType::U8;
                for ty in operands {
                    if ty.integer_rank() > widest.integer_rank() {
                        widest = ty.clone();
                    }
                }
                Ok(widest)
            }
            Operator::ToAddress => {
                self.require(operands, "unsigned integer", ValueType::is_integer)?;
                Ok(ValueType::Address)
            }
        }
    }

    /// Validate the declared arity against this operator's family: exactly 1
    /// for unary operators, 2..=255 for the rest.
    pub fn check_arity_bounds(self, arity: usize) -> GuardResult<()> {
        if self.is_unary() {
            if arity != 1 {
                return Err(GuardError::BadArity { op: self, arity });
            }
        } else if arity < 2 || arity > u8::MAX as usize {
            return Err(GuardError::BadArity { op: self, arity });
        }
        Ok(())
    }

    fn require(
        self,
        operands: &[ValueType],
        expected: &'static str,
        pred: impl Fn(&ValueType) -> bool,
    ) -> GuardResult<()> {
        match operands.iter().find(|&ty| !pred(ty)) {
            None => Ok(()),
            Some(odd) => Err(GuardError::OperandTypeMismatch {
                op: self,
                expected,
                found: odd.clone(),
            }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::Not => "not",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Equal => "equal",
            Operator::Greater => "greater",
            Operator::GreaterEq => "greater_eq",
            Operator::Less => "less",
            Operator::LessEq => "less_eq",
            Operator::Add => "add",
            Operator::Sub => "sub",
            Operator::Mul => "mul",
            Operator::Div => "div",
            Operator::Contains => "contains",
            Operator::ToAddress => "to_address",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_roundtrip() {
        for op in [
            Operator::Not,
            Operator::And,
            Operator::Or,
            Operator::Equal,
            Operator::Greater,
            Operator::GreaterEq,
            Operator::Less,
            Operator::LessEq,
            Operator::Add,
            Operator::Sub,
            Operator::Mul,
            Operator::Div,
            Operator::Contains,
            Operator::ToAddress,
        ] {
            assert_eq!(Operator::from_tag(op.tag()), Some(op));
        }
        assert_eq!(Operator::from_tag(0x7F), None);
    }

    #[test]
    fn arithmetic_widens_to_the_widest_operand() {
        let ret = Operator::Add
            .check(3, &[ValueType::U8, ValueType::U256, ValueType::U64])
            .unwrap();
        assert_eq!(ret, ValueType::U256);
    }

    #[test]
    fn comparisons_accept_mixed_widths() {
        let ret = Operator::Greater
            .check(2, &[ValueType::U64, ValueType::U128])
            .unwrap();
        assert_eq!(ret, ValueType::Bool);
    }

    #[test]
    fn equal_requires_one_declared_type() {
        assert!(
            Operator::Equal
                .check(2, &[ValueType::U64, ValueType::U64])
                .is_ok()
        );
        let err = Operator::Equal
            .check(2, &[ValueType::U64, ValueType::U128])
            .unwrap_err();
        assert!(matches!(err, GuardError::OperandTypeMismatch { .. }));
    }

    #[test]
    fn unary_arity_is_exact() {
        assert!(matches!(
            Operator::Not.check(2, &[ValueType::Bool, ValueType::Bool]),
            Err(GuardError::BadArity { .. })
        ));
        assert!(matches!(
            Operator::And.check(1, &[ValueType::Bool]),
            Err(GuardError::BadArity { .. })
        ));
    }

    #[test]
    fn cast_accepts_any_integer_width() {
        for ty in [
            ValueType::U8,
            ValueType::U64,
            ValueType::U128,
            ValueType::U256,
        ] {
            assert_eq!(
                Operator::ToAddress.check(1, &[ty]).unwrap(),
                ValueType::Address
            );
        }
        assert!(Operator::ToAddress.check(1, &[ValueType::Bool]).is_err());
    }
}
