//! Error type shared by the compiler, decompiler, codec and constant table.

use thiserror::Error;

use crate::opcode::Operator;
use crate::value::ValueType;

#[derive(Debug, Error)]
pub enum GuardError {
    // Allocation errors.
    #[error(
        "identifier space exhausted: witness cursor {witness} crossed literal cursor {literal}"
    )]
    IdentifierSpaceExhausted { witness: u16, literal: u16 },

    #[error("identifier {0} is already registered in the constant table")]
    DuplicateIdentifier(u8),

    #[error("identifier 0 is reserved and cannot be registered")]
    ReservedIdentifier,

    #[error("constant tables cannot be merged: identifier {0} is bound to different entries")]
    ConstantCollision(u8),

    // Structural and type errors.
    #[error("unknown constant identifier {0}")]
    UnknownIdentifier(u8),

    #[error("operator {op} cannot be applied to {arity} operand(s)")]
    BadArity { op: Operator, arity: usize },

    #[error("stack underflow: {needed} operand(s) required, {available} available")]
    StackUnderflow { needed: usize, available: usize },

    #[error("operator {op} expects {expected} operands, found {found}")]
    OperandTypeMismatch {
        op: Operator,
        expected: &'static str,
        found: ValueType,
    },

    #[error(
        "query {id:#06x} parameter {position} expects type {expected}, stack holds {found}"
    )]
    QueryParamMismatch {
        id: u16,
        position: usize,
        expected: ValueType,
        found: ValueType,
    },

    #[error("unknown query id {0:#06x}")]
    UnknownQuery(u16),

    #[error("unknown query {module}::{name}")]
    UnknownQueryName { module: String, name: String },

    #[error("constant {identifier} of type {ty} cannot be used as a query target")]
    InvalidQueryTarget { identifier: u8, ty: ValueType },

    #[error("literal value of type {actual} does not match declared type {declared}")]
    ValueTypeMismatch {
        declared: ValueType,
        actual: ValueType,
    },

    #[error("value does not fit the declared type {0}")]
    ValueOutOfRange(ValueType),

    #[error("expression does not reduce to a single boolean ({depth} value(s) on the stack)")]
    UnfinishedExpression { depth: usize },

    // Encoding errors.
    #[error("byte stream truncated: {expected} byte(s) expected, {remaining} remaining")]
    Truncated { expected: usize, remaining: usize },

    #[error("unsupported value type tag {0:#04x}")]
    UnknownTypeTag(u8),

    #[error("unsupported opcode {0:#04x}")]
    UnknownOpcode(u8),

    #[error("malformed value encoding: {0}")]
    MalformedValue(&'static str),
}

pub type GuardResult<T> = Result<T, GuardError>;
