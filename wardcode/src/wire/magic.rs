//! Wire tags for the guard bytecode and constant-table encodings.
//!
//! Conventions:
//! - Bytecode is postfix: operands first, then the operator byte. Multi-arity
//!   operators append one arity byte after the opcode; unary ones do not.
//! - Scalars have fixed widths (bool/u8: 1, u64: 8, u128: 16, u256/address:
//!   32 bytes, integers little-endian). Strings and vectors carry a compact
//!   u64 varint length prefix; see [`super::integer`].
//! - A finalized blob is stored byte-reversed relative to build order. The
//!   decompiler reverses the whole blob once, then reads front-to-back.
//! - Operator opcodes live as `#[repr(u8)]` discriminants on
//!   [`crate::opcode::Operator`], built from the `OP_*` constants below.

// Value-type tags. Container tags are followed by their element tag.
pub const T_BOOL: u8 = 0x01;
pub const T_ADDRESS: u8 = 0x02;
pub const T_U8: u8 = 0x03;
pub const T_U64: u8 = 0x04;
pub const T_U128: u8 = 0x05;
pub const T_U256: u8 = 0x06;
pub const T_STRING: u8 = 0x07;
pub const T_VECTOR: u8 = 0x08; // followed by the element type tag
pub const T_OPTION: u8 = 0x09; // followed by the element type tag

// Context references. No payload except CONSTANT, which carries one
// identifier byte naming a constant-table entry.
pub const C_SIGNER: u8 = 0x10;
pub const C_CLOCK: u8 = 0x11;
pub const C_SELF: u8 = 0x12;
pub const C_CONSTANT: u8 = 0x13; // payload: identifier byte

// Operator opcodes.
pub const OP_NOT: u8 = 0x20; // unary, no arity byte
pub const OP_AND: u8 = 0x21; // payload: arity byte
pub const OP_OR: u8 = 0x22; // payload: arity byte
pub const OP_EQUAL: u8 = 0x23; // payload: arity byte
pub const OP_GREATER: u8 = 0x24; // payload: arity byte
pub const OP_GREATER_EQ: u8 = 0x25; // payload: arity byte
pub const OP_LESS: u8 = 0x26; // payload: arity byte
pub const OP_LESS_EQ: u8 = 0x27; // payload: arity byte
pub const OP_ADD: u8 = 0x28; // payload: arity byte
pub const OP_SUB: u8 = 0x29; // payload: arity byte
pub const OP_MUL: u8 = 0x2A; // payload: arity byte
pub const OP_DIV: u8 = 0x2B; // payload: arity byte
pub const OP_CONTAINS: u8 = 0x2C; // payload: arity byte
pub const OP_TO_ADDRESS: u8 = 0x2D; // unary, no arity byte

// External query opcode.
// Payload: target-kind byte, then a 32-byte address (Q_TARGET_ADDRESS) or a
// single identifier byte (Q_TARGET_CONSTANT), then the query id as u16 LE.
pub const OP_QUERY: u8 = 0x30;
pub const Q_TARGET_ADDRESS: u8 = 0x00;
pub const Q_TARGET_CONSTANT: u8 = 0x01;

// Option presence bytes.
pub const OPT_NONE: u8 = 0x00;
pub const OPT_SOME: u8 = 0x01;
