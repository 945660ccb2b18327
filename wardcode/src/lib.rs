//! Wardcode: the guard bytecode toolkit.
//!
//! A *guard* is a boolean expression gating a privileged ledger action. It is
//! authored off-chain as a typed expression, compiled into a compact binary
//! blob plus a constant table, stored as ledger state, and later decompiled
//! back into a typed tree for display, audit, and verification planning.
//!
//! The crate is organized around two dual stack machines:
//! - the [`compiler::GuardCompiler`] builder emits bytecode in postfix order
//!   (operands first, then the opcode) while mirroring every emission on a
//!   type stack, so malformed expressions are rejected at build time; and
//! - the [`decompiler`] replays a stored blob against an evaluation stack
//!   using the exact same arity and type rules, reconstructing the tree.
//!
//! Both sides share [`opcode::Operator::check`] and the [`catalog`] so the
//! rules cannot drift apart.
//!
//! Encoding shape
//!  - Postfix bytecode; multi-arity operators carry a trailing arity byte.
//!  - Scalars have fixed widths, strings and vectors are length-prefixed with
//!    a compact u64 varint; see [`wire`].
//!  - Finalized blobs are stored byte-reversed relative to build order, a
//!    convention inherited from the on-chain format; see [`wire::magic`].
//!
//! Example
//! ```
//! use wardcode::{Address, ContextKind, GuardValue, Operator, Param};
//! use wardcode::compiler::GuardCompiler;
//! use wardcode::decompiler::decompile;
//!
//! let admin = Address::new([0xAB; 32]);
//! let mut compiler = GuardCompiler::new();
//! compiler.add_param(Param::Value(GuardValue::Address(admin))).unwrap();
//! compiler.add_param(Param::Context(ContextKind::Signer)).unwrap();
//! compiler.add_logic(Operator::Equal, 2).unwrap();
//! let guard = compiler.build(false).unwrap();
//!
//! let tree = decompile(guard.bytes(), guard.constants()).unwrap();
//! assert!(tree.ret.is_bool());
//! assert_eq!(tree.children.len(), 2);
//! ```

pub mod catalog;
pub mod compiler;
pub mod decompiler;
pub mod error;
pub mod opcode;
pub mod table;
pub mod value;
pub mod wire;

pub use compiler::{CombineOp, CompiledGuard, GuardCompiler, Param};
pub use decompiler::{GuardNode, NodeOp, decompile};
pub use error::{GuardError, GuardResult};
pub use opcode::Operator;
pub use table::{ConstantPayload, ConstantTable};
pub use value::{Address, ContextKind, GuardValue, QueryTarget, ValueType};
