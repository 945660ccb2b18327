//! The guard compiler: a stateful builder with static type checking.
//!
//! The builder keeps two parallel structures: the byte buffer it emits
//! postfix bytecode into, and a type stack mirroring what a decompiler's
//! evaluation stack would contain at the same point. Every operation
//! validates against the type stack before emitting a single byte, so a
//! successfully built guard is type-correct by construction.

use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::catalog::{self, QuerySpec};
use crate::error::{GuardError, GuardResult};
use crate::opcode::Operator;
use crate::table::{ConstantPayload, ConstantTable};
use crate::value::{ContextKind, GuardValue, QueryTarget, ValueType};
use crate::wire::{self, DynBuf, magic};

/// One operand pushed onto the expression under construction.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum Param {
    /// An inline literal, emitted as its type tags followed by its encoding.
    Value(GuardValue),
    /// A context reference resolved by the runtime environment.
    Context(ContextKind),
    /// A reference to a registered constant-table entry.
    Constant(u8),
}

/// How two built guards are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum CombineOp {
    And,
    Or,
}

/// Builder for one guard expression. One instance per guard under
/// construction; the type stack and identifier allocator are unsynchronized
/// mutable state.
#[derive(Debug, Clone, Default)]
pub struct GuardCompiler {
    chunks: DynBuf,
    stack: Vec<ValueType>,
    constants: ConstantTable,
}

impl GuardCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current type stack, earliest-pushed first.
    pub fn type_stack(&self) -> &[ValueType] {
        &self.stack
    }

    /// The constant table accumulated so far.
    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    /// Whether the expression reduces to a single boolean and can be built.
    pub fn is_ready(&self) -> bool {
        matches!(self.stack.as_slice(), [ValueType::Bool])
    }

    /// Register a constant-table entry: a literal when `value` is given, a
    /// witness placeholder otherwise. Returns the identifier, auto-allocated
    /// from the correct sub-range when none is supplied.
    pub fn add_constant(
        &mut self,
        value_type: ValueType,
        value: Option<GuardValue>,
        identifier: Option<u8>,
    ) -> GuardResult<u8> {
        let payload = match value {
            Some(value) => ConstantPayload::Literal(value),
            None => ConstantPayload::Witness,
        };
        self.constants.register(value_type, payload, identifier)
    }

    /// Push one operand, emitting its encoding and its type.
    pub fn add_param(&mut self, param: Param) -> GuardResult<()> {
        match param {
            Param::Value(value) => {
                let ty = value.value_type();
                wire::encode_type(&ty, &mut self.chunks);
                wire::encode_value(&value, &mut self.chunks)?;
                self.stack.push(ty);
            }
            Param::Context(context) => {
                let tag = match context {
                    ContextKind::Signer => magic::C_SIGNER,
                    ContextKind::Clock => magic::C_CLOCK,
                    ContextKind::SelfGuard => magic::C_SELF,
                };
                self.chunks.push(tag);
                self.stack.push(context.return_type());
            }
            Param::Constant(identifier) => {
                let entry = self
                    .constants
                    .get(identifier)
                    .ok_or(GuardError::UnknownIdentifier(identifier))?;
                self.chunks.push(magic::C_CONSTANT);
                self.chunks.push(identifier);
                self.stack.push(entry.value_type.clone());
            }
        }
        Ok(())
    }

    /// Push an external query call, looked up by module and name.
    pub fn add_query(&mut self, module: &str, name: &str, target: QueryTarget) -> GuardResult<()> {
        let spec = catalog::query_by_name(module, name).ok_or_else(|| {
            GuardError::UnknownQueryName {
                module: module.to_owned(),
                name: name.to_owned(),
            }
        })?;
        self.push_query(spec, target)
    }

    /// Push an external query call, looked up by its numeric id.
    pub fn add_query_by_id(&mut self, query_id: u16, target: QueryTarget) -> GuardResult<()> {
        let spec = catalog::query_by_id(query_id).ok_or(GuardError::UnknownQuery(query_id))?;
        self.push_query(spec, target)
    }

    fn push_query(&mut self, spec: &QuerySpec, target: QueryTarget) -> GuardResult<()> {
        let needed = spec.params.len();
        if self.stack.len() < needed {
            return Err(GuardError::StackUnderflow {
                needed,
                available: self.stack.len(),
            });
        }
        // The top `needed` stack entries must equal the declared parameter
        // sequence exactly, earliest-pushed first. Order matters.
        let live = &self.stack[self.stack.len() - needed..];
        for (position, (found, expected)) in live.iter().zip(spec.params).enumerate() {
            if found != expected {
                return Err(GuardError::QueryParamMismatch {
                    id: spec.id,
                    position,
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
        }

        self.chunks.push(magic::OP_QUERY);
        match target {
            QueryTarget::Address(address) => {
                self.chunks.push(magic::Q_TARGET_ADDRESS);
                self.chunks.extend_from_slice(address.as_bytes());
            }
            QueryTarget::Constant(identifier) => {
                let entry = self
                    .constants
                    .get(identifier)
                    .ok_or(GuardError::UnknownIdentifier(identifier))?;
                if entry.value_type != ValueType::Address {
                    return Err(GuardError::InvalidQueryTarget {
                        identifier,
                        ty: entry.value_type.clone(),
                    });
                }
                self.chunks.push(magic::Q_TARGET_CONSTANT);
                self.chunks.push(identifier);
            }
        }
        self.chunks.extend_from_slice(&spec.id.to_le_bytes());

        self.stack.truncate(self.stack.len() - needed);
        self.stack.push(spec.returns.clone());
        debug!("compiler: emitted query {}::{}", spec.module, spec.name);
        Ok(())
    }

    /// Push an operator over the top `arity` stack entries.
    pub fn add_logic(&mut self, op: Operator, arity: usize) -> GuardResult<()> {
        if arity > self.stack.len() {
            // Let an impossible declared arity surface as BadArity first.
            op.check_arity_bounds(arity)?;
            return Err(GuardError::StackUnderflow {
                needed: arity,
                available: self.stack.len(),
            });
        }
        let operands = &self.stack[self.stack.len() - arity..];
        let returns = op.check(arity, operands)?;

        self.chunks.push(op.tag());
        if !op.is_unary() {
            self.chunks.push(arity as u8);
        }
        self.stack.truncate(self.stack.len() - arity);
        self.stack.push(returns);
        Ok(())
    }

    /// Finalize into an immutable blob plus the constant table.
    ///
    /// The type stack must hold exactly one boolean. `negate` appends a
    /// trailing NOT. The blob is byte-reversed relative to build order, per
    /// the stored wire convention.
    pub fn build(mut self, negate: bool) -> GuardResult<CompiledGuard> {
        if !self.is_ready() {
            return Err(GuardError::UnfinishedExpression {
                depth: self.stack.len(),
            });
        }
        if negate {
            self.chunks.push(Operator::Not.tag());
        }
        let mut bytes = self.chunks.to_vec();
        bytes.reverse();
        Ok(CompiledGuard {
            bytes: bytes.into_boxed_slice(),
            constants: self.constants,
        })
    }
}

/// A finalized, type-checked guard: the stored byte blob plus its constant
/// table. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompiledGuard {
    bytes: Box<[u8]>,
    constants: ConstantTable,
}

impl CompiledGuard {
    /// The stored blob, byte-reversed relative to build order.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    /// Combine two built guards under a binary AND/OR, producing a compiler
    /// instance that can be combined or built further.
    ///
    /// Constant tables are merged; identifier collisions are hard errors
    /// unless `allow_constant_merge` is set and the colliding bindings are
    /// identical.
    pub fn combine(
        &self,
        other: &CompiledGuard,
        op: CombineOp,
        allow_constant_merge: bool,
    ) -> GuardResult<GuardCompiler> {
        let mut constants = self.constants.clone();
        constants.merge(&other.constants, allow_constant_merge)?;

        let mut chunks = DynBuf::new();
        for blob in [&self.bytes, &other.bytes] {
            // Back to build order before concatenating.
            chunks.extend(blob.iter().rev().copied());
        }
        chunks.push(match op {
            CombineOp::And => Operator::And.tag(),
            CombineOp::Or => Operator::Or.tag(),
        });
        chunks.push(2);

        Ok(GuardCompiler {
            chunks,
            stack: vec![ValueType::Bool],
            constants,
        })
    }
}
