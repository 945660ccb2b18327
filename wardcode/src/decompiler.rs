//! The guard decompiler: stored blob + constant table back to a typed tree.
//!
//! Pure and stateless with respect to the compiler. Decoding happens in two
//! passes: [`tokenize`] un-reverses the stored blob and cuts it into opcode
//! tokens, then [`resolve`] replays the tokens against an evaluation stack
//! using exactly the compiler's arity/type rules ([`Operator::check`] and
//! the catalog). Any divergence between the two stack machines is a
//! correctness bug, which is why the rules live in one place.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::catalog;
use crate::error::{GuardError, GuardResult};
use crate::opcode::Operator;
use crate::table::ConstantTable;
use crate::value::{Address, ContextKind, GuardValue, QueryTarget, ValueType};
use crate::wire::{self, magic};

/// One decoded bytecode token, in replay order.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum Token {
    Value(GuardValue),
    Context(ContextKind),
    Constant(u8),
    Operator { op: Operator, arity: usize },
    Query { id: u16, target: QueryTarget },
}

/// A node of the decompiled expression tree.
///
/// Produced fresh on every decompile call; not persisted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GuardNode {
    pub op: NodeOp,
    /// Declared return type of this node.
    pub ret: ValueType,
    /// Operand children, earliest-pushed first. Empty for leaves.
    pub children: Vec<GuardNode>,
}

/// What a decompiled node is: a resolved value, an identifier, or an
/// operation over its children.
#[derive(Debug, Clone, PartialEq, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeOp {
    /// An inline literal.
    Value(GuardValue),
    /// A context reference.
    Context(ContextKind),
    /// A constant-table reference; the table holds its type and payload.
    Constant(u8),
    /// An operator over the children.
    Operator(Operator),
    /// An external query call over the children (its parameters).
    Query { id: u16, target: QueryTarget },
}

impl GuardNode {
    fn leaf(op: NodeOp, ret: ValueType) -> Self {
        Self {
            op,
            ret,
            children: Vec::new(),
        }
    }

    /// Visit this node and every descendant, preorder.
    pub fn walk(&self, visit: &mut impl FnMut(&GuardNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Collect every query call in the tree, preorder.
    pub fn queries(&self) -> Vec<(u16, QueryTarget)> {
        let mut out = Vec::new();
        self.walk(&mut |node| {
            if let NodeOp::Query { id, target } = &node.op {
                out.push((*id, *target));
            }
        });
        out
    }
}

/// Cut a stored blob into tokens.
///
/// The blob is reversed first (stored form is byte-reversed relative to
/// build order), then consumed front-to-back one opcode at a time.
pub fn tokenize(blob: &[u8]) -> GuardResult<Vec<Token>> {
    let mut bytes = blob.to_vec();
    bytes.reverse();
    let mut input: &[u8] = &bytes;
    let mut tokens = Vec::new();

    while let Some(&tag) = input.first() {
        match tag {
            magic::T_BOOL..=magic::T_OPTION => {
                let ty = wire::decode_type(&mut input)?;
                let value = wire::decode_value(&ty, &mut input)?;
                tokens.push(Token::Value(value));
            }
            magic::C_SIGNER => {
                input = &input[1..];
                tokens.push(Token::Context(ContextKind::Signer));
            }
            magic::C_CLOCK => {
                input = &input[1..];
                tokens.push(Token::Context(ContextKind::Clock));
            }
            magic::C_SELF => {
                input = &input[1..];
                tokens.push(Token::Context(ContextKind::SelfGuard));
            }
            magic::C_CONSTANT => {
                input = &input[1..];
                tokens.push(Token::Constant(wire::take_byte(&mut input)?));
            }
            magic::OP_QUERY => {
                input = &input[1..];
                let target = match wire::take_byte(&mut input)? {
                    magic::Q_TARGET_ADDRESS => {
                        let mut raw = [0u8; 32];
                        raw.copy_from_slice(wire::take(&mut input, 32)?);
                        QueryTarget::Address(Address::new(raw))
                    }
                    magic::Q_TARGET_CONSTANT => {
                        QueryTarget::Constant(wire::take_byte(&mut input)?)
                    }
                    _ => {
                        return Err(GuardError::MalformedValue(
                            "query target discriminant invalid",
                        ));
                    }
                };
                let mut id_bytes = [0u8; 2];
                id_bytes.copy_from_slice(wire::take(&mut input, 2)?);
                tokens.push(Token::Query {
                    id: u16::from_le_bytes(id_bytes),
                    target,
                });
            }
            other => match Operator::from_tag(other) {
                Some(op) => {
                    input = &input[1..];
                    let arity = if op.is_unary() {
                        1
                    } else {
                        wire::take_byte(&mut input)? as usize
                    };
                    tokens.push(Token::Operator { op, arity });
                }
                None => return Err(GuardError::UnknownOpcode(other)),
            },
        }
    }
    Ok(tokens)
}

/// Replay tokens against an evaluation stack, reconstructing the tree.
///
/// On success the stack holds exactly one node of boolean type; any other
/// end state is a hard error.
pub fn resolve(tokens: &[Token], constants: &ConstantTable) -> GuardResult<GuardNode> {
    let mut stack: Vec<GuardNode> = Vec::new();

    for token in tokens {
        match token {
            Token::Value(value) => {
                let ret = value.value_type();
                stack.push(GuardNode::leaf(NodeOp::Value(value.clone()), ret));
            }
            Token::Context(context) => {
                stack.push(GuardNode::leaf(
                    NodeOp::Context(*context),
                    context.return_type(),
                ));
            }
            Token::Constant(identifier) => {
                let entry = constants
                    .get(*identifier)
                    .ok_or(GuardError::UnknownIdentifier(*identifier))?;
                stack.push(GuardNode::leaf(
                    NodeOp::Constant(*identifier),
                    entry.value_type.clone(),
                ));
            }
            Token::Operator { op, arity } => {
                let children = pop_operands(&mut stack, *arity)?;
                let types: Vec<ValueType> =
                    children.iter().map(|child| child.ret.clone()).collect();
                let ret = op.check(*arity, &types)?;
                stack.push(GuardNode {
                    op: NodeOp::Operator(*op),
                    ret,
                    children,
                });
            }
            Token::Query { id, target } => {
                let spec = catalog::query_by_id(*id).ok_or(GuardError::UnknownQuery(*id))?;
                if let QueryTarget::Constant(identifier) = target {
                    let entry = constants
                        .get(*identifier)
                        .ok_or(GuardError::UnknownIdentifier(*identifier))?;
                    if entry.value_type != ValueType::Address {
                        return Err(GuardError::InvalidQueryTarget {
                            identifier: *identifier,
                            ty: entry.value_type.clone(),
                        });
                    }
                }
                let children = pop_operands(&mut stack, spec.params.len())?;
                for (position, (child, expected)) in
                    children.iter().zip(spec.params).enumerate()
                {
                    if &child.ret != expected {
                        return Err(GuardError::QueryParamMismatch {
                            id: *id,
                            position,
                            expected: expected.clone(),
                            found: child.ret.clone(),
                        });
                    }
                }
                stack.push(GuardNode {
                    op: NodeOp::Query {
                        id: *id,
                        target: *target,
                    },
                    ret: spec.returns.clone(),
                    children,
                });
            }
        }
    }

    match stack.pop() {
        Some(root) if stack.is_empty() && root.ret.is_bool() => Ok(root),
        Some(_) => Err(GuardError::UnfinishedExpression {
            depth: stack.len() + 1,
        }),
        None => Err(GuardError::UnfinishedExpression { depth: 0 }),
    }
}

fn pop_operands(stack: &mut Vec<GuardNode>, arity: usize) -> GuardResult<Vec<GuardNode>> {
    if stack.len() < arity {
        return Err(GuardError::StackUnderflow {
            needed: arity,
            available: stack.len(),
        });
    }
    Ok(stack.split_off(stack.len() - arity))
}

/// Decompile a stored blob plus constant table into a typed tree.
pub fn decompile(blob: &[u8], constants: &ConstantTable) -> GuardResult<GuardNode> {
    resolve(&tokenize(blob)?, constants)
}
