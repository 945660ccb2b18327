//! Resolver error type.
//!
//! Structural and encoding failures from the core surface transparently as
//! [`wardcode::GuardError`]; everything else here is a runtime/data error
//! the caller resolves by supplying correct witnesses or well-formed ledger
//! state before retrying.

use thiserror::Error;

use wardcode::{Address, GuardError, ValueType};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("no witness fill supplied for identifier {identifier} of guard {guard}")]
    MissingWitness { guard: Address, identifier: u8 },

    #[error(
        "witness fill for identifier {identifier} of guard {guard} has type {found}, table declares {declared}"
    )]
    WitnessTypeMismatch {
        guard: Address,
        identifier: u8,
        declared: ValueType,
        found: ValueType,
    },

    #[error("object {0} not found in the ledger store")]
    ObjectNotFound(Address),

    #[error("guard {0} not found in the ledger store")]
    GuardNotFound(Address),

    #[error("fetch of {id} failed: {reason}")]
    FetchFailed { id: Address, reason: String },

    #[error("indirection depth {depth} exceeds the bound of {bound}")]
    DepthExceeded { depth: usize, bound: usize },
}

pub type ResolveResult<T> = Result<T, ResolveError>;
