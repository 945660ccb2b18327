//! Collaborator interface to the ledger.
//!
//! The resolver consumes a fetch-by-id abstraction and nothing else; the
//! network/RPC machinery behind it lives outside this crate. Fetches are
//! synchronous and non-retried here, retry policy belongs to the caller.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ResolveResult;
use wardcode::Address;

/// A ledger object as returned by a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectRecord {
    pub id: Address,
    /// The object's concrete runtime type, e.g. `token::Vault<usd::USD>`.
    pub type_tag: String,
    /// The nested guard carried by a repository indirection object, if any.
    pub guard: Option<Address>,
    /// Raw field bytes; opaque to the resolver.
    pub fields: Vec<u8>,
}

/// A stored guard: the byte-reversed expression blob plus the constant
/// table in its per-identifier wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoredGuard {
    pub id: Address,
    pub bytecode: Vec<u8>,
    pub constants: Vec<(u8, Vec<u8>)>,
}

/// Fetch-by-id access to ledger state.
pub trait LedgerStore {
    /// Fetch one arbitrary ledger object.
    fn fetch(&self, id: Address) -> ResolveResult<ObjectRecord>;

    /// Fetch a stored guard by its id.
    fn fetch_guard(&self, id: Address) -> ResolveResult<StoredGuard>;

    /// Batch fetch; the default implementation loops over [`Self::fetch`].
    /// Implementations backed by an RPC layer should override it.
    fn fetch_batch(&self, ids: &[Address]) -> ResolveResult<Vec<ObjectRecord>> {
        ids.iter().map(|id| self.fetch(*id)).collect()
    }
}
