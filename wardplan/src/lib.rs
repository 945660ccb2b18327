//! Wardplan: turns stored guards into executable verification plans.
//!
//! The resolver is the only I/O-performing component of the guard stack. For
//! each requested guard it fetches the stored form, decompiles it through
//! [`wardcode`], separates compile-time constants from runtime witnesses the
//! caller must supply, resolves every query target to a typed call
//! descriptor, and follows repository indirection (targets that carry their
//! own nested guard) up to a fixed depth bound.
//!
//! The output is a flat [`plan::VerificationPlan`]: per-guard witness and
//! query metadata plus an alternating verify/query step sequence consumable
//! by a transaction-assembly layer.

pub mod error;
pub mod plan;
pub mod resolver;
pub mod store;

pub use error::{ResolveError, ResolveResult};
pub use plan::{GuardEntry, PlanStep, QueryCall, VerificationPlan, WitnessFill};
pub use resolver::{MAX_INDIRECTION_DEPTH, resolve};
pub use store::{LedgerStore, ObjectRecord, StoredGuard};
