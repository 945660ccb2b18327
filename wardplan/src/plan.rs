//! Verification-plan data model.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use wardcode::{Address, GuardValue, ValueType};

/// A caller-supplied value for one witness placeholder of one guard.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WitnessFill {
    pub guard: Address,
    pub identifier: u8,
    pub value: GuardValue,
}

/// One resolved external query call of a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueryCall {
    pub query_id: u16,
    /// The object the query reads.
    pub target: Address,
    /// Call-target identifier derived from the target's concrete runtime
    /// type and the cataloged query name, e.g. `token::Vault::balance`.
    pub call_target: String,
    /// Type arguments extracted from the target's runtime type.
    pub type_args: Vec<String>,
}

/// Decompiled constant/witness metadata plus resolved query calls for one
/// guard in the plan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GuardEntry {
    pub guard: Address,
    /// Literal constants, in identifier order.
    pub literals: Vec<(u8, GuardValue)>,
    /// Witness placeholders with their declared types and matched fills, in
    /// identifier order.
    pub witnesses: Vec<(u8, ValueType, GuardValue)>,
    /// Resolved query calls, in bytecode order.
    pub queries: Vec<QueryCall>,
}

/// One step of the downstream call sequence.
#[derive(Debug, Clone, PartialEq, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlanStep {
    /// Run the guard's verification entry point.
    Verify { guard: Address },
    /// Execute one resolved query call.
    Query { guard: Address, call: QueryCall },
}

/// The resolver's output: per-guard metadata plus the flat, ordered call
/// sequence for the transaction-assembly layer.
///
/// Per guard the sequence contract is verify, then (query, verify) repeated
/// once per query call, so it always starts and ends on a verify step.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VerificationPlan {
    pub entries: Vec<GuardEntry>,
    pub steps: Vec<PlanStep>,
}

impl VerificationPlan {
    /// Append one guard entry and its verify/query step alternation.
    pub(crate) fn push_entry(&mut self, entry: GuardEntry) {
        self.steps.push(PlanStep::Verify { guard: entry.guard });
        for call in &entry.queries {
            self.steps.push(PlanStep::Query {
                guard: entry.guard,
                call: call.clone(),
            });
            self.steps.push(PlanStep::Verify { guard: entry.guard });
        }
        self.entries.push(entry);
    }
}

/// Split a runtime type tag into its base type and type arguments.
///
/// `token::Vault<usd::USD, u64>` yields `("token::Vault", ["usd::USD",
/// "u64"])`. Nested generics stay attached to their outer argument.
pub(crate) fn split_type_tag(type_tag: &str) -> (&str, Vec<String>) {
    let Some((base, args)) = type_tag.split_once('<') else {
        return (type_tag, Vec::new());
    };
    let Some(args) = args.strip_suffix('>') else {
        return (type_tag, Vec::new());
    };

    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in args.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(args[start..i].trim().to_owned());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(args[start..].trim().to_owned());
    (base, out)
}
