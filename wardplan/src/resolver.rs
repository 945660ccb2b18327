//! Guard resolution: fetch, decompile, classify, follow indirection, emit.
//!
//! Per guard the cycle is fetch → decompile → classify constants → collect
//! and fetch query targets → queue nested guards found behind repository
//! indirection. The cycle repeats level by level as a worklist loop; the
//! depth bound is a loop counter, deliberately not call-stack recursion, so
//! exceeding it is trivially detectable and testable. The bound is an
//! anti-amplification guard, not a tuning knob.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use wardcode::table::ConstantPayload;
use wardcode::{Address, ConstantTable, GuardError, GuardValue, QueryTarget, catalog, decompile};

use crate::error::{ResolveError, ResolveResult};
use crate::plan::{GuardEntry, QueryCall, VerificationPlan, WitnessFill, split_type_tag};
use crate::store::LedgerStore;

/// Maximum number of repository-indirection levels below a requested guard.
pub const MAX_INDIRECTION_DEPTH: usize = 3;

/// Resolve one or more guards into a [`VerificationPlan`].
///
/// `fills` supplies the witness values; a witness without a matching,
/// type-correct fill is a hard error. Nested guards discovered behind
/// repository indirection are resolved the same way, level by level, up to
/// [`MAX_INDIRECTION_DEPTH`]; a guard already planned is not resolved
/// again. On error no partial plan is returned.
pub fn resolve<S: LedgerStore>(
    store: &S,
    guards: &[Address],
    fills: &[WitnessFill],
) -> ResolveResult<VerificationPlan> {
    let mut plan = VerificationPlan::default();
    let mut visited = BTreeSet::new();
    let mut level: Vec<Address> = Vec::new();
    for &id in guards {
        if visited.insert(id) {
            level.push(id);
        }
    }

    let mut depth = 0;
    while !level.is_empty() {
        if depth > MAX_INDIRECTION_DEPTH {
            return Err(ResolveError::DepthExceeded {
                depth,
                bound: MAX_INDIRECTION_DEPTH,
            });
        }
        debug!("resolver: level {} with {} guard(s)", depth, level.len());

        let mut next = Vec::new();
        for &guard_id in &level {
            let (entry, nested) = resolve_one(store, guard_id, fills)?;
            plan.push_entry(entry);
            for child in nested {
                if visited.insert(child) {
                    next.push(child);
                }
            }
        }
        level = next;
        depth += 1;
    }
    Ok(plan)
}

/// Run the fetch → decompile → classify cycle for a single guard.
fn resolve_one<S: LedgerStore>(
    store: &S,
    guard_id: Address,
    fills: &[WitnessFill],
) -> ResolveResult<(GuardEntry, Vec<Address>)> {
    let stored = store.fetch_guard(guard_id)?;
    let table = ConstantTable::decode(&stored.constants)?;
    let root = decompile(&stored.bytecode, &table)?;

    // Classify the table: literals pass through, witnesses need a matching,
    // type-correct fill.
    let mut literals = Vec::new();
    let mut witnesses = Vec::new();
    for (identifier, entry) in table.iter() {
        match &entry.payload {
            ConstantPayload::Literal(value) => literals.push((identifier, value.clone())),
            ConstantPayload::Witness => {
                let fill = find_fill(fills, guard_id, identifier)?;
                if fill.value.value_type() != entry.value_type {
                    return Err(ResolveError::WitnessTypeMismatch {
                        guard: guard_id,
                        identifier,
                        declared: entry.value_type.clone(),
                        found: fill.value.value_type(),
                    });
                }
                witnesses.push((identifier, entry.value_type.clone(), fill.value.clone()));
            }
        }
    }

    // Resolve every query target to a concrete address.
    let query_nodes = root.queries();
    let mut targets = Vec::with_capacity(query_nodes.len());
    for (_, target) in &query_nodes {
        targets.push(target_address(&table, fills, guard_id, *target)?);
    }

    // Deduplicated batch fetch, order-preserving.
    let mut unique = Vec::new();
    for &addr in &targets {
        if !unique.contains(&addr) {
            unique.push(addr);
        }
    }
    let records: BTreeMap<Address, _> = store
        .fetch_batch(&unique)?
        .into_iter()
        .map(|record| (record.id, record))
        .collect();

    let mut queries = Vec::with_capacity(query_nodes.len());
    let mut nested = Vec::new();
    for ((query_id, _), target) in query_nodes.iter().zip(&targets) {
        let spec =
            catalog::query_by_id(*query_id).ok_or(GuardError::UnknownQuery(*query_id))?;
        let record = records
            .get(target)
            .ok_or(ResolveError::ObjectNotFound(*target))?;
        let (base, type_args) = split_type_tag(&record.type_tag);
        queries.push(QueryCall {
            query_id: *query_id,
            target: *target,
            call_target: format!("{}::{}", base, spec.name),
            type_args,
        });

        if catalog::is_indirection(*query_id)
            && let Some(nested_guard) = record.guard
        {
            debug!(
                "resolver: guard {} reaches nested guard {} via query {:#06x}",
                guard_id, nested_guard, query_id
            );
            nested.push(nested_guard);
        }
    }

    Ok((
        GuardEntry {
            guard: guard_id,
            literals,
            witnesses,
            queries,
        },
        nested,
    ))
}

fn find_fill<'a>(
    fills: &'a [WitnessFill],
    guard: Address,
    identifier: u8,
) -> ResolveResult<&'a WitnessFill> {
    fills
        .iter()
        .find(|fill| fill.guard == guard && fill.identifier == identifier)
        .ok_or(ResolveError::MissingWitness { guard, identifier })
}

/// Resolve a query target to the address of the object it reads.
///
/// Constant targets are address-typed by construction (both stack machines
/// enforce it); a witness-backed target takes its address from the caller's
/// fill.
fn target_address(
    table: &ConstantTable,
    fills: &[WitnessFill],
    guard: Address,
    target: QueryTarget,
) -> ResolveResult<Address> {
    match target {
        QueryTarget::Address(address) => Ok(address),
        QueryTarget::Constant(identifier) => {
            let entry = table
                .get(identifier)
                .ok_or(GuardError::UnknownIdentifier(identifier))?;
            match &entry.payload {
                ConstantPayload::Literal(GuardValue::Address(address)) => Ok(*address),
                ConstantPayload::Literal(value) => Err(GuardError::InvalidQueryTarget {
                    identifier,
                    ty: value.value_type(),
                }
                .into()),
                ConstantPayload::Witness => match &find_fill(fills, guard, identifier)?.value {
                    GuardValue::Address(address) => Ok(*address),
                    value => Err(ResolveError::WitnessTypeMismatch {
                        guard,
                        identifier,
                        declared: entry.value_type.clone(),
                        found: value.value_type(),
                    }),
                },
            }
        }
    }
}
