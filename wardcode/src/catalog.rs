//! Static registry of the external query calls a guard may make.
//!
//! Both the compiler and the decompiler validate call shape against this
//! table: an id absent from it, or a live operand-type sequence that does
//! not exactly match the declared parameters, is a hard error.
//!
//! Ids are namespaced: the high byte of a query id is its module ordinal,
//! so cross-module id collisions are structurally impossible.

use crate::value::ValueType;

/// One cataloged query: a typed read of an external ledger object's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub module: &'static str,
    pub name: &'static str,
    /// Stable wire id; high byte = module ordinal.
    pub id: u16,
    /// Declared parameter types, in call order.
    pub params: &'static [ValueType],
    /// Declared return type.
    pub returns: ValueType,
}

// Module ordinals (high byte of the query id).
pub const MODULE_TOKEN: u8 = 0x01;
pub const MODULE_REGISTRY: u8 = 0x02;
pub const MODULE_REPOSITORY: u8 = 0x03;

/// The fixed, versioned query table.
pub const QUERIES: &[QuerySpec] = &[
    QuerySpec {
        module: "token",
        name: "balance",
        id: 0x0101,
        params: &[],
        returns: ValueType::U64,
    },
    QuerySpec {
        module: "token",
        name: "allowance",
        id: 0x0102,
        params: &[ValueType::Address],
        returns: ValueType::U64,
    },
    QuerySpec {
        module: "token",
        name: "frozen",
        id: 0x0103,
        params: &[],
        returns: ValueType::Bool,
    },
    QuerySpec {
        module: "token",
        name: "spent_since",
        id: 0x0104,
        params: &[ValueType::Address, ValueType::U64],
        returns: ValueType::U64,
    },
    QuerySpec {
        module: "registry",
        name: "owner_of",
        id: 0x0201,
        params: &[],
        returns: ValueType::Address,
    },
    QuerySpec {
        module: "registry",
        name: "contains",
        id: 0x0202,
        params: &[ValueType::String],
        returns: ValueType::Bool,
    },
    QuerySpec {
        module: "registry",
        name: "resolve",
        id: 0x0203,
        params: &[ValueType::String],
        returns: ValueType::Address,
    },
    QuerySpec {
        module: "registry",
        name: "entry_at",
        id: 0x0204,
        params: &[ValueType::String, ValueType::U64],
        returns: ValueType::Bool,
    },
    QuerySpec {
        module: "repository",
        name: "guard_of",
        id: 0x0301,
        params: &[],
        returns: ValueType::Address,
    },
    QuerySpec {
        module: "repository",
        name: "payload",
        id: 0x0302,
        params: &[ValueType::String],
        returns: ValueType::String,
    },
    QuerySpec {
        module: "repository",
        name: "exists",
        id: 0x0303,
        params: &[ValueType::String],
        returns: ValueType::Bool,
    },
];

/// Query ids whose target is a repository indirection object, i.e. an
/// object that may carry its own nested guard. The verification-plan
/// resolver follows these, up to its depth bound.
pub const INDIRECTION_QUERIES: &[u16] = &[0x0301, 0x0302, 0x0303];

/// Look up a query by its wire id.
pub fn query_by_id(id: u16) -> Option<&'static QuerySpec> {
    QUERIES.iter().find(|spec| spec.id == id)
}

/// Look up a query by module and name.
pub fn query_by_name(module: &str, name: &str) -> Option<&'static QuerySpec> {
    QUERIES
        .iter()
        .find(|spec| spec.module == module && spec.name == name)
}

/// Whether the given query reads a repository indirection object.
pub fn is_indirection(id: u16) -> bool {
    INDIRECTION_QUERIES.contains(&id)
}
