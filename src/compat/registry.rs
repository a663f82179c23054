//! The rule table.
//!
//! Order here is the order in which rule warnings appear in a report.

use crate::compat::field_rules;
use crate::compat::reserved_rules;
use crate::compat::rpc_rules;
use crate::compat::types::RuleFn;

/// A registered rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleDefinition {
    pub id: &'static str,
    /// Runs only in strict mode
    pub strict_only: bool,
    pub description: &'static str,
    pub check: RuleFn,
}

const RULES: &[RuleDefinition] = &[
    RuleDefinition {
        id: "NoUsingReservedFields",
        strict_only: false,
        description: "a reserved field ID or name must not be used by a live field",
        check: reserved_rules::check_no_using_reserved_fields,
    },
    RuleDefinition {
        id: "NoRemovingReservedFields",
        strict_only: true,
        description: "a reserved field ID or name must stay reserved",
        check: reserved_rules::check_no_removing_reserved_fields,
    },
    RuleDefinition {
        id: "NoRemovingFieldsWithoutReserve",
        strict_only: false,
        description: "a removed field must have its ID and name reserved",
        check: reserved_rules::check_no_removing_fields_without_reserve,
    },
    RuleDefinition {
        id: "NoChangingFieldIDs",
        strict_only: false,
        description: "a field keeps its ID",
        check: field_rules::check_no_changing_field_ids,
    },
    RuleDefinition {
        id: "NoChangingFieldTypes",
        strict_only: false,
        description: "a field keeps its type, cardinality and map key type",
        check: field_rules::check_no_changing_field_types,
    },
    RuleDefinition {
        id: "NoChangingFieldNames",
        strict_only: true,
        description: "a field ID keeps its name",
        check: field_rules::check_no_changing_field_names,
    },
    RuleDefinition {
        id: "NoRemovingRPCs",
        strict_only: true,
        description: "an RPC must not be removed from its service",
        check: rpc_rules::check_no_removing_rpcs,
    },
    RuleDefinition {
        id: "NoChangingRPCSignature",
        strict_only: false,
        description: "an RPC keeps its request, response and streaming signature",
        check: rpc_rules::check_no_changing_rpc_signature,
    },
];

/// All rules in report order.
pub fn rules() -> &'static [RuleDefinition] {
    RULES
}

pub const fn rule_count() -> usize {
    RULES.len()
}

/// Verify rule consistency (for testing)
pub fn verify_rules() -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for rule in RULES {
        if !seen.insert(rule.id) {
            return Err(format!("Duplicate rule ID: {}", rule.id));
        }
    }
    Ok(())
}
