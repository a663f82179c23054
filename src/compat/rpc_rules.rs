//! RPC rules: services must keep the RPCs clients call, with the same
//! signatures.

use crate::compat::handlers::{create_warning, streaming_label};
use crate::compat::types::{RuleContext, RuleResult};
use crate::index;
use crate::lock::Protolock;

/// NoRemovingRPCs - every baseline RPC must still be served. Strict only.
///
/// Removing a whole service reports each of its RPCs.
pub fn check_no_removing_rpcs(
    current: &Protolock,
    updated: &Protolock,
    context: &RuleContext,
) -> RuleResult {
    const RULE: &str = "NoRemovingRPCs";
    if !context.strict {
        return RuleResult::ok();
    }
    let updated_rpcs = index::rpc_names_by_service(updated);

    let mut warnings = Vec::new();
    for (path, services) in &index::rpc_names_by_service(current) {
        for (service, rpcs) in services {
            for rpc in rpcs.keys() {
                if index::lookup(&updated_rpcs, path, service, rpc).is_none() {
                    warnings.push(create_warning(
                        RULE,
                        path,
                        format!(
                            "\"{}\" is missing RPC: \"{}\", which should be available",
                            service, rpc
                        ),
                    ));
                }
            }
        }
    }

    RuleResult::with_warnings(warnings)
}

/// NoChangingRPCSignature - an RPC present on both sides keeps its request
/// and response types and their streaming flags. One warning per changed
/// attribute.
pub fn check_no_changing_rpc_signature(
    current: &Protolock,
    updated: &Protolock,
    _context: &RuleContext,
) -> RuleResult {
    const RULE: &str = "NoChangingRPCSignature";
    let updated_rpcs = index::rpcs_by_service(updated);

    let mut warnings = Vec::new();
    for (path, services) in &index::rpcs_by_service(current) {
        for (service, rpcs) in services {
            for (name, old) in rpcs {
                let Some(new) = index::lookup(&updated_rpcs, path, service, name) else {
                    continue;
                };
                let mut changed = |attribute: &str, new_value: &str, old_value: &str| {
                    warnings.push(create_warning(
                        RULE,
                        path,
                        format!(
                            "\"{}\" RPC: \"{}\" has a different {}: \"{}\", previously \"{}\"",
                            service, name, attribute, new_value, old_value
                        ),
                    ));
                };

                if old.in_type != new.in_type {
                    changed("request type", &new.in_type, &old.in_type);
                }
                if old.out_type != new.out_type {
                    changed("response type", &new.out_type, &old.out_type);
                }
                if old.in_streamed != new.in_streamed {
                    changed(
                        "request streaming",
                        streaming_label(new.in_streamed),
                        streaming_label(old.in_streamed),
                    );
                }
                if old.out_streamed != new.out_streamed {
                    changed(
                        "response streaming",
                        streaming_label(new.out_streamed),
                        streaming_label(old.out_streamed),
                    );
                }
            }
        }
    }

    RuleResult::with_warnings(warnings)
}
