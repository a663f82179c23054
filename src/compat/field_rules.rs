//! FIELD rules: a field's ID, type and name are part of the wire contract.

use crate::canonical::{Field, Map};
use crate::compat::handlers::{create_warning, repeated_label};
use crate::compat::types::{RuleContext, RuleResult, Warning};
use crate::index;
use crate::lock::Protolock;
use crate::protopath::Protopath;

/// NoChangingFieldIDs - a field that keeps its name must keep its ID.
pub fn check_no_changing_field_ids(
    current: &Protolock,
    updated: &Protolock,
    _context: &RuleContext,
) -> RuleResult {
    const RULE: &str = "NoChangingFieldIDs";
    let updated_ids = index::field_ids_by_name(updated);

    let mut warnings = Vec::new();
    for (path, messages) in &index::field_ids_by_name(current) {
        for (message, fields) in messages {
            for (name, id) in fields {
                match index::lookup(&updated_ids, path, message, name) {
                    Some(new_id) if new_id != id => warnings.push(create_warning(
                        RULE,
                        path,
                        format!(
                            "\"{}\" field: \"{}\" has a different ID: {}, previously {}",
                            message, name, new_id, id
                        ),
                    )),
                    _ => {}
                }
            }
        }
    }

    RuleResult::with_warnings(warnings)
}

/// NoChangingFieldTypes - a field that keeps its name must keep its type,
/// its cardinality and, for maps, its key type. Switching between a map and
/// a plain field is a type change.
pub fn check_no_changing_field_types(
    current: &Protolock,
    updated: &Protolock,
    _context: &RuleContext,
) -> RuleResult {
    let current_maps = index::maps_by_name(current);
    let updated_fields = index::fields_by_name(updated);
    let updated_maps = index::maps_by_name(updated);

    let mut warnings = Vec::new();
    for (path, messages) in &index::fields_by_name(current) {
        for (message, fields) in messages {
            for (name, old) in fields {
                let Some(new) = index::lookup(&updated_fields, path, message, name) else {
                    continue;
                };
                let old_map = index::lookup(&current_maps, path, message, name);
                let new_map = index::lookup(&updated_maps, path, message, name);
                compare_field(path, message, (old, old_map), (new, new_map), &mut warnings);
            }
        }
    }

    RuleResult::with_warnings(warnings)
}

fn compare_field(
    path: &Protopath,
    message: &str,
    (old, old_map): (&Field, Option<&Map>),
    (new, new_map): (&Field, Option<&Map>),
    warnings: &mut Vec<Warning>,
) {
    const RULE: &str = "NoChangingFieldTypes";
    let type_changed = |new_type: &str, old_type: &str| {
        create_warning(
            RULE,
            path,
            format!(
                "\"{}\" field: \"{}\" has a different type: {}, previously {}",
                message, old.name, new_type, old_type
            ),
        )
    };

    match (old_map, new_map) {
        (Some(old_map), Some(new_map)) => {
            if old_map.key_type != new_map.key_type {
                warnings.push(create_warning(
                    RULE,
                    path,
                    format!(
                        "\"{}\" field: \"{}\" has a different map key type: {}, previously {}",
                        message, old.name, new_map.key_type, old_map.key_type
                    ),
                ));
            }
            if old.type_name != new.type_name {
                warnings.push(type_changed(&new.type_name, &old.type_name));
            }
        }
        (Some(old_map), None) => {
            warnings.push(type_changed(&new.type_name, &old_map.type_label()));
        }
        (None, Some(new_map)) => {
            warnings.push(type_changed(&new_map.type_label(), &old.type_name));
        }
        (None, None) => {
            if old.type_name != new.type_name {
                warnings.push(type_changed(&new.type_name, &old.type_name));
            }
            if old.is_repeated != new.is_repeated {
                warnings.push(create_warning(
                    RULE,
                    path,
                    format!(
                        "\"{}\" field: \"{}\" has changed repeated: {}, previously {}",
                        message,
                        old.name,
                        repeated_label(new.is_repeated),
                        repeated_label(old.is_repeated)
                    ),
                ));
            }
        }
    }
}

/// NoChangingFieldNames - a field ID must keep its name. Strict only.
pub fn check_no_changing_field_names(
    current: &Protolock,
    updated: &Protolock,
    context: &RuleContext,
) -> RuleResult {
    const RULE: &str = "NoChangingFieldNames";
    if !context.strict {
        return RuleResult::ok();
    }
    let updated_names = index::field_names_by_id(updated);

    let mut warnings = Vec::new();
    for (path, messages) in &index::field_names_by_id(current) {
        for (message, fields) in messages {
            for (id, name) in fields {
                match index::lookup(&updated_names, path, message, id) {
                    Some(new_name) if new_name != name => warnings.push(create_warning(
                        RULE,
                        path,
                        format!(
                            "\"{}\" field: \"{}\" ID: {} has an updated name, \"{}\"",
                            message, name, id, new_name
                        ),
                    )),
                    _ => {}
                }
            }
        }
    }

    RuleResult::with_warnings(warnings)
}
