//! RESERVED rules: reserved IDs and names must be honored and kept, and
//! removed fields must leave a reservation behind.
//!
//! Messages and enums are checked alike; an enum value's integer plays the
//! role of a field ID.

use crate::canonical::ReservedRange;
use crate::compat::handlers::create_warning;
use crate::compat::types::{RuleContext, RuleResult, Warning};
use crate::index::{self, LockIndex};
use crate::lock::Protolock;
use crate::protopath::Protopath;

/// NoUsingReservedFields - a live field must not take an ID or name that the
/// baseline reserved.
///
/// The baseline's reservations and the working tree's live fields are
/// counted together per entity; any key seen more than once is a reuse, as
/// is a live ID inside one of the baseline's whole ranges.
pub fn check_no_using_reserved_fields(
    current: &Protolock,
    updated: &Protolock,
    _context: &RuleContext,
) -> RuleResult {
    const RULE: &str = "NoUsingReservedFields";

    let mut id_counts = index::reserved_id_counts(current);
    index::merge_counts(&mut id_counts, index::live_id_counts(updated));
    let mut name_counts = index::reserved_name_counts(current);
    index::merge_counts(&mut name_counts, index::live_name_counts(updated));

    let mut reused: LockIndex<i32, ()> = LockIndex::new();
    for (path, entities) in &id_counts {
        for (entity, ids) in entities {
            for (id, count) in ids {
                if *count > 1 {
                    mark(&mut reused, path, entity, *id);
                }
            }
        }
    }
    let reserved_ranges = index::reserved_ranges(current);
    for (path, entities) in &index::live_id_counts(updated) {
        for (entity, ids) in entities {
            for id in ids.keys() {
                if index::in_reserved_range(&reserved_ranges, path, entity, *id) {
                    mark(&mut reused, path, entity, *id);
                }
            }
        }
    }

    let mut warnings = Vec::new();
    for (path, entities) in &reused {
        for (entity, ids) in entities {
            for id in ids.keys() {
                warnings.push(create_warning(
                    RULE,
                    path,
                    format!("\"{}\" is re-using ID: {}, a reserved field", entity, id),
                ));
            }
        }
    }
    for (path, entities) in &name_counts {
        for (entity, names) in entities {
            for (name, count) in names {
                if *count > 1 {
                    warnings.push(create_warning(
                        RULE,
                        path,
                        format!(
                            "\"{}\" is re-using name: \"{}\", a reserved field",
                            entity, name
                        ),
                    ));
                }
            }
        }
    }

    RuleResult::with_warnings(warnings)
}

fn mark(index: &mut LockIndex<i32, ()>, path: &Protopath, entity: &str, id: i32) {
    index
        .entry(path.clone())
        .or_default()
        .entry(entity.to_string())
        .or_default()
        .insert(id, ());
}

/// NoRemovingReservedFields - every baseline reservation must still exist.
/// Strict only.
///
/// A reservation is reported even when its whole message or enum is gone.
pub fn check_no_removing_reserved_fields(
    current: &Protolock,
    updated: &Protolock,
    context: &RuleContext,
) -> RuleResult {
    const RULE: &str = "NoRemovingReservedFields";
    if !context.strict {
        return RuleResult::ok();
    }

    let updated_ids = index::reserved_id_counts(updated);
    let updated_ranges = index::reserved_ranges(updated);
    let updated_names = index::reserved_name_counts(updated);

    let mut warnings = Vec::new();
    for (path, entities) in &index::reserved_id_counts(current) {
        for (entity, ids) in entities {
            for id in ids.keys() {
                if index::lookup(&updated_ids, path, entity, id).is_none()
                    && !index::in_reserved_range(&updated_ranges, path, entity, *id)
                {
                    warnings.push(create_warning(
                        RULE,
                        path,
                        format!(
                            "\"{}\" is missing ID: {}, which had been reserved",
                            entity, id
                        ),
                    ));
                }
            }
        }
    }
    for (path, entities) in &index::reserved_ranges(current) {
        for (entity, spans) in entities {
            for span in spans.keys() {
                if !range_kept(&updated_ranges, path, entity, span) {
                    warnings.push(create_warning(
                        RULE,
                        path,
                        format!(
                            "\"{}\" is missing IDs: {}, which had been reserved",
                            entity, span
                        ),
                    ));
                }
            }
        }
    }
    for (path, entities) in &index::reserved_name_counts(current) {
        for (entity, names) in entities {
            for name in names.keys() {
                if index::lookup(&updated_names, path, entity, name).is_none() {
                    warnings.push(create_warning(
                        RULE,
                        path,
                        format!(
                            "\"{}\" is missing name: \"{}\", which had been reserved",
                            entity, name
                        ),
                    ));
                }
            }
        }
    }

    RuleResult::with_warnings(warnings)
}

/// True when some range of `path -> entity` still spans all of `span`.
fn range_kept(
    ranges: &LockIndex<ReservedRange, usize>,
    path: &Protopath,
    entity: &str,
    span: &ReservedRange,
) -> bool {
    ranges
        .get(path)
        .and_then(|entities| entities.get(entity))
        .map(|kept| {
            kept.keys()
                .any(|k| k.start <= span.start && span.end <= k.end)
        })
        .unwrap_or(false)
}

/// NoRemovingFieldsWithoutReserve - a field (or enum value) that disappears
/// by name must have its ID and its name reserved in the working tree.
///
/// When the old ID is still carried by another live field the field was
/// renamed, which is left to NoChangingFieldNames.
pub fn check_no_removing_fields_without_reserve(
    current: &Protolock,
    updated: &Protolock,
    _context: &RuleContext,
) -> RuleResult {
    let reserved = Reserved {
        ids: index::reserved_id_counts(updated),
        ranges: index::reserved_ranges(updated),
        names: index::reserved_name_counts(updated),
    };

    let mut warnings = Vec::new();
    removed_without_reserve(
        &index::field_ids_by_name(current),
        &index::field_ids_by_name(updated),
        &index::field_names_by_id(updated),
        &reserved,
        &mut warnings,
    );
    removed_without_reserve(
        &index::enum_values_by_name(current),
        &index::enum_values_by_name(updated),
        &index::enum_names_by_value(updated),
        &reserved,
        &mut warnings,
    );

    RuleResult::with_warnings(warnings)
}

/// The working tree's reservations.
struct Reserved {
    ids: LockIndex<i32, usize>,
    ranges: LockIndex<ReservedRange, usize>,
    names: LockIndex<String, usize>,
}

fn removed_without_reserve(
    current_ids: &LockIndex<String, i32>,
    updated_ids: &LockIndex<String, i32>,
    updated_names: &LockIndex<i32, String>,
    reserved: &Reserved,
    warnings: &mut Vec<Warning>,
) {
    const RULE: &str = "NoRemovingFieldsWithoutReserve";

    for (path, entities) in current_ids {
        for (entity, fields) in entities {
            for (name, id) in fields {
                if index::lookup(updated_ids, path, entity, name).is_some() {
                    continue;
                }
                if index::lookup(updated_names, path, entity, id).is_some() {
                    continue;
                }

                if index::lookup(&reserved.ids, path, entity, id).is_none()
                    && !index::in_reserved_range(&reserved.ranges, path, entity, *id)
                {
                    warnings.push(create_warning(
                        RULE,
                        path,
                        format!(
                            "\"{}\" ID: {} has been removed, but is not reserved",
                            entity, id
                        ),
                    ));
                }
                if index::lookup(&reserved.names, path, entity, name).is_none() {
                    warnings.push(create_warning(
                        RULE,
                        path,
                        format!(
                            "\"{}\" field: \"{}\" has been removed, but is not reserved",
                            entity, name
                        ),
                    ));
                }
            }
        }
    }
}
