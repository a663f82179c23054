//! Lookup tables built from a snapshot, shared by every rule.
//!
//! Each index maps `path -> entity name -> key -> value`, where message
//! entity names are dotted (`Parent.Child`) so that same-named nested
//! messages under different parents never share a bucket. All builders are
//! pure: each call walks the snapshot and returns a fresh map.

use crate::canonical::{Enum, Field, Map, Message, ReservedRange, Rpc};
use crate::lock::Protolock;
use crate::protopath::Protopath;
use std::collections::BTreeMap;

/// `path -> entity -> key -> value`.
pub type LockIndex<K, V> = BTreeMap<Protopath, BTreeMap<String, BTreeMap<K, V>>>;

//==============================================================================
// Traversal
//==============================================================================

/// Collects every message in a tree, top-level and nested, with its dotted
/// name. Nested results are built by the recursive call and merged here.
pub fn collect_messages<'a>(messages: &'a [Message], prefix: &str) -> Vec<(String, &'a Message)> {
    let mut all_messages = Vec::new();

    for message in messages {
        let full_name = if prefix.is_empty() {
            message.name.clone()
        } else {
            format!("{}.{}", prefix, message.name)
        };

        let nested = collect_messages(&message.messages, &full_name);
        all_messages.push((full_name, message));
        all_messages.extend(nested);
    }

    all_messages
}

/// Builds an index by asking `entries` for the keyed values of each message.
fn index_messages<K, V, F>(lock: &Protolock, entries: F) -> LockIndex<K, V>
where
    K: Ord,
    F: Fn(&Message) -> Vec<(K, V)>,
{
    let mut index = LockIndex::new();
    for def in &lock.definitions {
        let by_message = index.entry(def.protopath.clone()).or_insert_with(BTreeMap::new);
        for (name, message) in collect_messages(&def.def.messages, "") {
            by_message
                .entry(name)
                .or_insert_with(BTreeMap::new)
                .extend(entries(message));
        }
    }
    index
}

/// Builds an index by asking `entries` for the keyed values of each enum.
fn index_enums<K, V, F>(lock: &Protolock, entries: F) -> LockIndex<K, V>
where
    K: Ord,
    F: Fn(&Enum) -> Vec<(K, V)>,
{
    let mut index = LockIndex::new();
    for def in &lock.definitions {
        let by_enum = index.entry(def.protopath.clone()).or_insert_with(BTreeMap::new);
        for en in &def.def.enums {
            by_enum
                .entry(en.name.clone())
                .or_insert_with(BTreeMap::new)
                .extend(entries(en));
        }
    }
    index
}

fn count<K: Ord + Clone>(keys: &[K]) -> Vec<(K, usize)> {
    let mut counts: BTreeMap<K, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key.clone()).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}

/// Merges `other` into `index`, adding counts of keys present in both.
pub fn merge_counts<K: Ord>(index: &mut LockIndex<K, usize>, other: LockIndex<K, usize>) {
    for (path, entities) in other {
        let by_entity = index.entry(path).or_default();
        for (entity, keys) in entities {
            let by_key = by_entity.entry(entity).or_default();
            for (key, n) in keys {
                *by_key.entry(key).or_insert(0) += n;
            }
        }
    }
}

/// Looks up `path -> entity -> key`.
pub fn lookup<'a, K: Ord, V>(
    index: &'a LockIndex<K, V>,
    path: &Protopath,
    entity: &str,
    key: &K,
) -> Option<&'a V> {
    index.get(path)?.get(entity)?.get(key)
}

/// True when `path -> entity` exists in the index.
pub fn has_entity<K, V>(index: &LockIndex<K, V>, path: &Protopath, entity: &str) -> bool {
    index
        .get(path)
        .map(|entities| entities.contains_key(entity))
        .unwrap_or(false)
}

/// All fields of a message, map fields included with their value type.
fn all_fields(message: &Message) -> impl Iterator<Item = &Field> {
    message
        .fields
        .iter()
        .chain(message.maps.iter().map(|map| &map.field))
}

//==============================================================================
// Reservations
//==============================================================================

/// How many times each ID is reserved, per message and per enum.
pub fn reserved_id_counts(lock: &Protolock) -> LockIndex<i32, usize> {
    let mut index = index_messages(lock, |m| count(&m.reserved_ids));
    merge_counts(&mut index, index_enums(lock, |e| count(&e.reserved_ids)));
    index
}

/// Reserved ranges kept whole, per message and per enum.
pub fn reserved_ranges(lock: &Protolock) -> LockIndex<ReservedRange, usize> {
    let mut index = index_messages(lock, |m| count(&m.reserved_ranges));
    merge_counts(&mut index, index_enums(lock, |e| count(&e.reserved_ranges)));
    index
}

/// True when `id` falls inside one of the whole ranges of `path -> entity`.
pub fn in_reserved_range(
    ranges: &LockIndex<ReservedRange, usize>,
    path: &Protopath,
    entity: &str,
    id: i32,
) -> bool {
    ranges
        .get(path)
        .and_then(|entities| entities.get(entity))
        .map(|spans| spans.keys().any(|span| span.contains(id)))
        .unwrap_or(false)
}

/// How many times each name is reserved, per message and per enum.
pub fn reserved_name_counts(lock: &Protolock) -> LockIndex<String, usize> {
    let mut index = index_messages(lock, |m| count(&m.reserved_names));
    merge_counts(&mut index, index_enums(lock, |e| count(&e.reserved_names)));
    index
}

/// How many live fields (maps included) use each ID, per message, and how
/// many distinct enum values use each integer, per enum. Aliased enum values
/// share one integer and count once.
pub fn live_id_counts(lock: &Protolock) -> LockIndex<i32, usize> {
    let mut index = index_messages(lock, |m| {
        let ids: Vec<i32> = all_fields(m).map(|f| f.id).collect();
        count(&ids)
    });
    let enum_index = index_enums(lock, |e| {
        let values: std::collections::BTreeSet<i32> =
            e.enum_fields.iter().map(|v| v.integer).collect();
        values.into_iter().map(|v| (v, 1)).collect()
    });
    merge_counts(&mut index, enum_index);
    index
}

/// How many live fields (maps included) use each name, per message, and how
/// many enum values use each name, per enum.
pub fn live_name_counts(lock: &Protolock) -> LockIndex<String, usize> {
    let mut index = index_messages(lock, |m| {
        let names: Vec<String> = all_fields(m).map(|f| f.name.clone()).collect();
        count(&names)
    });
    let enum_index = index_enums(lock, |e| {
        let names: Vec<String> = e.enum_fields.iter().map(|v| v.name.clone()).collect();
        count(&names)
    });
    merge_counts(&mut index, enum_index);
    index
}

//==============================================================================
// Fields
//==============================================================================

/// Live field name to ID, per message (maps included, reservations excluded).
pub fn field_ids_by_name(lock: &Protolock) -> LockIndex<String, i32> {
    index_messages(lock, |m| all_fields(m).map(|f| (f.name.clone(), f.id)).collect())
}

/// Field name to the full field, per message. Map fields appear with their
/// value type as `type_name`.
pub fn fields_by_name(lock: &Protolock) -> LockIndex<String, Field> {
    index_messages(lock, |m| {
        all_fields(m).map(|f| (f.name.clone(), f.clone())).collect()
    })
}

/// Field ID to name, per message (maps included).
pub fn field_names_by_id(lock: &Protolock) -> LockIndex<i32, String> {
    index_messages(lock, |m| all_fields(m).map(|f| (f.id, f.name.clone())).collect())
}

/// Map field name to the full map, per message, for key-type comparison.
pub fn maps_by_name(lock: &Protolock) -> LockIndex<String, Map> {
    index_messages(lock, |m| {
        m.maps
            .iter()
            .map(|map| (map.field.name.clone(), map.clone()))
            .collect()
    })
}

/// Enum value name to integer, per enum.
pub fn enum_values_by_name(lock: &Protolock) -> LockIndex<String, i32> {
    index_enums(lock, |e| {
        e.enum_fields
            .iter()
            .map(|v| (v.name.clone(), v.integer))
            .collect()
    })
}

/// Enum integer to value name, per enum. With aliases the last declared
/// name wins; callers only rely on the integer being present.
pub fn enum_names_by_value(lock: &Protolock) -> LockIndex<i32, String> {
    index_enums(lock, |e| {
        e.enum_fields
            .iter()
            .map(|v| (v.integer, v.name.clone()))
            .collect()
    })
}

/// Every dotted message name, per file.
pub fn message_names(lock: &Protolock) -> BTreeMap<Protopath, Vec<String>> {
    lock.definitions
        .iter()
        .map(|def| {
            let names = collect_messages(&def.def.messages, "")
                .into_iter()
                .map(|(name, _)| name)
                .collect();
            (def.protopath.clone(), names)
        })
        .collect()
}

//==============================================================================
// Services
//==============================================================================

/// Service name to RPC name, as an existence map.
pub fn rpc_names_by_service(lock: &Protolock) -> LockIndex<String, bool> {
    let mut index = LockIndex::new();
    for def in &lock.definitions {
        let by_service = index.entry(def.protopath.clone()).or_insert_with(BTreeMap::new);
        for svc in &def.def.services {
            by_service
                .entry(svc.name.clone())
                .or_insert_with(BTreeMap::new)
                .extend(svc.rpcs.iter().map(|rpc| (rpc.name.clone(), true)));
        }
    }
    index
}

/// Service name to RPC name to the full RPC, for signature comparison.
pub fn rpcs_by_service(lock: &Protolock) -> LockIndex<String, Rpc> {
    let mut index = LockIndex::new();
    for def in &lock.definitions {
        let by_service = index.entry(def.protopath.clone()).or_insert_with(BTreeMap::new);
        for svc in &def.def.services {
            by_service
                .entry(svc.name.clone())
                .or_insert_with(BTreeMap::new)
                .extend(svc.rpcs.iter().map(|rpc| (rpc.name.clone(), rpc.clone())));
        }
    }
    index
}
