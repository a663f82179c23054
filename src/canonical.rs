//! The schema model stored in a lock file.
//!
//! Every collection keeps source order, and every empty or default value is
//! omitted on serialization and restored by `serde(default)` on the way back
//! in. Together this makes a serialize/deserialize/serialize cycle
//! byte-identical, which is what keeps `commit` a no-op on an unchanged tree.

use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

//==============================================================================
// File-level entries
//==============================================================================

/// The schema content of one `.proto` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    /// Top-level and nested enums; nested ones carry their dotted name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<Enum>,
    /// Top-level messages only; nested messages hang off their parent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Import {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// A declared option. Aggregated values such as `{a: 1, b: 2}` are kept as a
/// list of sub-options instead of a flattened string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtoOption {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregated: Vec<ProtoOption>,
}

impl ProtoOption {
    pub fn scalar(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            aggregated: Vec::new(),
        }
    }
}

//==============================================================================
// Messages
//==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Regular fields, with oneof members flattened in (they share the ID space).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maps: Vec<Map>,
    /// Reserved numbers with ranges expanded to individual IDs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_ids: Vec<i32>,
    /// Reserved ranges too wide to expand, such as `100 to max`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_ranges: Vec<ReservedRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ProtoOption>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Field {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub id: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_repeated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ProtoOption>,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// An inclusive span of reserved numbers.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct ReservedRange {
    pub start: i32,
    pub end: i32,
}

impl ReservedRange {
    pub fn contains(&self, id: i32) -> bool {
        self.start <= id && id <= self.end
    }
}

impl std::fmt::Display for ReservedRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// A `map<K, V>` field. `field.type_name` holds the value type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Map {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_type: String,
    #[serde(default)]
    pub field: Field,
}

impl Map {
    /// The `map<key, value>` spelling of this map's type.
    pub fn type_label(&self) -> String {
        format!("map<{}, {}>", self.key_type, self.field.type_name)
    }
}

//==============================================================================
// Enums
//==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Enum {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_fields: Vec<EnumField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_ids: Vec<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_ranges: Vec<ReservedRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_names: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_alias: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnumField {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Always written, zero included: the zero value is the enum default.
    #[serde(default)]
    pub integer: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ProtoOption>,
}

//==============================================================================
// Services
//==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rpcs: Vec<Rpc>,
}

/// A service method. Streaming is two independent flags rather than a
/// closed set of call kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rpc {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub in_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub out_type: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub in_streamed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub out_streamed: bool,
}
