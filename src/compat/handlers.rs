//! Shared helpers for rule implementations

use crate::compat::types::Warning;
use crate::protopath::Protopath;

/// Helper function to create a warning
pub fn create_warning(rule_name: &str, filepath: &Protopath, message: String) -> Warning {
    Warning {
        filepath: filepath.clone(),
        message,
        rule_name: rule_name.to_string(),
    }
}

/// Renders a field's cardinality the way the warning text spells it.
pub fn repeated_label(is_repeated: bool) -> &'static str {
    if is_repeated { "repeated" } else { "singular" }
}

/// Renders an RPC's streaming flag the way the warning text spells it.
pub fn streaming_label(streamed: bool) -> &'static str {
    if streamed { "streaming" } else { "unary" }
}
