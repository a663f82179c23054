pub mod canonical;
pub mod compat;
pub mod config;
pub mod error;
pub mod extend;
pub mod hints;
pub mod index;
pub mod lock;
pub mod normalize;
pub mod parse;
pub mod protopath;
pub mod source;
pub mod status;
pub mod tree;

pub use compat::{Report, RuleConfig, RuleEngine, Warning};
pub use config::Config;
pub use error::{PluginError, ProtolockError};
pub use lock::{Definition, LOCK_FILE_NAME, Protolock};
pub use protopath::Protopath;
pub use status::{Commit, commit, init, status};

/// Builds a single-file snapshot from `.proto` source text.
///
/// Imports are not resolved; the content only needs to be valid on its own.
///
/// # Arguments
///
/// * `protopath` - The portable path the definition is recorded under.
/// * `proto_content` - The content of the .proto file.
pub fn lock_from_source(
    protopath: impl Into<Protopath>,
    proto_content: &str,
) -> Result<Protolock, ProtolockError> {
    let def = parse::parse_entry(proto_content)?;
    Ok(Protolock::from_definitions(vec![Definition {
        protopath: protopath.into(),
        def,
    }]))
}

/// Compares two snapshots with every built-in rule.
pub fn compare(current: Protolock, updated: Protolock, config: RuleConfig) -> Report {
    RuleEngine::new(config).compare(current, updated)
}
