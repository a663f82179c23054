//! Compatibility rules and the engine that runs them.
//!
//! Every rule compares the baseline snapshot (`current`) with the snapshot of
//! the working tree (`updated`) and reports what would break existing clients.

pub mod engine;
pub mod field_rules;
pub mod handlers;
pub mod registry;
pub mod reserved_rules;
pub mod rpc_rules;
pub mod types;

pub use engine::{RuleConfig, RuleEngine};
pub use registry::RuleDefinition;
pub use types::{Report, RuleContext, RuleResult, Warning};
