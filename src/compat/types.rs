//! Core types for compatibility checking

use crate::lock::Protolock;
use crate::protopath::Protopath;
use serde::{Deserialize, Serialize};

/// A single compatibility finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// File the finding belongs to, in portable form
    #[serde(default)]
    pub filepath: Protopath,
    /// Human-readable description
    #[serde(default)]
    pub message: String,
    /// Name of the rule that produced it; plugins may leave it empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rule_name: String,
}

/// Outcome of comparing the baseline snapshot with the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// The baseline, as read from the lock file
    pub current: Protolock,
    /// The snapshot of the working tree
    pub updated: Protolock,
    pub warnings: Vec<Warning>,
}

impl Report {
    /// True when at least one rule or plugin found a problem.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Context for rule execution
#[derive(Debug, Clone, Copy)]
pub struct RuleContext {
    /// Strict-only rules run only when this is set
    pub strict: bool,
    pub debug: bool,
}

/// Result of a single rule check
#[derive(Debug, Clone, Default)]
pub struct RuleResult {
    pub warnings: Vec<Warning>,
}

impl RuleResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn with_warnings(warnings: Vec<Warning>) -> Self {
        Self { warnings }
    }

    /// The rule passes exactly when it found nothing.
    pub fn is_ok(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Signature shared by every rule: `(current, updated, context)`.
pub type RuleFn = fn(&Protolock, &Protolock, &RuleContext) -> RuleResult;
