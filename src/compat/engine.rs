//! Compatibility check engine
//!
//! Runs every registered rule over a baseline/working-tree pair and gathers
//! the findings into a [`Report`].

use crate::compat::registry::{self, RuleDefinition};
use crate::compat::types::{Report, RuleContext, Warning};
use crate::lock::Protolock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Rule engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Enables the strict-only rules
    #[serde(default = "default_strict")]
    pub strict: bool,
    /// Emits a trace per rule
    #[serde(default)]
    pub debug: bool,
}

fn default_strict() -> bool {
    true
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            strict: true,
            debug: false,
        }
    }
}

/// Main engine for compatibility checks
pub struct RuleEngine {
    config: RuleConfig,
    rules: &'static [RuleDefinition],
}

impl RuleEngine {
    pub fn new(config: RuleConfig) -> Self {
        Self {
            config,
            rules: registry::rules(),
        }
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Runs all rules and returns their warnings in registry order.
    ///
    /// Rules run in parallel; each produces its own list and the lists are
    /// concatenated afterwards, so the output does not depend on scheduling.
    pub fn check(&self, current: &Protolock, updated: &Protolock) -> Vec<Warning> {
        let context = RuleContext {
            strict: self.config.strict,
            debug: self.config.debug,
        };

        let results: Vec<Vec<Warning>> = self
            .rules
            .par_iter()
            .map(|rule| {
                let result = (rule.check)(current, updated, &context);
                if context.debug {
                    tracing::debug!(
                        rule = rule.id,
                        strict_only = rule.strict_only,
                        ok = result.is_ok(),
                        warnings = result.warnings.len(),
                        "rule executed"
                    );
                }
                result.warnings
            })
            .collect();

        results.into_iter().flatten().collect()
    }

    /// Compares a baseline with a working-tree snapshot.
    pub fn compare(&self, current: Protolock, updated: Protolock) -> Report {
        let warnings = self.check(&current, &updated);
        Report {
            current,
            updated,
            warnings,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[RuleDefinition] {
        self.rules
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(RuleConfig::default())
    }
}
