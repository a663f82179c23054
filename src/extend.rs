//! Native plugins: external executables that receive both snapshots and add
//! their own warnings.
//!
//! The exchange is one JSON [`Data`] document written to the plugin's stdin
//! and one read back from its stdout.

use crate::compat::{Report, Warning};
use crate::error::{PluginError, ProtolockError};
use crate::lock::Protolock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::process::{Command, Stdio};

/// The plugin envelope. Keys are PascalCase on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Data {
    #[serde(default)]
    pub current: Protolock,
    #[serde(default)]
    pub updated: Protolock,
    /// Warnings from the built-in rules, for reference
    #[serde(default)]
    pub protolock_warnings: Vec<Warning>,
    /// Warnings added by the plugin
    #[serde(default)]
    pub plugin_warnings: Vec<Warning>,
    /// Set by a plugin to report that it failed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plugin_error_message: String,
}

impl Data {
    fn from_report(report: &Report) -> Self {
        Self {
            current: report.current.clone(),
            updated: report.updated.clone(),
            protolock_warnings: report.warnings.clone(),
            plugin_warnings: Vec::new(),
            plugin_error_message: String::new(),
        }
    }
}

/// Runs every plugin concurrently on the same envelope and appends their
/// warnings to the report, in plugin order.
///
/// Failures do not stop the other plugins; they are gathered and returned
/// together once all plugins have finished.
pub fn run_plugins(
    names: &[String],
    mut report: Report,
    debug: bool,
) -> Result<Report, ProtolockError> {
    if names.is_empty() {
        return Ok(report);
    }

    let input = serde_json::to_vec(&Data::from_report(&report)).map_err(|source| {
        ProtolockError::MalformedSnapshot {
            origin: "plugin input".to_string(),
            source,
        }
    })?;

    let outcomes: Vec<Result<Vec<Warning>, PluginError>> = names
        .par_iter()
        .map(|name| run_plugin(name.trim(), &input, debug))
        .collect();

    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(warnings) => report.warnings.extend(warnings),
            Err(e) => failures.push(e),
        }
    }

    if failures.is_empty() {
        Ok(report)
    } else {
        Err(ProtolockError::PluginFailures(failures))
    }
}

fn run_plugin(name: &str, input: &[u8], debug: bool) -> Result<Vec<Warning>, PluginError> {
    let fail = |message: String, output: String| PluginError {
        name: name.to_string(),
        message,
        output,
    };

    if debug {
        tracing::debug!(plugin = name, "running plugin");
    }

    let mut child = Command::new(name)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| fail(format!("failed to start plugin: {e}"), String::new()))?;

    // Feed stdin from a separate thread so a plugin that writes before it has
    // read all its input cannot block on a full pipe.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        std::thread::spawn(move || stdin.write_all(&input))
    });

    let output = child
        .wait_with_output()
        .map_err(|e| fail(format!("failed to wait for plugin: {e}"), String::new()))?;
    if let Some(writer) = writer {
        // broken pipe when the plugin exits without reading its input
        let _ = writer.join();
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(fail(format!("plugin exited with {}", output.status), stderr));
    }

    let data: Data = serde_json::from_slice(&output.stdout).map_err(|e| {
        if debug {
            tracing::debug!(plugin = name, output = %stdout, "undecodable plugin output");
        }
        fail(format!("plugin data decode error: {e}"), stderr.clone())
    })?;

    if !data.plugin_error_message.is_empty() {
        return Err(fail(data.plugin_error_message, stderr));
    }

    if debug {
        tracing::debug!(plugin = name, warnings = data.plugin_warnings.len(), "plugin finished");
    }
    Ok(data.plugin_warnings)
}

/// Plugin-side helper for plugins written in Rust.
///
/// ```no_run
/// use protolock::extend::Plugin;
///
/// Plugin::new("sample")
///     .run(std::io::stdin(), std::io::stdout(), |data| Ok(data))
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Plugin {
    name: String,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads the envelope from `input`, hands it to `check` and writes the
    /// result to `output`.
    ///
    /// The snapshots in the result are always the ones received. An error
    /// from `check` is reported through `PluginErrorMessage`.
    pub fn run<R, W, F>(&self, mut input: R, mut output: W, check: F) -> Result<(), ProtolockError>
    where
        R: Read,
        W: Write,
        F: FnOnce(Data) -> Result<Data, String>,
    {
        let mut raw = Vec::new();
        input.read_to_end(&mut raw)?;
        let received: Data =
            serde_json::from_slice(&raw).map_err(|source| ProtolockError::MalformedSnapshot {
                origin: format!("{} plugin input", self.name),
                source,
            })?;

        let current = received.current.clone();
        let updated = received.updated.clone();
        let mut result = match check(received.clone()) {
            Ok(data) => data,
            Err(message) => Data {
                plugin_error_message: format!("{}: {}", self.name, message),
                ..received
            },
        };
        result.current = current;
        result.updated = updated;

        serde_json::to_writer(&mut output, &result).map_err(|source| {
            ProtolockError::MalformedSnapshot {
                origin: format!("{} plugin output", self.name),
                source,
            }
        })?;
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protopath::Protopath;

    #[test]
    fn test_envelope_uses_pascal_case_keys() {
        let json = serde_json::to_value(Data::default()).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("Current"));
        assert!(object.contains_key("Updated"));
        assert!(object.contains_key("ProtolockWarnings"));
        assert!(object.contains_key("PluginWarnings"));
        assert!(!object.contains_key("PluginErrorMessage"));
    }

    #[test]
    fn test_plugin_helper_appends_warnings() {
        let input = serde_json::to_vec(&Data::default()).unwrap();
        let mut output = Vec::new();
        Plugin::new("sample")
            .run(input.as_slice(), &mut output, |mut data| {
                data.plugin_warnings.push(Warning {
                    filepath: Protopath::new(""),
                    message: "A sample warning!".to_string(),
                    rule_name: String::new(),
                });
                Ok(data)
            })
            .unwrap();

        let data: Data = serde_json::from_slice(&output).unwrap();
        assert_eq!(data.plugin_warnings.len(), 1);
        assert!(data.plugin_error_message.is_empty());
    }

    #[test]
    fn test_plugin_helper_reports_errors() {
        let input = serde_json::to_vec(&Data::default()).unwrap();
        let mut output = Vec::new();
        Plugin::new("sample")
            .run(input.as_slice(), &mut output, |_| Err("boom".to_string()))
            .unwrap();

        let data: Data = serde_json::from_slice(&output).unwrap();
        assert_eq!(data.plugin_error_message, "sample: boom");
    }

    #[test]
    fn test_no_plugins_is_a_no_op() {
        let report = run_plugins(&[], Report::default(), false).unwrap();
        assert!(!report.has_warnings());
    }
}
