//! Fatal error taxonomy.
//!
//! Rule findings are never errors: they travel as [`crate::Warning`]s inside a
//! [`crate::Report`]. Everything here aborts the current command.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProtolockError {
    #[error("no \"proto.lock\" file found at {}, first run \"init\"", path.display())]
    MissingBaseline { path: PathBuf },

    #[error("a \"proto.lock\" file was already found at {}, use \"commit\" to update", path.display())]
    LockExists { path: PathBuf },

    #[error("malformed snapshot in {origin}: {source}")]
    MalformedSnapshot {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("accumulated plugin errors:\n{}", join_plugin_errors(.0))]
    PluginFailures(Vec<PluginError>),

    #[error("proto.lock file is not up-to-date with source")]
    OutOfDate,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

/// A single plugin failure: the plugin could not run, exited non-zero,
/// produced undecodable output, or reported an error message itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginError {
    pub name: String,
    pub message: String,
    pub output: String,
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)?;
        if !self.output.is_empty() {
            write!(f, "\n{}", self.output)?;
        }
        Ok(())
    }
}

fn join_plugin_errors(errors: &[PluginError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
