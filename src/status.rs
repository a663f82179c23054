//! The `init`, `commit` and `status` flows.

use crate::compat::{Report, RuleEngine};
use crate::config::Config;
use crate::error::ProtolockError;
use crate::lock::Protolock;
use crate::tree;
use std::fs::File;

/// Outcome of a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// The new lock-file content, ready to be written
    Ready(String),
    /// The tree has warnings against the baseline and `force` is off
    Refused(Report),
}

/// Snapshots the tree for a first lock file. Fails when one already exists.
pub fn init(config: &Config) -> Result<String, ProtolockError> {
    if config.lock_file_exists() {
        return Err(ProtolockError::LockExists {
            path: config.lock_file_path(),
        });
    }
    tree::snapshot(config)?.to_json()
}

/// Snapshots the tree to replace the lock file. Unless `force` is set, the
/// tree must first pass `status`.
pub fn commit(config: &Config) -> Result<Commit, ProtolockError> {
    if !config.force {
        let report = status(&Config {
            up_to_date: false,
            ..config.clone()
        })?;
        if report.has_warnings() {
            return Ok(Commit::Refused(report));
        }
        return Ok(Commit::Ready(report.updated.to_json()?));
    }

    if !config.lock_file_exists() {
        return Err(ProtolockError::MissingBaseline {
            path: config.lock_file_path(),
        });
    }
    Ok(Commit::Ready(tree::snapshot(config)?.to_json()?))
}

/// Compares the tree with the lock file.
///
/// Warnings are part of the returned report; only failures to produce a
/// report, and a stale lock under `up_to_date`, are errors.
pub fn status(config: &Config) -> Result<Report, ProtolockError> {
    let current = read_lock(config)?;
    let updated = tree::snapshot(config)?;

    let engine = RuleEngine::new(config.rule_config());
    let report = engine.compare(current, updated);

    if config.up_to_date && !report.has_warnings() {
        let locked = report.current.fingerprint()?;
        let actual = report.updated.fingerprint()?;
        if locked != actual {
            tracing::debug!(%locked, %actual, "lock fingerprint mismatch");
            return Err(ProtolockError::OutOfDate);
        }
    }

    Ok(report)
}

/// Reads the baseline snapshot.
pub fn read_lock(config: &Config) -> Result<Protolock, ProtolockError> {
    let path = config.lock_file_path();
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProtolockError::MissingBaseline { path });
        }
        Err(e) => return Err(e.into()),
    };
    Protolock::from_reader(file)
}

/// Writes lock-file content into the configured lock directory.
pub fn write_lock(config: &Config, content: &str) -> Result<(), ProtolockError> {
    let path = config.lock_file_path();
    std::fs::create_dir_all(&config.lock_dir)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), bytes = content.len(), "wrote lock file");
    Ok(())
}
