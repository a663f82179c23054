//! Run configuration: where the lock lives, which tree it tracks and how the
//! rules behave.

use crate::compat::RuleConfig;
use crate::error::ProtolockError;
use crate::lock::LOCK_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Configuration for a protolock run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `proto.lock`
    #[serde(default = "default_dir")]
    pub lock_dir: PathBuf,
    /// Root of the tracked `.proto` tree
    #[serde(default = "default_dir")]
    pub proto_root: PathBuf,
    /// Paths relative to `proto_root` left out of the snapshot
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Extra import search paths for the parser
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default = "default_strict")]
    pub strict: bool,
    #[serde(default)]
    pub debug: bool,
    /// Let `commit` overwrite the lock despite warnings
    #[serde(default)]
    pub force: bool,
    /// Fail `status` when the lock does not match the tree exactly
    #[serde(default)]
    pub up_to_date: bool,
    /// Executables run after the built-in rules
    #[serde(default)]
    pub plugins: Vec<String>,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_strict() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_dir: default_dir(),
            proto_root: default_dir(),
            ignore: Vec::new(),
            includes: Vec::new(),
            strict: true,
            debug: false,
            force: false,
            up_to_date: false,
            plugins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ProtolockError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from YAML string. Settings live under a top-level
    /// `protolock` key; a document without it yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ProtolockError> {
        #[derive(serde::Deserialize)]
        struct ConfigFile {
            protolock: Option<Config>,
        }

        let config_file: ConfigFile =
            serde_yaml::from_str(yaml).map_err(|e| ProtolockError::Config(e.to_string()))?;
        Ok(config_file.protolock.unwrap_or_default())
    }

    pub fn lock_file_path(&self) -> PathBuf {
        self.lock_dir.join(LOCK_FILE_NAME)
    }

    pub fn lock_file_exists(&self) -> bool {
        self.lock_file_path().is_file()
    }

    pub fn rule_config(&self) -> RuleConfig {
        RuleConfig {
            strict: self.strict,
            debug: self.debug,
        }
    }

    /// Import search paths, resolved against the working directory.
    pub fn include_paths(&self) -> Vec<PathBuf> {
        self.includes.iter().map(PathBuf::from).collect()
    }

    /// True when `relative` (a path below `proto_root`) falls under one of
    /// the ignore entries.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        self.ignore
            .iter()
            .map(|entry| without_cur_dir(entry.trim()))
            .filter(|entry| !entry.as_os_str().is_empty())
            .any(|entry| relative.starts_with(entry))
    }
}

/// `./vendor` and `vendor` name the same entry.
fn without_cur_dir(entry: &str) -> PathBuf {
    Path::new(entry)
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// Splits a comma-separated flag value, dropping blanks.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
