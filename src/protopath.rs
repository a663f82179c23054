//! OS-independent file identities for lock entries.
//!
//! Paths are stored in the lock file with the platform separator replaced by
//! [`PROTO_SEP`], so a lock committed on one OS compares cleanly on another.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{MAIN_SEPARATOR_STR, Path};

/// Separator written into the lock file in place of the OS path separator.
pub const PROTO_SEP: &str = ":/:";

/// A portable file path, used as the key of every lock index and as the
/// `filepath` of each warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Protopath(String);

impl Protopath {
    /// Wraps a path that is already in portable form.
    pub fn new(portable: impl Into<String>) -> Self {
        Self(portable.into())
    }

    /// Converts an OS-form path into its portable form.
    pub fn from_os_path(os_path: impl AsRef<Path>) -> Self {
        let os = os_path.as_ref().to_string_lossy();
        Self(os.replace(MAIN_SEPARATOR_STR, PROTO_SEP))
    }

    /// Converts back into the OS-form path string.
    pub fn to_os_path(&self) -> String {
        self.0.replace(PROTO_SEP, MAIN_SEPARATOR_STR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Protopath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_os_path())
    }
}

impl From<&str> for Protopath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
