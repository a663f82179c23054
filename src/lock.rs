//! The snapshot store: a whole tree of definitions and its lock-file form.

use crate::canonical::Entry;
use crate::error::ProtolockError;
use crate::protopath::Protopath;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;

/// Name of the lock file written at the root of the lock directory.
pub const LOCK_FILE_NAME: &str = "proto.lock";

/// A snapshot of every tracked `.proto` file at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Protolock {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<Definition>,
}

/// The parsed content of one file, keyed by its portable path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Definition {
    #[serde(default, skip_serializing_if = "Protopath::is_empty")]
    pub protopath: Protopath,
    #[serde(default)]
    pub def: Entry,
}

impl Protolock {
    /// Builds a snapshot from definitions, ordering them by path so the
    /// result does not depend on discovery order.
    pub fn from_definitions(mut definitions: Vec<Definition>) -> Self {
        definitions.sort_by(|a, b| a.protopath.cmp(&b.protopath));
        Self { definitions }
    }

    /// Deserializes a lock file from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, ProtolockError> {
        serde_json::from_str(json).map_err(|source| ProtolockError::MalformedSnapshot {
            origin: LOCK_FILE_NAME.to_string(),
            source,
        })
    }

    /// Deserializes a lock file from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ProtolockError> {
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        Self::from_json(&json)
    }

    /// Serializes into the lock-file form (two-space indented JSON).
    pub fn to_json(&self) -> Result<String, ProtolockError> {
        serde_json::to_string_pretty(self).map_err(|source| ProtolockError::MalformedSnapshot {
            origin: LOCK_FILE_NAME.to_string(),
            source,
        })
    }

    /// Hex SHA-256 of the lock-file form. Two snapshots with the same
    /// fingerprint produce byte-identical lock files.
    pub fn fingerprint(&self) -> Result<String, ProtolockError> {
        let json = self.to_json()?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn definition(&self, path: &Protopath) -> Option<&Definition> {
        self.definitions.iter().find(|d| &d.protopath == path)
    }
}
