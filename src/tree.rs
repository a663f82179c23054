//! Snapshots the `.proto` tree under a root directory.

use crate::config::Config;
use crate::error::ProtolockError;
use crate::lock::{Definition, Protolock};
use crate::parse::{self, ProtoSource};
use crate::protopath::Protopath;
use std::path::{Component, Path};
use walkdir::WalkDir;

const PROTO_EXTENSION: &str = "proto";

/// Finds every `.proto` file below `config.proto_root` that is not ignored,
/// in file-name order.
pub fn discover(config: &Config) -> Result<Vec<ProtoSource>, ProtolockError> {
    let root = &config.proto_root;
    let mut sources = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().map(|ext| ext != PROTO_EXTENSION).unwrap_or(true) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if config.is_ignored(relative) {
            tracing::debug!(file = %relative.display(), "ignoring file");
            continue;
        }

        sources.push(ProtoSource {
            path: path.to_path_buf(),
            relative: import_name(relative),
            protopath: Protopath::from_os_path(relative),
        });
    }

    Ok(sources)
}

/// The `/`-separated name the parser gives a file below its include root.
fn import_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Parses the tracked tree into a fresh snapshot.
pub fn snapshot(config: &Config) -> Result<Protolock, ProtolockError> {
    let sources = discover(config)?;
    if sources.is_empty() {
        tracing::warn!(root = %config.proto_root.display(), "no .proto files found");
    }

    let entries = parse::parse_files(&config.proto_root, &config.include_paths(), &sources)?;
    let definitions = sources
        .iter()
        .zip(entries)
        .map(|(source, def)| Definition {
            protopath: source.protopath.clone(),
            def,
        })
        .collect();

    Ok(Protolock::from_definitions(definitions))
}
