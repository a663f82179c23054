//! Drives `protobuf-parse` and turns its descriptors into lock entries.
//!
//! The parser insists on resolving every type reference, while the lock only
//! records types as written. Parsing therefore runs in a scratch workspace:
//! imports that cannot be found get empty files, and types that still fail
//! to resolve get stub declarations that every input imports.

use crate::canonical::Entry;
use crate::error::ProtolockError;
use crate::normalize;
use crate::protopath::Protopath;
use crate::source;
use anyhow::Context;
use protobuf::descriptor::FileDescriptorProto;
use protobuf_parse::Parser;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Workspace directory holding the generated stub declarations.
const STUB_DIR: &str = "protolock_stubs";

/// Upper bound on stubbed types per parse.
const MAX_STUBS: usize = 512;

/// A `.proto` file to parse: where it lives and how the parser names it.
#[derive(Debug, Clone)]
pub struct ProtoSource {
    /// Absolute (or working-directory relative) path on disk.
    pub path: PathBuf,
    /// Path relative to the proto root, `/`-separated, as the parser reports it.
    pub relative: String,
    /// The lock-file identity of the file.
    pub protopath: Protopath,
}

/// Parses a single `.proto` file's content into an [`Entry`].
pub fn parse_entry(proto_content: &str) -> Result<Entry, ProtolockError> {
    parse_entry_inner(proto_content).map_err(|e| ProtolockError::Parse {
        path: "<input>".to_string(),
        message: format!("{e:#}"),
    })
}

fn parse_entry_inner(proto_content: &str) -> anyhow::Result<Entry> {
    let file_name = "input.proto";
    let mut workspace = Workspace::new(Vec::new())?;
    workspace.add_input(file_name, proto_content);

    let file_descriptor = workspace
        .parse()?
        .into_iter()
        .find(|d| d.name() == file_name)
        .context("Could not find the parsed file descriptor for the input file")?;

    let annotations = source::scan(proto_content);
    Ok(normalize::normalize_file(&file_descriptor, &annotations))
}

/// Parses a set of files under `proto_root` in one parser run, returning an
/// entry per input in input order. `includes` are extra import search paths.
pub fn parse_files(
    proto_root: &Path,
    includes: &[PathBuf],
    inputs: &[ProtoSource],
) -> Result<Vec<Entry>, ProtolockError> {
    if inputs.is_empty() {
        return Ok(Vec::new());
    }

    let contents = inputs
        .iter()
        .map(|input| std::fs::read_to_string(&input.path))
        .collect::<Result<Vec<_>, _>>()?;

    let descriptors = parse_descriptors(proto_root, includes, inputs, &contents).map_err(|e| {
        ProtolockError::Parse {
            path: proto_root.display().to_string(),
            message: format!("{e:#}"),
        }
    })?;

    let mut entries = Vec::with_capacity(inputs.len());
    for (input, content) in inputs.iter().zip(&contents) {
        let descriptor = descriptors
            .iter()
            .find(|d| d.name() == input.relative)
            .ok_or_else(|| ProtolockError::Parse {
                path: input.relative.clone(),
                message: "parser returned no descriptor for file".to_string(),
            })?;
        let annotations = source::scan(content);
        tracing::debug!(file = %input.relative, "normalizing descriptor");
        entries.push(normalize::normalize_file(descriptor, &annotations));
    }

    Ok(entries)
}

fn parse_descriptors(
    proto_root: &Path,
    includes: &[PathBuf],
    inputs: &[ProtoSource],
    contents: &[String],
) -> anyhow::Result<Vec<FileDescriptorProto>> {
    let mut search = vec![proto_root.to_path_buf()];
    search.extend(includes.iter().cloned());

    let mut workspace = Workspace::new(search)?;
    for (input, content) in inputs.iter().zip(contents) {
        workspace.add_input(&input.relative, content);
    }
    workspace.parse()
}

//==============================================================================
// Workspace
//==============================================================================

/// A temporary include root holding copies of the inputs, empty files for
/// unresolvable imports, and stubs for unresolvable types.
struct Workspace {
    dir: tempfile::TempDir,
    /// Include paths searched after the workspace itself.
    search: Vec<PathBuf>,
    /// `(import name, content)` of each file to parse.
    inputs: Vec<(String, String)>,
    /// Stubbed type names, per package.
    stubs: BTreeMap<String, BTreeSet<String>>,
}

impl Workspace {
    fn new(search: Vec<PathBuf>) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir().context("Failed to create temp directory")?;
        Ok(Self {
            dir,
            search,
            inputs: Vec::new(),
            stubs: BTreeMap::new(),
        })
    }

    fn add_input(&mut self, name: &str, content: &str) {
        self.inputs.push((name.to_string(), content.to_string()));
    }

    /// Runs the parser, stubbing one unresolved type per failed attempt,
    /// until it succeeds or fails for another reason.
    fn parse(mut self) -> anyhow::Result<Vec<FileDescriptorProto>> {
        self.write_missing_imports()?;
        loop {
            let error = match self.run_parser() {
                Ok(files) => return Ok(files),
                Err(e) => e,
            };
            let message = format!("{error:#}");
            let Some(missing) = unresolved_type(&message) else {
                return Err(error);
            };
            if self.stub_count() >= MAX_STUBS || !self.add_stub(missing) {
                return Err(error);
            }
            tracing::debug!(type_name = missing, "stubbing unresolved type");
        }
    }

    /// Writes an empty file for every import found neither among the inputs
    /// nor on the search path.
    ///
    /// The parser has built-in knowledge of standard google.protobuf types.
    /// A dummy file would override the built-in, so those are left alone.
    fn write_missing_imports(&self) -> anyhow::Result<()> {
        for (_, content) in &self.inputs {
            for import in imports(content) {
                if import.starts_with("google/protobuf/") || self.resolves(&import) {
                    continue;
                }
                tracing::debug!(import = %import, "import not found, using an empty file");
                self.write_file(&import, "syntax = \"proto3\";")
                    .with_context(|| format!("Failed to create dummy import file: {import}"))?;
            }
        }
        Ok(())
    }

    fn resolves(&self, import: &str) -> bool {
        self.inputs.iter().any(|(name, _)| name == import)
            || self.dir.path().join(import).is_file()
            || self.search.iter().any(|root| root.join(import).is_file())
    }

    fn run_parser(&self) -> anyhow::Result<Vec<FileDescriptorProto>> {
        let stub_imports: String = self
            .write_stubs()?
            .iter()
            .map(|name| format!("import \"{name}\";\n"))
            .collect();

        let mut paths = Vec::with_capacity(self.inputs.len());
        for (name, content) in &self.inputs {
            let path = self
                .write_file(name, &format!("{content}\n{stub_imports}"))
                .with_context(|| format!("Failed to write {name} to temp directory"))?;
            paths.push(path);
        }

        let parsed = Parser::new()
            .pure()
            .include(self.dir.path())
            .includes(&self.search)
            .inputs(&paths)
            .file_descriptor_set()
            .context("Protobuf parsing failed")?;

        let mut files = parsed.file;
        files.retain(|file| !file.name().starts_with(STUB_DIR));
        for file in &mut files {
            // stub imports are appended last, so public/weak indices still hold
            file.dependency.retain(|dep| !dep.starts_with(STUB_DIR));
        }
        Ok(files)
    }

    /// Writes one stub file per package and returns their import names.
    fn write_stubs(&self) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.stubs.len());
        for (n, (package, types)) in self.stubs.iter().enumerate() {
            let name = format!("{STUB_DIR}/stub_{n}.proto");
            let mut content = String::from("syntax = \"proto3\";\n");
            if !package.is_empty() {
                content.push_str(&format!("package {package};\n"));
            }
            for type_name in types {
                content.push_str(&format!("message {type_name} {{}}\n"));
            }
            self.write_file(&name, &content)
                .with_context(|| format!("Failed to write stub file: {name}"))?;
            names.push(name);
        }
        Ok(names)
    }

    /// Records a stub for a type as written, `pkg.Name` or `Name`. Returns
    /// false when the stub already exists.
    fn add_stub(&mut self, written: &str) -> bool {
        let written = written.trim_start_matches('.');
        let (package, name) = written.rsplit_once('.').unwrap_or(("", written));
        if name.is_empty() {
            return false;
        }
        self.stubs
            .entry(package.to_string())
            .or_default()
            .insert(name.to_string())
    }

    fn stub_count(&self) -> usize {
        self.stubs.values().map(BTreeSet::len).sum()
    }

    fn write_file(&self, name: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

/// Import paths named by `import` lines.
fn imports(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("import "))
        .map(|line| {
            line.trim_start_matches("import ")
                .trim_start_matches("public ")
                .trim_start_matches("weak ")
                .trim_matches(|c| c == '"' || c == ';' || c == ' ')
                .to_string()
        })
        .filter(|path| !path.is_empty())
        .collect()
}

/// The type named by a parser error about an unresolvable reference, e.g.
/// ``object is not found by path `other.Thing` in scope `.test.Channel` ``.
fn unresolved_type(message: &str) -> Option<&str> {
    let (_, rest) = message.split_once("not found by path `")?;
    let (path, _) = rest.split_once('`')?;
    (!path.is_empty()).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_with_imports() {
        let proto = r#"
syntax = "proto3";

import "testdata/test.proto";

package test;

message Channel {
  int64 id = 1;
  string name = 2;
  string description = 3;
}
"#;
        let entry = parse_entry(proto).expect("Failed to parse proto");
        assert_eq!(entry.imports[0].path, "testdata/test.proto");
        assert_eq!(entry.messages[0].name, "Channel");
    }

    #[test]
    fn test_types_from_missing_imports_are_kept_as_written() {
        let proto = r#"
syntax = "proto3";
package test;

import "other/thing.proto";
import "shared/meta.proto";

message Channel {
  other.Thing thing = 1;
  Meta meta = 2;
  map<string, other.Thing> things = 3;
}

service ChannelChanger {
  rpc Get(other.Request) returns (Channel);
}
"#;
        let entry = parse_entry(proto).expect("Failed to parse proto");

        let channel = &entry.messages[0];
        assert_eq!(channel.fields[0].type_name, "other.Thing");
        assert_eq!(channel.fields[1].type_name, "Meta");
        assert_eq!(channel.maps[0].field.type_name, "other.Thing");
        assert_eq!(entry.services[0].rpcs[0].in_type, "other.Request");

        let imports: Vec<&str> = entry.imports.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(imports, vec!["other/thing.proto", "shared/meta.proto"]);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = parse_entry("syntax = \"proto3\"; message {").unwrap_err();
        assert!(matches!(err, ProtolockError::Parse { .. }));
    }

    #[test]
    fn test_unresolved_type_is_read_from_parser_errors() {
        let message = "Protobuf parsing failed: object is not found by path `other.Thing` in scope `.test.Channel`";
        assert_eq!(unresolved_type(message), Some("other.Thing"));
        assert_eq!(unresolved_type("unexpected token"), None);
    }

    #[test]
    fn test_stubs_are_grouped_by_package() {
        let mut workspace = Workspace::new(Vec::new()).unwrap();
        assert!(workspace.add_stub("other.Thing"));
        assert!(workspace.add_stub(".other.Request"));
        assert!(workspace.add_stub("Meta"));
        assert!(!workspace.add_stub("other.Thing"));
        assert_eq!(workspace.stub_count(), 3);
        assert_eq!(workspace.write_stubs().unwrap().len(), 2);
    }
}
