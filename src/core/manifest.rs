//! `package.json` manifests.
//!
//! Manifests are owned by npm and lerna, not by this tool. They are kept as
//! an ordered JSON object and patched one field at a time so that keys this
//! tool does not know about, and their order, survive a rewrite.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;
use serde_json::{Map, Value};

use crate::util::fs;

/// File name of an npm manifest.
pub const MANIFEST_NAME: &str = "package.json";

/// Dependency tables of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyKind {
    Normal,
    Dev,
    Peer,
}

impl DependencyKind {
    /// All tables, in the order npm lists them.
    pub const ALL: [DependencyKind; 3] = [
        DependencyKind::Normal,
        DependencyKind::Dev,
        DependencyKind::Peer,
    ];

    /// The manifest key for this table.
    pub fn key(&self) -> &'static str {
        match self {
            DependencyKind::Normal => "dependencies",
            DependencyKind::Dev => "devDependencies",
            DependencyKind::Peer => "peerDependencies",
        }
    }
}

/// A parsed `package.json`.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    content: Map<String, Value>,
}

impl Manifest {
    /// Load a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let value: Value = fs::read_json(path)?;
        let content = match value {
            Value::Object(map) => map,
            _ => anyhow::bail!("`{}` does not contain a JSON object", path.display()),
        };
        Ok(Manifest {
            path: path.to_path_buf(),
            content,
        })
    }

    /// Load the manifest of a directory, or start an empty one if the
    /// directory has none.
    pub fn load_or_empty(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Manifest {
                path,
                content: Map::new(),
            })
        }
    }

    /// Write the manifest back to disk.
    pub fn save(&self, indent: usize) -> Result<()> {
        tracing::debug!("writing {}", self.path.display());
        fs::write_json(&self.path, &self.content, indent)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    pub fn content(&self) -> &Map<String, Value> {
        &self.content
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }

    pub fn name(&self) -> Option<&str> {
        self.content.get("name").and_then(Value::as_str)
    }

    /// The raw `version` string.
    pub fn version_str(&self) -> Option<&str> {
        self.content.get("version").and_then(Value::as_str)
    }

    /// The `version` field parsed as semver.
    pub fn version(&self) -> Result<Version> {
        let raw = self
            .version_str()
            .with_context(|| format!("`{}` has no version", self.path.display()))?;
        Version::parse(raw)
            .with_context(|| format!("invalid version `{}` in `{}`", raw, self.path.display()))
    }

    pub fn is_private(&self) -> bool {
        self.content
            .get("private")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Set a top-level field, keeping its position if it already exists.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.content.insert(key.to_string(), value.into());
    }

    /// Set a field inside a nested object, creating intermediate objects.
    ///
    /// A non-object value on the way is replaced by an object.
    pub fn set_nested(&mut self, keys: &[&str], value: impl Into<Value>) {
        let Some((last, parents)) = keys.split_last() else {
            return;
        };
        let mut current = &mut self.content;
        for key in parents {
            let entry = current
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                return;
            };
            current = map;
        }
        current.insert(last.to_string(), value.into());
    }

    /// Set a field only if it is missing.
    pub fn set_default(&mut self, key: &str, value: impl Into<Value>) {
        if !self.content.contains_key(key) {
            self.set(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.content.shift_remove(key)
    }

    pub fn set_version(&mut self, version: &Version) {
        self.set("version", version.to_string());
    }

    /// Entries of one dependency table as `(name, range)` pairs.
    pub fn dependencies(&self, kind: DependencyKind) -> Vec<(String, String)> {
        self.content
            .get(kind.key())
            .and_then(Value::as_object)
            .map(|table| {
                table
                    .iter()
                    .filter_map(|(name, range)| {
                        range.as_str().map(|r| (name.clone(), r.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The range declared for a dependency in a given table.
    pub fn dependency(&self, kind: DependencyKind, name: &str) -> Option<&str> {
        self.content
            .get(kind.key())
            .and_then(Value::as_object)
            .and_then(|table| table.get(name))
            .and_then(Value::as_str)
    }

    /// The range declared for a dependency in `dependencies` or
    /// `devDependencies`, whichever has it first.
    pub fn any_dependency(&self, name: &str) -> Option<&str> {
        self.dependency(DependencyKind::Normal, name)
            .or_else(|| self.dependency(DependencyKind::Dev, name))
    }

    /// Remove a dependency from a table, keeping the order of the rest.
    pub fn remove_dependency(&mut self, kind: DependencyKind, name: &str) -> Option<Value> {
        self.content
            .get_mut(kind.key())
            .and_then(Value::as_object_mut)
            .and_then(|table| table.shift_remove(name))
    }

    /// Set the range of a dependency in a table, creating the table.
    pub fn set_dependency(&mut self, kind: DependencyKind, name: &str, range: &str) {
        self.set_nested(&[kind.key(), name], range);
    }
}
