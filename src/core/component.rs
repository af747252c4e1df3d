//! Components: the packages and libraries of the workspace.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::manifest::Manifest;

/// Name of the pseudo-component standing for the workspace root.
pub const ROOT_COMPONENT: &str = "root";

/// The two directories components live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Deployable applications, `packages/`
    Packages,
    /// Shared libraries, `libs/`
    Libs,
}

impl Partition {
    pub const ALL: [Partition; 2] = [Partition::Packages, Partition::Libs];

    /// Directory name below the workspace root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Partition::Packages => "packages",
            Partition::Libs => "libs",
        }
    }

    /// Singular noun for messages.
    pub fn noun(&self) -> &'static str {
        match self {
            Partition::Packages => "package",
            Partition::Libs => "library",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Directory name of a component: `<scope>.<name>`.
pub fn component_dir_name(scope: &str, name: &str) -> String {
    format!("{}.{}", scope, name)
}

/// npm package name of a component: `@<organization>/<scope>.<name>`.
pub fn package_name(organization: &str, scope: &str, name: &str) -> String {
    format!("@{}/{}", organization, component_dir_name(scope, name))
}

/// Remove a leading `@<organization>/` from a package name.
pub fn strip_scope_prefix(name: &str) -> &str {
    if name.starts_with('@') {
        if let Some((_, rest)) = name.split_once('/') {
            return rest;
        }
    }
    name
}

/// A component discovered in the workspace.
///
/// This is also the shape published components take in the publish payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub version: String,
    pub private: bool,
    pub location: PathBuf,
}

impl Component {
    /// Build a component from its manifest.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let name = manifest
            .name()
            .ok_or_else(|| anyhow::anyhow!("`{}` has no name", manifest.path().display()))?;
        Ok(Component {
            name: name.to_string(),
            version: manifest.version_str().unwrap_or_default().to_string(),
            private: manifest.is_private(),
            location: manifest.dir().to_path_buf(),
        })
    }

    /// The pseudo-component for the workspace root.
    pub fn root(location: &Path) -> Self {
        Component {
            name: ROOT_COMPONENT.to_string(),
            version: String::new(),
            private: true,
            location: location.to_path_buf(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_COMPONENT
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.location.join(crate::core::manifest::MANIFEST_NAME)
    }
}
