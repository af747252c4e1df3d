//! The scope record (`scope.json`) at the workspace root.
//!
//! ```json
//! {
//!   "scope": "viewer",
//!   "initialized": true,
//!   "repomaintain": { "publish_mode": "independent", "publish_tag_name": "viewer", "indent": 2 }
//! }
//! ```
//!
//! The maintenance block is read from `repomaintain`; `maintenance` is
//! accepted as an alias and saving always writes `repomaintain`.
//!
//! Loaded once per invocation and written back only through [`ScopeRecord::save`].

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::HookError;
use crate::util::fs;

/// File name of the scope record.
pub const SCOPE_FILE: &str = "scope.json";

/// Scope value shipped by the template; scaffolding refuses to run with it.
pub const PLACEHOLDER_SCOPE: &str = "scope-placeholder";

/// How `monohook publish` selects components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    /// Every public component, sharing one version
    All,
    /// Components picked individually, each with its own version
    Independent,
}

/// Settings for the maintenance commands, stored alongside the scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default)]
    pub publish_mode: Option<PublishMode>,

    /// Prefix of the summary git tag, `<prefix>@<version>`
    #[serde(default)]
    pub publish_tag_name: Option<String>,

    /// Indentation used when rewriting JSON files
    #[serde(default = "default_indent")]
    pub indent: usize,
}

fn default_indent() -> usize {
    2
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        MaintenanceConfig {
            publish_mode: None,
            publish_tag_name: None,
            indent: default_indent(),
        }
    }
}

/// The parsed scope record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeRecord {
    /// Namespace prefix for every component directory and package name
    pub scope: String,

    /// Whether first-run setup has completed
    #[serde(default)]
    pub initialized: bool,

    #[serde(
        default,
        rename = "repomaintain",
        alias = "maintenance",
        skip_serializing_if = "Option::is_none"
    )]
    pub maintenance: Option<MaintenanceConfig>,

    /// Keys this tool does not know about, preserved on save
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    #[serde(skip)]
    path: PathBuf,
}

impl ScopeRecord {
    /// Load the scope record from a workspace root.
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let path = workspace_root.join(SCOPE_FILE);
        let mut record: ScopeRecord = fs::read_json(&path)?;
        record.path = path;
        Ok(record)
    }

    /// Write the record back to where it was loaded from.
    pub fn save(&self) -> Result<()> {
        tracing::debug!("writing {}", self.path.display());
        fs::write_json(&self.path, self, self.indent())
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the scope is still the template placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.scope.trim().is_empty() || self.scope == PLACEHOLDER_SCOPE
    }

    /// Fail if the scope is still the template placeholder.
    pub fn ensure_configured(&self) -> Result<(), HookError> {
        if self.is_placeholder() {
            return Err(HookError::PlaceholderScope {
                file: self.path.clone(),
                placeholder: PLACEHOLDER_SCOPE,
            });
        }
        Ok(())
    }

    /// Maintenance settings, defaulted when absent.
    pub fn maintenance(&self) -> MaintenanceConfig {
        self.maintenance.clone().unwrap_or_default()
    }

    /// JSON indentation used for files this tool rewrites.
    pub fn indent(&self) -> usize {
        self.maintenance
            .as_ref()
            .map(|m| m.indent)
            .unwrap_or_else(default_indent)
    }
}

/// Validate a scope entered by the operator.
///
/// Scopes become part of directory names and npm package names, so they are
/// limited to lowercase letters, digits, `-` and `_`.
pub fn validate_scope(scope: &str) -> Result<(), &'static str> {
    if scope.is_empty() {
        return Err("scope cannot be empty");
    }
    if scope == PLACEHOLDER_SCOPE {
        return Err("scope cannot be the placeholder value");
    }
    if scope.starts_with(['-', '_', '.']) {
        return Err("scope cannot start with a hyphen, underscore or dot");
    }
    if !scope
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err("scope may only contain lowercase letters, digits, `-` and `_`");
    }
    Ok(())
}
