//! The versioning-mode file (`lerna.json`).

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::{Map, Value};

use crate::util::fs;

/// File name of the lerna configuration.
pub const LERNA_FILE: &str = "lerna.json";

/// Value of `version` that switches lerna to per-component versioning.
pub const INDEPENDENT: &str = "independent";

/// The lerna configuration, kept as a raw JSON object so unrelated keys
/// survive a rewrite.
#[derive(Debug, Clone)]
pub struct LernaFile {
    path: PathBuf,
    content: Map<String, Value>,
}

impl LernaFile {
    /// Load `lerna.json` from the workspace root.
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let path = workspace_root.join(LERNA_FILE);
        let content = fs::read_json(&path)?;
        Ok(LernaFile { path, content })
    }

    /// Load if present.
    pub fn load_optional(workspace_root: &Path) -> Result<Option<Self>> {
        if workspace_root.join(LERNA_FILE).is_file() {
            Self::load(workspace_root).map(Some)
        } else {
            Ok(None)
        }
    }

    /// The configured `version` field.
    pub fn version(&self) -> Option<&str> {
        self.content.get("version").and_then(Value::as_str)
    }

    /// Whether components are versioned independently.
    pub fn is_independent(&self) -> bool {
        self.version() == Some(INDEPENDENT)
    }

    /// Switch to independent versioning.
    pub fn set_independent(&mut self) {
        self.content
            .insert("version".to_string(), Value::from(INDEPENDENT));
    }

    /// Write the file back.
    pub fn save(&self, indent: usize) -> Result<()> {
        fs::write_json(&self.path, &self.content, indent)
    }
}
