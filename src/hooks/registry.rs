//! Override scripts.
//!
//! A repository can replace any hook by dropping `<hook>.sh` into the
//! override directory (`scripts/custom` by default). The script runs through
//! bash with the exact arguments the hook received, in the directory the hook
//! was invoked from, and its exit code becomes the hook's exit code. The
//! default behaviour does not run at all.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::hooks::HookName;
use crate::util::config::Config;
use crate::util::process;

/// A resolved override script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideScript {
    hook: HookName,
    path: PathBuf,
}

impl OverrideScript {
    pub fn hook(&self) -> HookName {
        self.hook
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the script and return its exit code.
    ///
    /// A script killed by a signal counts as exit code 1.
    pub fn run(&self, bash: &str, args: &[String], cwd: &Path) -> Result<i32> {
        tracing::debug!("running override {} for `{}`", self.path.display(), self.hook);
        let status = process::tool(bash)?
            .arg(&self.path)
            .args(args)
            .cwd(cwd)
            .status()?;
        Ok(status.code().unwrap_or(1))
    }
}

/// Hook name to override script, resolved once per invocation.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    overrides: HashMap<HookName, OverrideScript>,
    bash: String,
}

impl HookRegistry {
    /// A registry without overrides, for invocations outside a workspace.
    pub fn empty() -> Self {
        HookRegistry {
            overrides: HashMap::new(),
            bash: "bash".to_string(),
        }
    }

    /// Scan the override directory of a workspace.
    pub fn resolve(workspace_root: &Path, config: &Config) -> Self {
        let dir = workspace_root.join(config.hooks.override_dir());
        let mut overrides = HashMap::new();

        for hook in HookName::ALL {
            let found = hook
                .script_names()
                .into_iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file());
            if let Some(path) = found {
                tracing::debug!("override for `{}`: {}", hook, path.display());
                overrides.insert(hook, OverrideScript { hook, path });
            }
        }

        HookRegistry {
            overrides,
            bash: config.tools.bash().to_string(),
        }
    }

    pub fn get(&self, hook: HookName) -> Option<&OverrideScript> {
        self.overrides.get(&hook)
    }

    /// Shell used to run overrides.
    pub fn bash(&self) -> &str {
        &self.bash
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}
