//! Global context for monohook operations.
//!
//! Provides centralized access to the working directory, the user-wide
//! configuration directory and workspace discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::errors::HookError;
use crate::core::scope::SCOPE_FILE;
use crate::util::config::{global_config_dir, load_config, project_config_path, Config};

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for user-wide monohook data (~/.monohook/)
    home: PathBuf,

    /// Whether to use verbose output
    verbose: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext from the process environment.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let home = global_config_dir().unwrap_or_else(|| PathBuf::from(".monohook"));

        Ok(GlobalContext {
            cwd,
            home,
            verbose: false,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Use a specific home directory instead of the user-wide one.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the monohook home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Find the workspace root: the nearest directory, starting at cwd and
    /// walking upward, that contains `scope.json`.
    pub fn find_workspace_root(&self) -> Result<PathBuf, HookError> {
        let mut current = self.cwd.clone();
        loop {
            if current.join(SCOPE_FILE).is_file() {
                return Ok(current);
            }
            if !current.pop() {
                return Err(HookError::WorkspaceNotFound {
                    dir: self.cwd.clone(),
                });
            }
        }
    }

    /// Load the merged global + project configuration for a workspace.
    pub fn load_config(&self, workspace_root: &Path) -> Config {
        load_config(&self.config_path(), &project_config_path(workspace_root))
    }
}
