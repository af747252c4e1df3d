//! Configuration file support for monohook.
//!
//! monohook reads two configuration file locations:
//! - Global: `~/.monohook/config.toml` (or `$MONOHOOK_HOME/config.toml`) - User-wide defaults
//! - Project: `<workspace>/.monohook/config.toml` - Repository-specific overrides
//!
//! Project config takes precedence over global config, key by key. Every
//! value is optional in the file; accessors supply the defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Organization used for package names when none is configured.
pub const DEFAULT_ORGANIZATION: &str = "monorepo";

/// Directory, relative to the workspace root, holding override scripts.
pub const DEFAULT_OVERRIDE_DIR: &str = "scripts/custom";

/// Default public npm registry.
pub const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org/";

/// monohook configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package naming
    pub package: PackageConfig,

    /// External tool locations
    pub tools: ToolsConfig,

    /// Runtime version pins
    pub runtime: RuntimeConfig,

    /// Auxiliary Python environment
    pub python: PythonConfig,

    /// Override scripts
    pub hooks: HooksConfig,

    /// Upstream template repository
    pub template: TemplateConfig,

    /// Publish targets
    pub publish: PublishConfig,

    /// Dependency upgrades
    pub upgrade: UpgradeConfig,
}

/// Package naming settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// npm organization, the `org` in `@org/<scope>.<name>`
    pub organization: Option<String>,
}

/// Paths or names of the external tools hooks shell out to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub npm: Option<String>,
    pub npx: Option<String>,
    pub node: Option<String>,
    pub git: Option<String>,
    pub python: Option<String>,
    pub bash: Option<String>,
}

/// Major-version pins checked before hooks run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Required Node.js major version
    pub node_major: Option<u64>,

    /// Required npm major version
    pub npm_major: Option<u64>,
}

/// Python virtual environment used by auxiliary tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    /// Whether `init` creates the environment at all
    pub enabled: Option<bool>,

    /// Environment directory, relative to the workspace root
    pub venv_dir: Option<PathBuf>,

    /// Requirements file, relative to the workspace root
    pub requirements: Option<PathBuf>,
}

/// Override script settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Directory with `<hook>.sh` overrides, relative to the workspace root
    pub override_dir: Option<PathBuf>,
}

/// Template repository merged by `merge-template`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub url: Option<String>,
    pub branch: Option<String>,
    pub remote: Option<String>,
}

/// Publish settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Registries offered by `monohook publish`
    pub registries: Vec<RegistryEntry>,
}

/// Upgrade settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Packages `monohook upgrade` never touches
    pub pinned: Vec<String>,
}

/// A registry components can be published to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Human-readable name (e.g. "npm", "github")
    pub name: String,

    /// Registry URL passed to `npm publish --registry`
    pub url: String,

    /// Verify `npm whoami` before publishing
    #[serde(default)]
    pub login: bool,

    /// Authenticate through the root `.npmrc`, linked into the component
    #[serde(default)]
    pub npmrc: bool,
}

impl RegistryEntry {
    /// Create a new registry entry.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        RegistryEntry {
            name: name.into(),
            url: url.into(),
            login: false,
            npmrc: false,
        }
    }

    /// Require an npm login for this registry.
    pub fn with_login(mut self) -> Self {
        self.login = true;
        self
    }

    /// Authenticate via the root `.npmrc`.
    pub fn with_npmrc(mut self) -> Self {
        self.npmrc = true;
        self
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        fn take<T>(slot: &mut Option<T>, other: Option<T>) {
            if other.is_some() {
                *slot = other;
            }
        }

        take(&mut self.package.organization, other.package.organization);

        take(&mut self.tools.npm, other.tools.npm);
        take(&mut self.tools.npx, other.tools.npx);
        take(&mut self.tools.node, other.tools.node);
        take(&mut self.tools.git, other.tools.git);
        take(&mut self.tools.python, other.tools.python);
        take(&mut self.tools.bash, other.tools.bash);

        take(&mut self.runtime.node_major, other.runtime.node_major);
        take(&mut self.runtime.npm_major, other.runtime.npm_major);

        take(&mut self.python.enabled, other.python.enabled);
        take(&mut self.python.venv_dir, other.python.venv_dir);
        take(&mut self.python.requirements, other.python.requirements);

        take(&mut self.hooks.override_dir, other.hooks.override_dir);

        take(&mut self.template.url, other.template.url);
        take(&mut self.template.branch, other.template.branch);
        take(&mut self.template.remote, other.template.remote);

        // Registry lists replace rather than extend
        if !other.publish.registries.is_empty() {
            self.publish.registries = other.publish.registries;
        }
        if !other.upgrade.pinned.is_empty() {
            self.upgrade.pinned = other.upgrade.pinned;
        }
    }

    /// The npm organization for package names.
    pub fn organization(&self) -> &str {
        self.package
            .organization
            .as_deref()
            .unwrap_or(DEFAULT_ORGANIZATION)
    }

    /// Registries offered for publishing; the public npm registry by default.
    pub fn registries(&self) -> Vec<RegistryEntry> {
        if self.publish.registries.is_empty() {
            vec![RegistryEntry::new("npm", NPM_REGISTRY_URL).with_login()]
        } else {
            self.publish.registries.clone()
        }
    }

    /// Check that configured URLs parse.
    pub fn validate(&self) -> Result<()> {
        for registry in &self.publish.registries {
            Url::parse(&registry.url).with_context(|| {
                format!("invalid URL for registry `{}`: {}", registry.name, registry.url)
            })?;
        }
        Ok(())
    }
}

impl ToolsConfig {
    pub fn npm(&self) -> &str {
        self.npm.as_deref().unwrap_or("npm")
    }

    pub fn npx(&self) -> &str {
        self.npx.as_deref().unwrap_or("npx")
    }

    pub fn node(&self) -> &str {
        self.node.as_deref().unwrap_or("node")
    }

    pub fn git(&self) -> &str {
        self.git.as_deref().unwrap_or("git")
    }

    pub fn python(&self) -> &str {
        self.python.as_deref().unwrap_or("python3")
    }

    pub fn bash(&self) -> &str {
        self.bash.as_deref().unwrap_or("bash")
    }
}

impl PythonConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn venv_dir(&self) -> PathBuf {
        self.venv_dir.clone().unwrap_or_else(|| PathBuf::from(".venv"))
    }

    pub fn requirements(&self) -> PathBuf {
        self.requirements
            .clone()
            .unwrap_or_else(|| PathBuf::from("scripts").join("requirements.txt"))
    }
}

impl HooksConfig {
    pub fn override_dir(&self) -> PathBuf {
        self.override_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OVERRIDE_DIR))
    }
}

impl TemplateConfig {
    pub fn branch(&self) -> &str {
        self.branch.as_deref().unwrap_or("main")
    }

    pub fn remote(&self) -> &str {
        self.remote.as_deref().unwrap_or("template")
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.monohook/config.toml)
/// 2. Global config (~/.monohook/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Get the global monohook config directory (`$MONOHOOK_HOME` or `~/.monohook`).
pub fn global_config_dir() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("MONOHOOK_HOME") {
        return Some(PathBuf::from(home));
    }
    directories::BaseDirs::new().map(|b| b.home_dir().join(".monohook"))
}

/// Get the project config path (`<root>/.monohook/config.toml`).
pub fn project_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".monohook").join("config.toml")
}
