//! Lifecycle hooks and their dispatch.
//!
//! Every hook goes through [`HookRunner::run`]: if the repository provides an
//! override script the script runs instead of the default behaviour,
//! otherwise the workspace is loaded and the default runs.

pub mod registry;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;

use crate::core::workspace::Workspace;
use crate::util::{GlobalContext, Shell, Status};

pub use registry::{HookRegistry, OverrideScript};

/// The fixed set of lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    Init,
    CreatePackage,
    CreateLib,
    Build,
    BuildDep,
    BuildDev,
    BuildProd,
    Test,
    PrePublish,
    PostPublish,
    PrePublishGlobal,
    PostPublishGlobal,
    AddDependency,
    AddDevDependency,
    MergeTemplate,
}

impl HookName {
    pub const ALL: [HookName; 15] = [
        HookName::Init,
        HookName::CreatePackage,
        HookName::CreateLib,
        HookName::Build,
        HookName::BuildDep,
        HookName::BuildDev,
        HookName::BuildProd,
        HookName::Test,
        HookName::PrePublish,
        HookName::PostPublish,
        HookName::PrePublishGlobal,
        HookName::PostPublishGlobal,
        HookName::AddDependency,
        HookName::AddDevDependency,
        HookName::MergeTemplate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookName::Init => "init",
            HookName::CreatePackage => "create-package",
            HookName::CreateLib => "create-lib",
            HookName::Build => "build",
            HookName::BuildDep => "build-dep",
            HookName::BuildDev => "build-dev",
            HookName::BuildProd => "build-prod",
            HookName::Test => "test",
            HookName::PrePublish => "pre-publish",
            HookName::PostPublish => "post-publish",
            HookName::PrePublishGlobal => "pre-publish-global",
            HookName::PostPublishGlobal => "post-publish-global",
            HookName::AddDependency => "add-dependency",
            HookName::AddDevDependency => "add-dev-dependency",
            HookName::MergeTemplate => "merge-template",
        }
    }

    /// Historical spellings still accepted on the command line and for
    /// override scripts.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            HookName::AddDevDependency => &["add-devDependency"],
            _ => &[],
        }
    }

    /// Override file names checked for this hook, in order.
    pub fn script_names(&self) -> Vec<String> {
        std::iter::once(self.as_str())
            .chain(self.aliases().iter().copied())
            .map(|name| format!("{}.sh", name))
            .collect()
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookName::ALL
            .into_iter()
            .find(|hook| hook.as_str() == s || hook.aliases().contains(&s))
            .ok_or_else(|| format!("unknown hook `{}`", s))
    }
}

/// How a hook invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// The default behaviour ran to completion
    Completed,
    /// An override script ran and exited with this code
    Overridden(i32),
}

impl HookOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            HookOutcome::Completed => 0,
            HookOutcome::Overridden(code) => *code,
        }
    }
}

/// Dispatches hooks: override first, default otherwise.
pub struct HookRunner {
    ctx: GlobalContext,
    shell: Arc<Shell>,
    registry: HookRegistry,
}

impl HookRunner {
    /// Resolve the override registry for the workspace around the working
    /// directory. Outside a workspace no overrides apply.
    pub fn new(ctx: GlobalContext, shell: Arc<Shell>) -> Self {
        let registry = match ctx.find_workspace_root() {
            Ok(root) => HookRegistry::resolve(&root, &ctx.load_config(&root)),
            Err(_) => HookRegistry::empty(),
        };
        HookRunner::with_registry(ctx, shell, registry)
    }

    pub fn with_registry(ctx: GlobalContext, shell: Arc<Shell>, registry: HookRegistry) -> Self {
        HookRunner {
            ctx,
            shell,
            registry,
        }
    }

    pub fn ctx(&self) -> &GlobalContext {
        &self.ctx
    }

    pub fn shell(&self) -> &Arc<Shell> {
        &self.shell
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Load the workspace around the working directory.
    pub fn workspace(&self) -> Result<Workspace> {
        Workspace::load(&self.ctx)
    }

    /// Run `hook` with its raw arguments.
    ///
    /// `default` only runs when no override exists.
    pub fn run<F>(&self, hook: HookName, args: &[String], default: F) -> Result<HookOutcome>
    where
        F: FnOnce(&mut Workspace) -> Result<()>,
    {
        if let Some(script) = self.registry.get(hook) {
            self.shell.status(
                Status::Running,
                format!("override `{}`", script.path().display()),
            );
            let code = script.run(self.registry.bash(), args, self.ctx.cwd())?;
            if code != 0 {
                tracing::debug!("override for `{}` exited with {}", hook, code);
            }
            return Ok(HookOutcome::Overridden(code));
        }

        let mut ws = self.workspace()?;
        default(&mut ws)?;
        Ok(HookOutcome::Completed)
    }
}
