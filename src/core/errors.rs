//! Error types surfaced by hooks.

use std::path::PathBuf;

use semver::Version;
use thiserror::Error;

/// Errors that stop a hook before or while it runs.
///
/// Every variant maps to exit code 1; the caller's pipeline halts.
#[derive(Debug, Error)]
pub enum HookError {
    /// A required positional argument was not supplied.
    #[error("missing required argument `{argument}`\n\nusage: {usage}")]
    MissingArgument {
        argument: &'static str,
        usage: &'static str,
    },

    /// A boolean positional argument could not be parsed.
    #[error("expected `true` or `false`, found `{value}`")]
    InvalidFlag { value: String },

    /// The scaffold target already exists.
    #[error("destination `{}` already exists", path.display())]
    PathExists { path: PathBuf },

    /// The scope record still holds the template placeholder.
    #[error("the scope in `{}` is still the placeholder `{placeholder}`\n\nhelp: Run `monohook init` to set the scope of this repository", file.display())]
    PlaceholderScope {
        file: PathBuf,
        placeholder: &'static str,
    },

    /// No component with this name exists in `packages/` or `libs/`.
    #[error("component `{name}` not found in `packages/` or `libs/`")]
    ComponentNotFound { name: String },

    /// The current directory is not a component directory.
    #[error("no `package.json` found in `{}`", dir.display())]
    NotAComponent { dir: PathBuf },

    /// No `scope.json` was found walking up from the working directory.
    #[error("could not find `scope.json` in `{}` or any parent directory", dir.display())]
    WorkspaceNotFound { dir: PathBuf },

    /// A pinned runtime has the wrong major version.
    #[error("`{tool}` major version {required} is required, found {found}")]
    VersionMismatch {
        tool: String,
        required: u64,
        found: Version,
    },

    /// A required external tool is not installed.
    #[error("`{tool}` was not found on PATH")]
    ToolNotFound { tool: String },

    /// An external tool exited with a non-zero status.
    #[error("`{command}` failed with exit code {}", code.map(|c| c.to_string()).unwrap_or_else(|| "none (terminated by signal)".to_string()))]
    ToolFailed { command: String, code: Option<i32> },

    /// The working tree has uncommitted changes to tracked files.
    #[error("your working tree contains uncommitted changes\n\nhelp: Commit or stash them before merging the template")]
    DirtyWorkingTree,

    /// Manifests have changes that a dependency update would mix into its commit.
    #[error("uncommitted changes in {}\n\nhelp: Commit or stash them before updating dependencies", files.join(", "))]
    UncommittedManifests { files: Vec<String> },

    /// The temporary remote name is already registered.
    #[error("a git remote named `{name}` already exists")]
    RemoteExists { name: String },

    /// The template branch is missing after fetching.
    #[error("branch `{branch}` not found on remote `{remote}`")]
    BranchNotFound { remote: String, branch: String },

    /// The operator declined to continue.
    #[error("process got stopped by the user")]
    Cancelled,
}
