//! Implementation of the `add-dependency` and `add-dev-dependency` hooks.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::core::workspace::Workspace;
use crate::util::fs;
use crate::util::process;
use crate::util::{Shell, Status};

/// Options for adding a dependency.
#[derive(Debug, Clone)]
pub struct AddDependencyOptions {
    /// Dependency spec passed to npm (`three`, `three@^0.150.0`, ...)
    pub dependency: String,

    /// Component to install into; every component when `None`
    pub component: Option<String>,

    /// Record under `devDependencies`
    pub dev: bool,
}

/// Install a dependency into one component or all of them.
///
/// Returns the component directories npm was pointed at.
pub fn add_dependency(ws: &Workspace, opts: &AddDependencyOptions, shell: &Arc<Shell>) -> Result<Vec<PathBuf>> {
    let targets = ws.dependency_targets(opts.component.as_deref())?;
    if targets.is_empty() {
        shell.warn("the workspace has no components, nothing to install into");
        return Ok(targets);
    }

    let mut cmd = process::tool(ws.config().tools.npm())?
        .arg("install")
        .arg(&opts.dependency);
    if opts.dev {
        cmd = cmd.arg("--save-dev");
    }
    for target in &targets {
        cmd = cmd.arg("-w").arg(fs::relative_path(ws.root(), target));
    }

    let kind = if opts.dev { "dev dependency" } else { "dependency" };
    let span = shell.span(
        Status::Installing,
        format!("{} `{}` into {} component(s)", kind, opts.dependency, targets.len()),
    );
    cmd.cwd(ws.root()).run()?;
    span.finish_with_message(format!("added `{}`", opts.dependency));

    Ok(targets)
}
