//! Implementation of the `build`, `build-dep`, `build-dev` and `build-prod`
//! hooks.
//!
//! All of them run inside a component directory, the way npm runs scripts.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::workspace::Workspace;
use crate::ops::runtime::{check_runtime, RuntimeCheck};
use crate::util::fs;
use crate::util::process;
use crate::util::{Shell, Status};

/// Compiler output directory.
pub const DIST_DIR: &str = "dist";

/// Bundle flavour for the webpack hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleProfile {
    /// Dev server with live reload
    Dev,
    /// Optimized bundle
    Prod,
}

impl BundleProfile {
    pub fn out_dir(&self) -> &'static str {
        match self {
            BundleProfile::Dev => "dist-dev",
            BundleProfile::Prod => "dist-prod",
        }
    }

    pub fn config_file(&self) -> &'static str {
        match self {
            BundleProfile::Dev => "webpack.dev.js",
            BundleProfile::Prod => "webpack.prod.js",
        }
    }

    fn webpack_args(&self) -> Vec<&'static str> {
        match self {
            BundleProfile::Dev => vec!["webpack", "serve", "--config", self.config_file(), "--live-reload"],
            BundleProfile::Prod => vec!["webpack", "--config", self.config_file()],
        }
    }
}

/// Compile the component containing `dir` with the TypeScript compiler.
pub fn build(ws: &Workspace, dir: &Path, shell: &Arc<Shell>) -> Result<()> {
    check_runtime(ws.config(), RuntimeCheck::Node)?;
    let component = ws.component_at(dir)?;
    let dir = component.location.as_path();

    fs::remove_dir_all_if_exists(&dir.join(DIST_DIR))?;

    let span = shell.span(Status::Building, &component.name);
    process::tool(ws.config().tools.npx())?
        .args(["tsc", "--build"])
        .cwd(dir)
        .run()?;
    span.finish_with_message(&component.name);
    Ok(())
}

/// Build the component containing `dir` and every component it depends on.
pub fn build_dep(ws: &Workspace, dir: &Path, shell: &Arc<Shell>) -> Result<()> {
    check_runtime(ws.config(), RuntimeCheck::Node)?;
    let component = ws.component_at(dir)?;

    shell.status(Status::Building, format!("{} and its dependencies", component.name));
    process::tool(ws.config().tools.npx())?
        .args(["lerna", "run", "build", "--scope"])
        .arg(&component.name)
        .arg("--include-dependencies")
        .cwd(ws.root())
        .run()
}

/// Bundle the package containing `dir` with webpack.
pub fn build_bundle(ws: &Workspace, dir: &Path, profile: BundleProfile, shell: &Arc<Shell>) -> Result<()> {
    check_runtime(ws.config(), RuntimeCheck::Node)?;
    let component = ws.component_at(dir)?;
    let dir = component.location.as_path();

    let out_dir = dir.join(profile.out_dir());
    fs::remove_dir_all_if_exists(&out_dir)?;
    fs::ensure_dir(&out_dir)?;

    let html = dir.join("src").join("index.html");
    fs::copy_file(&html, &out_dir.join("index.html"))
        .with_context(|| format!("`{}` needs `src/index.html`", component.name))?;

    shell.status(
        Status::Building,
        format!("{} ({})", component.name, profile.config_file()),
    );
    process::tool(ws.config().tools.npx())?
        .args(profile.webpack_args())
        .cwd(dir)
        .run()
}
