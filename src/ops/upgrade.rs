//! Implementation of `monohook upgrade` and `monohook apply-upgrade`.
//!
//! `upgrade` rewrites dependency ranges past their declared bounds with
//! npm-check-updates, one component at a time. The result is left for review;
//! `apply-upgrade` then runs a regular update on top and commits every open
//! change.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Result};
use git2::Oid;

use super::update::{
    commit_index, open_repo, reinstall_dependencies, stage_all, update, PackageBackup, UpdateOptions,
};
use crate::core::workspace::Workspace;
use crate::util::process;
use crate::util::{Prompter, Shell, Status};

/// Message of the commit created by `apply-upgrade`.
pub const UPGRADE_COMMIT_MESSAGE: &str = "Upgrade dependencies";

/// Highest kind of release an upgrade may move to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeTarget {
    Major,
    Minor,
    Patch,
}

impl UpgradeTarget {
    pub const ALL: [UpgradeTarget; 3] = [UpgradeTarget::Major, UpgradeTarget::Minor, UpgradeTarget::Patch];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeTarget::Major => "major",
            UpgradeTarget::Minor => "minor",
            UpgradeTarget::Patch => "patch",
        }
    }
}

impl fmt::Display for UpgradeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpgradeTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "major" => Ok(UpgradeTarget::Major),
            "minor" => Ok(UpgradeTarget::Minor),
            "patch" => Ok(UpgradeTarget::Patch),
            other => bail!("unknown upgrade target `{}` (expected major, minor or patch)", other),
        }
    }
}

/// Options for an upgrade.
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    /// Asked for when unset
    pub target: Option<UpgradeTarget>,
    /// ncu filter, `*` for everything
    pub filter: String,
    /// Comma separated packages to leave alone, on top of the pinned ones
    pub exclude: Option<String>,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        UpgradeOptions {
            target: None,
            filter: "*".to_string(),
            exclude: None,
        }
    }
}

#[derive(Debug)]
pub struct UpgradeReport {
    pub target: UpgradeTarget,
    /// Components where ncu failed; their manifests are as ncu left them
    pub failed: Vec<String>,
}

/// Upgrade the dependency ranges of every component.
pub fn upgrade(
    ws: &Workspace,
    opts: &UpgradeOptions,
    shell: &Arc<Shell>,
    prompter: &dyn Prompter,
) -> Result<UpgradeReport> {
    let target = match opts.target {
        Some(target) => target,
        None => {
            let items: Vec<String> = UpgradeTarget::ALL.iter().map(|t| t.to_string()).collect();
            UpgradeTarget::ALL[prompter.select("Target version", &items, 0)?]
        }
    };
    let reject = reject_list(&ws.config().upgrade.pinned, opts.exclude.as_deref());

    let components = ws.components_with_root()?;
    let mut backup = PackageBackup::create(&components, false)?;
    backup.link_npmrc(ws.root(), &components, shell)?;

    let mut report = UpgradeReport {
        target,
        failed: Vec::new(),
    };
    for component in &components {
        shell.status(
            Status::Running,
            format!("upgrading dependencies of {} to the latest {} versions", component.name, target),
        );
        let mut ncu = process::tool(ws.config().tools.npx())?
            .args(["ncu", "--upgrade", "--target", target.as_str(), "--filter", opts.filter.as_str()])
            .cwd(&component.location);
        if let Some(reject) = &reject {
            ncu = ncu.args(["--reject", reject.as_str()]);
        }
        if let Err(e) = ncu.run() {
            shell.warn(format!("failed to upgrade dependencies of {}: {:#}", component.name, e));
            report.failed.push(component.name.clone());
        }
    }

    backup.release()?;
    reinstall_dependencies(ws, &components, shell)?;

    shell.note("review the upgraded ranges, then run `monohook apply-upgrade`");
    Ok(report)
}

/// Update on top of an upgrade and commit every open change.
pub fn apply_upgrade(ws: &Workspace, shell: &Arc<Shell>, prompter: &dyn Prompter) -> Result<Option<Oid>> {
    let repo = open_repo(ws)?;
    update(ws, &UpdateOptions { no_git: true }, shell, prompter)?;

    stage_all(&repo)?;
    let commit = commit_index(&repo, UPGRADE_COMMIT_MESSAGE)?;
    match commit {
        Some(_) => shell.status(Status::Committed, UPGRADE_COMMIT_MESSAGE),
        None => shell.status(Status::Info, "nothing to commit"),
    }
    Ok(commit)
}

/// Packages ncu must not touch: the configured pins plus `exclude`.
fn reject_list(pinned: &[String], exclude: Option<&str>) -> Option<String> {
    let names: Vec<&str> = pinned
        .iter()
        .map(String::as_str)
        .chain(exclude.into_iter().flat_map(|e| e.split(',')))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(","))
    }
}
