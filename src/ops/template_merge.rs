//! Implementation of the `merge-template` hook.
//!
//! Pulls the latest state of the template repository into the workspace as
//! one squashed commit. The flow is a small state machine:
//!
//! ```text
//! CleanCheck -> RemoteRegistered -> Fetched -> MergeAttempted
//!     -> WaitingForConflictResolution* -> Staged -> UntrackedReview -> Committed
//! ```
//!
//! The temporary remote is owned by a [`RemoteGuard`] and is removed on every
//! exit path. Ctrl-C while the remote is registered removes it as well.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use anyhow::{bail, Context, Result};
use git2::{Oid, Repository, Status as GitStatus, StatusOptions};

use crate::core::errors::HookError;
use crate::core::workspace::Workspace;
use crate::util::config::TemplateConfig;
use crate::util::fs;
use crate::util::process;
use crate::util::{Prompter, Shell, Status};

/// Message of the squashed merge commit.
pub const MERGE_COMMIT_MESSAGE: &str = "Merge changes from template repository";

/// Push URL set on the temporary remote so nothing can be pushed to it.
const NO_PUSH_URL: &str = "no-push";

/// Where the template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTemplateOptions {
    pub url: String,
    pub branch: String,
    pub remote: String,
}

impl MergeTemplateOptions {
    pub fn from_config(template: &TemplateConfig) -> Result<Self> {
        let url = template
            .url
            .clone()
            .context("no template repository configured, set `url` in the `[template]` section")?;
        Ok(MergeTemplateOptions {
            url,
            branch: template.branch().to_string(),
            remote: template.remote().to_string(),
        })
    }

    fn tracking_ref(&self) -> String {
        format!("refs/remotes/{}/{}", self.remote, self.branch)
    }

    fn refspec(&self) -> String {
        format!("+refs/heads/{}:{}", self.branch, self.tracking_ref())
    }
}

/// States of a template merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeState {
    CleanCheck,
    RemoteRegistered,
    Fetched,
    MergeAttempted,
    WaitingForConflictResolution { conflicts: Vec<PathBuf> },
    Staged,
    UntrackedReview { untracked: Vec<PathBuf> },
    Committed(MergeOutcome),
}

/// How a successful merge ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The squashed changes were committed
    Committed { commit: Oid, untracked: Vec<PathBuf> },
    /// The template brought no changes
    UpToDate { untracked: Vec<PathBuf> },
}

/// Remote currently registered by a guard, for the interrupt handler.
static ACTIVE_REMOTE: Mutex<Option<(PathBuf, String)>> = Mutex::new(None);
static INTERRUPT_HANDLER: Once = Once::new();

/// A temporary remote that is deleted when the guard goes out of scope.
pub struct RemoteGuard {
    workdir: PathBuf,
    name: String,
}

impl RemoteGuard {
    /// Register `name` as a fetch-only remote for `url`.
    ///
    /// Fails without side effects if a remote of that name exists.
    pub fn register(repo: &Repository, name: &str, url: &str) -> Result<Self> {
        if repo.find_remote(name).is_ok() {
            return Err(HookError::RemoteExists {
                name: name.to_string(),
            }
            .into());
        }

        repo.remote(name, url)
            .with_context(|| format!("failed to add remote `{}`", name))?;
        let workdir = repo_workdir(repo)?;
        let guard = RemoteGuard {
            workdir: workdir.clone(),
            name: name.to_string(),
        };
        repo.remote_set_pushurl(name, Some(NO_PUSH_URL))
            .with_context(|| format!("failed to make remote `{}` read-only", name))?;

        install_interrupt_handler();
        if let Ok(mut active) = ACTIVE_REMOTE.lock() {
            *active = Some((workdir, name.to_string()));
        }
        tracing::debug!("registered temporary remote `{}` -> {}", name, url);
        Ok(guard)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RemoteGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = ACTIVE_REMOTE.lock() {
            if active.as_ref().is_some_and(|(dir, name)| dir == &self.workdir && name == &self.name) {
                *active = None;
            }
        }
        if let Err(e) = remove_remote(&self.workdir, &self.name) {
            tracing::warn!("failed to remove remote `{}`: {:#}", self.name, e);
        }
    }
}

fn remove_remote(workdir: &Path, name: &str) -> Result<()> {
    let repo = Repository::open(workdir)?;
    if repo.find_remote(name).is_ok() {
        repo.remote_delete(name)?;
        tracing::debug!("removed temporary remote `{}`", name);
    }
    Ok(())
}

fn install_interrupt_handler() {
    INTERRUPT_HANDLER.call_once(|| {
        let result = ctrlc::set_handler(|| {
            let active = ACTIVE_REMOTE.lock().ok().and_then(|mut a| a.take());
            if let Some((workdir, name)) = active {
                eprintln!("\ninterrupted, removing remote `{}`", name);
                let _ = remove_remote(&workdir, &name);
            }
            std::process::exit(130);
        });
        if let Err(e) = result {
            tracing::debug!("could not install interrupt handler: {}", e);
        }
    });
}

fn repo_workdir(repo: &Repository) -> Result<PathBuf> {
    repo.workdir()
        .map(Path::to_path_buf)
        .context("cannot merge the template into a bare repository")
}

/// Merge the template repository into the workspace.
pub fn merge_template(
    ws: &Workspace,
    opts: &MergeTemplateOptions,
    shell: &Arc<Shell>,
    prompter: &dyn Prompter,
) -> Result<MergeOutcome> {
    let repo = Repository::discover(ws.root())
        .with_context(|| format!("`{}` is not inside a git repository", ws.root().display()))?;
    let workdir = repo_workdir(&repo)?;

    let mut state = MergeState::CleanCheck;
    let mut guard: Option<RemoteGuard> = None;

    loop {
        tracing::debug!("template merge: {:?}", state);
        state = match state {
            MergeState::CleanCheck => {
                ensure_clean(&repo)?;
                guard = Some(RemoteGuard::register(&repo, &opts.remote, &opts.url)?);
                MergeState::RemoteRegistered
            }
            MergeState::RemoteRegistered => {
                fetch(&repo, opts, shell)?;
                MergeState::Fetched
            }
            MergeState::Fetched => {
                let merged = attempt_merge(ws, &workdir, opts, shell)?;
                let conflicts = conflicted_paths(&repo)?;
                if !conflicts.is_empty() {
                    MergeState::WaitingForConflictResolution { conflicts }
                } else if !merged {
                    bail!("merging `{}/{}` failed", opts.remote, opts.branch);
                } else {
                    MergeState::MergeAttempted
                }
            }
            MergeState::WaitingForConflictResolution { conflicts } => {
                shell.warn(format!("{} file(s) have merge conflicts:", conflicts.len()));
                for path in &conflicts {
                    shell.print(format!("    {}", path.display()));
                }
                shell.note("resolve them, then stage the files with `git add`");
                if !prompter.confirm("Conflicts resolved, continue?", true)? {
                    return Err(HookError::Cancelled.into());
                }
                let conflicts = conflicted_paths(&repo)?;
                if conflicts.is_empty() {
                    MergeState::MergeAttempted
                } else {
                    MergeState::WaitingForConflictResolution { conflicts }
                }
            }
            MergeState::MergeAttempted => {
                stage_tracked(&repo)?;
                MergeState::Staged
            }
            MergeState::Staged => MergeState::UntrackedReview {
                untracked: untracked_paths(&repo)?,
            },
            MergeState::UntrackedReview { untracked } => {
                if !untracked.is_empty() {
                    shell.note("untracked files were left alone, add or delete them manually:");
                    for path in &untracked {
                        shell.print(format!("    {}", path.display()));
                    }
                }
                MergeState::Committed(commit(&repo, untracked, shell)?)
            }
            MergeState::Committed(outcome) => {
                drop(guard);
                return Ok(outcome);
            }
        };
    }
}

/// Abort when tracked files have staged or unstaged changes.
fn ensure_clean(repo: &Repository) -> Result<()> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts)).context("failed to read git status")?;

    let dirty = GitStatus::INDEX_NEW
        | GitStatus::INDEX_MODIFIED
        | GitStatus::INDEX_DELETED
        | GitStatus::INDEX_RENAMED
        | GitStatus::INDEX_TYPECHANGE
        | GitStatus::WT_MODIFIED
        | GitStatus::WT_DELETED
        | GitStatus::WT_RENAMED
        | GitStatus::WT_TYPECHANGE
        | GitStatus::CONFLICTED;
    if statuses.iter().any(|entry| entry.status().intersects(dirty)) {
        return Err(HookError::DirtyWorkingTree.into());
    }
    Ok(())
}

fn fetch(repo: &Repository, opts: &MergeTemplateOptions, shell: &Arc<Shell>) -> Result<()> {
    let _span = shell.span(Status::Fetching, &opts.url);
    let mut remote = repo.find_remote(&opts.remote)?;
    remote
        .fetch(&[opts.refspec().as_str()], None, None)
        .with_context(|| format!("failed to fetch {}", opts.url))?;

    if repo.find_reference(&opts.tracking_ref()).is_err() {
        return Err(HookError::BranchNotFound {
            remote: opts.remote.clone(),
            branch: opts.branch.clone(),
        }
        .into());
    }
    Ok(())
}

/// Squash-merge the fetched branch. Returns whether git reported success.
fn attempt_merge(
    ws: &Workspace,
    workdir: &Path,
    opts: &MergeTemplateOptions,
    shell: &Arc<Shell>,
) -> Result<bool> {
    shell.status(Status::Merging, format!("{}/{}", opts.remote, opts.branch));
    let status = process::tool(ws.config().tools.git())?
        .args(["merge", "--squash", "--allow-unrelated-histories"])
        .arg(format!("{}/{}", opts.remote, opts.branch))
        .cwd(workdir)
        .status()?;
    Ok(status.success())
}

fn conflicted_paths(repo: &Repository) -> Result<Vec<PathBuf>> {
    let mut index = repo.index()?;
    index.read(true)?;
    if !index.has_conflicts() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
        if let Some(entry) = entry {
            paths.push(PathBuf::from(String::from_utf8_lossy(&entry.path).into_owned()));
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

fn stage_tracked(repo: &Repository) -> Result<()> {
    let mut index = repo.index()?;
    index.read(true)?;
    index
        .update_all(["*"].iter(), None)
        .context("failed to stage changes")?;
    index.write().context("failed to write index")?;
    Ok(())
}

fn untracked_paths(repo: &Repository) -> Result<Vec<PathBuf>> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts))?;

    let mut paths: Vec<PathBuf> = statuses
        .iter()
        .filter(|entry| entry.status().contains(GitStatus::WT_NEW))
        .filter_map(|entry| entry.path().map(PathBuf::from))
        .collect();
    paths.sort();
    Ok(paths)
}

fn commit(repo: &Repository, untracked: Vec<PathBuf>, shell: &Arc<Shell>) -> Result<MergeOutcome> {
    let mut index = repo.index()?;
    let tree_id = index.write_tree().context("failed to write tree")?;
    let head = repo.head()?.peel_to_commit()?;

    // `git merge --squash` leaves a prepared message behind
    fs::remove_file_if_exists(&repo.path().join("SQUASH_MSG"))?;

    if head.tree_id() == tree_id {
        shell.status(Status::Info, "already up to date with the template");
        return Ok(MergeOutcome::UpToDate { untracked });
    }

    let tree = repo.find_tree(tree_id)?;
    let signature = repo
        .signature()
        .context("git user.name and user.email must be configured to commit")?;
    let commit = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        MERGE_COMMIT_MESSAGE,
        &tree,
        &[&head],
    )?;
    shell.status(Status::Committed, MERGE_COMMIT_MESSAGE);
    Ok(MergeOutcome::Committed { commit, untracked })
}
