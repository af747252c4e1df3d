//! Implementation of `monohook update`.
//!
//! Updates the dependencies of every component within their declared ranges
//! and audits them:
//!
//! ```text
//! back up package.json and package-lock.json of every component
//! drop internal dependencies that point at the local version
//! per component: npm outdated, npm update --save, npm audit fix
//! restore internal dependencies, reinstall from the root, commit
//! ```
//!
//! Until the internal dependencies are restored, any error or a declined
//! prompt puts every backup back in place.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use git2::{IndexAddOption, Oid, Repository, Status as GitStatus, StatusOptions};
use semver::Version;

use crate::core::component::Component;
use crate::core::errors::HookError;
use crate::core::manifest::{DependencyKind, Manifest, MANIFEST_NAME};
use crate::core::npm_range::satisfies;
use crate::core::workspace::Workspace;
use crate::util::fs;
use crate::util::process;
use crate::util::{Prompter, Shell, Status};

/// Message of the commit holding updated manifests and lock files.
pub const UPDATE_COMMIT_MESSAGE: &str = "Update dependencies";

/// npm lock file next to each manifest.
pub const LOCK_FILE: &str = "package-lock.json";

const NPMRC: &str = ".npmrc";
const NODE_MODULES: &str = "node_modules";
const BACKUP_SUFFIX: &str = ".bak";

/// Options for a dependency update.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Skip the open-changes check and the commit
    pub no_git: bool,
}

/// What a dependency update did.
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Components whose audit left high or critical issues the operator accepted
    pub unresolved_audits: Vec<String>,
    pub commit: Option<Oid>,
}

/// Update and audit the dependencies of every component.
pub fn update(
    ws: &Workspace,
    opts: &UpdateOptions,
    shell: &Arc<Shell>,
    prompter: &dyn Prompter,
) -> Result<UpdateReport> {
    let components = ws.components_with_root()?;
    shell.status(
        Status::Info,
        format!("found {} components in this repository", components.len() - 1),
    );

    let repo = if opts.no_git {
        None
    } else {
        let repo = open_repo(ws)?;
        ensure_manifests_committed(&repo)?;
        Some(repo)
    };

    let mut backup = PackageBackup::create(&components, true)?;
    backup.link_npmrc(ws.root(), &components, shell)?;
    strip_internal_dependencies(&components, ws.indent(), shell)?;

    let mut report = UpdateReport::default();
    for component in &components {
        if !update_component(ws, component, shell, prompter)? {
            report.unresolved_audits.push(component.name.clone());
        }
    }

    restore_internal_dependencies(&components, ws.indent())?;
    backup.release()?;
    reinstall_dependencies(ws, &components, shell)?;

    if let Some(repo) = repo {
        stage_paths(&repo, &package_files(&components))?;
        report.commit = commit_index(&repo, UPDATE_COMMIT_MESSAGE)?;
        match report.commit {
            Some(_) => shell.status(Status::Committed, UPDATE_COMMIT_MESSAGE),
            None => shell.status(Status::Info, "no updates found"),
        }
    }
    Ok(report)
}

/// Run npm's update and audit in one component.
///
/// Returns `false` when the audit could not fix everything and the operator
/// chose to go on anyway.
fn update_component(
    ws: &Workspace,
    component: &Component,
    shell: &Shell,
    prompter: &dyn Prompter,
) -> Result<bool> {
    shell.status(
        Status::Running,
        format!("updating and auditing dependencies of {}", component.name),
    );
    let npm = ws.config().tools.npm();
    let dir = &component.location;

    if dir.join(NODE_MODULES).is_dir() {
        // exits 1 whenever updates exist, the listing is informational
        let outdated = process::tool(npm)?.arg("outdated").cwd(dir).status()?;
        tracing::debug!("npm outdated in {}: {}", dir.display(), outdated);
    }

    process::tool(npm)?
        .args(["update", "--save", "--no-fund", "--no-audit"])
        .cwd(dir)
        .run()?;

    let audit = process::tool(npm)?
        .args(["audit", "fix", "--audit-level=high", "--no-fund"])
        .cwd(dir)
        .status()?;
    if audit.success() {
        return Ok(true);
    }

    shell.warn(format!(
        "npm audit could not fix every vulnerability of level `high` or `critical` in {}",
        component.name
    ));
    shell.note("the output above has the details, fix them manually before continuing");
    if !prompter.confirm("Proceed?", true)? {
        return Err(HookError::Cancelled.into());
    }
    Ok(false)
}

// ============================================================================
// Internal dependencies
// ============================================================================

/// Remove internal dependency references that admit the local version, so
/// npm leaves them to the workspace.
///
/// A reference that does not admit the local version is assumed to point at
/// a published release and stays.
fn strip_internal_dependencies(components: &[Component], indent: usize, shell: &Shell) -> Result<()> {
    let internal: Vec<(&str, Version)> = components
        .iter()
        .filter(|c| !c.is_root())
        .filter_map(|c| Version::parse(&c.version).ok().map(|v| (c.name.as_str(), v)))
        .collect();

    for component in components {
        let mut manifest = Manifest::load(&component.manifest_path())?;
        let mut changed = false;

        for (name, version) in &internal {
            let reference = [DependencyKind::Normal, DependencyKind::Dev]
                .into_iter()
                .find_map(|kind| manifest.dependency(kind, name).map(|r| (kind, r.to_string())));
            let Some((kind, range)) = reference else {
                continue;
            };

            if satisfies(version, &range) {
                manifest.remove_dependency(kind, name);
                changed = true;
            } else {
                shell.warn(format!(
                    "{}: {}@{} does not reference the local version {}, assuming it was published",
                    component.name, name, range, version
                ));
            }
        }

        if changed {
            manifest.save(indent)?;
        }
    }
    Ok(())
}

/// Write the backed-up manifests back with the ranges npm settled on.
///
/// Starting from the backup keeps the removed internal references in their
/// original position.
fn restore_internal_dependencies(components: &[Component], indent: usize) -> Result<()> {
    for component in components {
        let path = component.manifest_path();
        let backup = backup_path(&path);
        let updated = Manifest::load(&path)?;
        let mut original = Manifest::load(&backup)?;

        let mut changed = false;
        for kind in [DependencyKind::Normal, DependencyKind::Dev] {
            for (name, range) in updated.dependencies(kind) {
                if original.dependency(kind, &name) != Some(range.as_str()) {
                    original.set_dependency(kind, &name, &range);
                    changed = true;
                }
            }
        }

        if changed {
            fs::write_json(&path, original.content(), indent)?;
        } else {
            fs::copy_file(&backup, &path)?;
        }
    }
    Ok(())
}

/// `npm update` installs into each component; remove those trees and
/// install once from the root so the workspace links come back.
pub(crate) fn reinstall_dependencies(ws: &Workspace, components: &[Component], shell: &Shell) -> Result<()> {
    shell.status(Status::Installing, "dependencies from the workspace root");
    for component in components.iter().filter(|c| !c.is_root()) {
        fs::remove_dir_all_if_exists(&component.location.join(NODE_MODULES))?;
    }
    process::tool(ws.config().tools.npm())?
        .arg("install")
        .cwd(ws.root())
        .run()
}

// ============================================================================
// Backups
// ============================================================================

/// Backups of component manifests (and lock files) plus the `.npmrc` copies
/// made for one run.
///
/// Dropping it without [`release`](Self::release) restores every backup.
/// Linked `.npmrc` files are removed either way.
pub(crate) struct PackageBackup {
    files: Vec<PathBuf>,
    linked: Vec<PathBuf>,
    released: bool,
}

impl PackageBackup {
    /// Back up every manifest, and every existing lock file if `lock_files`.
    pub(crate) fn create(components: &[Component], lock_files: bool) -> Result<Self> {
        let mut backup = PackageBackup {
            files: Vec::new(),
            linked: Vec::new(),
            released: false,
        };
        for component in components {
            let manifest = component.manifest_path();
            fs::copy_file(&manifest, &backup_path(&manifest))?;
            backup.files.push(manifest);

            let lock = component.location.join(LOCK_FILE);
            if lock_files && lock.is_file() {
                fs::copy_file(&lock, &backup_path(&lock))?;
                backup.files.push(lock);
            }
        }
        Ok(backup)
    }

    /// Copy the root `.npmrc` into every component so npm authenticates
    /// with it. A missing root file is only worth a warning.
    pub(crate) fn link_npmrc(&mut self, root: &Path, components: &[Component], shell: &Shell) -> Result<()> {
        let source = root.join(NPMRC);
        if !source.is_file() {
            shell.warn(format!("could not read {}: file does not exist", source.display()));
            return Ok(());
        }
        for component in components.iter().filter(|c| !c.is_root()) {
            let target = component.location.join(NPMRC);
            fs::copy_file(&source, &target)?;
            self.linked.push(target);
        }
        Ok(())
    }

    /// Keep the current files: delete the backups and unlink `.npmrc`.
    pub(crate) fn release(mut self) -> Result<()> {
        self.released = true;
        for file in &self.files {
            fs::remove_file_if_exists(&backup_path(file))?;
        }
        Ok(())
    }
}

impl Drop for PackageBackup {
    fn drop(&mut self) {
        if !self.released {
            for file in &self.files {
                let backup = backup_path(file);
                if !backup.is_file() {
                    continue;
                }
                let restored = fs::copy_file(&backup, file).and_then(|_| fs::remove_file_if_exists(&backup));
                if let Err(e) = restored {
                    tracing::warn!("failed to restore {}: {:#}", file.display(), e);
                }
            }
        }
        for npmrc in &self.linked {
            if let Err(e) = fs::remove_file_if_exists(npmrc) {
                tracing::warn!("{:#}", e);
            }
        }
    }
}

fn backup_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

// ============================================================================
// Git
// ============================================================================

pub(crate) fn open_repo(ws: &Workspace) -> Result<Repository> {
    Repository::discover(ws.root())
        .with_context(|| format!("`{}` is not inside a git repository", ws.root().display()))
}

/// Refuse to run while a manifest has staged or unstaged changes; they would
/// end up in the update commit.
fn ensure_manifests_committed(repo: &Repository) -> Result<()> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts)).context("failed to read git status")?;

    let files: Vec<String> = statuses
        .iter()
        .filter(|entry| entry.status() != GitStatus::CURRENT)
        .filter_map(|entry| entry.path().map(str::to_string))
        .filter(|path| Path::new(path).file_name() == Some(OsStr::new(MANIFEST_NAME)))
        .collect();
    if !files.is_empty() {
        return Err(HookError::UncommittedManifests { files }.into());
    }
    Ok(())
}

/// Manifests and existing lock files of every component.
fn package_files(components: &[Component]) -> Vec<PathBuf> {
    components
        .iter()
        .flat_map(|c| [c.manifest_path(), c.location.join(LOCK_FILE)])
        .filter(|path| path.is_file())
        .collect()
}

fn stage_paths(repo: &Repository, paths: &[PathBuf]) -> Result<()> {
    let workdir = repo
        .workdir()
        .context("cannot commit in a bare repository")?
        .canonicalize()?;

    let mut index = repo.index()?;
    for path in paths {
        let absolute = path
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        let rel = absolute
            .strip_prefix(&workdir)
            .with_context(|| format!("{} is outside the repository", absolute.display()))?;
        index.add_path(rel)?;
    }
    index.write()?;
    Ok(())
}

/// Stage every change in the work tree, new files included.
pub(crate) fn stage_all(repo: &Repository) -> Result<()> {
    let mut index = repo.index()?;
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .context("failed to stage changes")?;
    index.update_all(["*"].iter(), None).context("failed to stage changes")?;
    index.write().context("failed to write index")?;
    Ok(())
}

/// Commit the index on HEAD unless it matches HEAD's tree.
pub(crate) fn commit_index(repo: &Repository, message: &str) -> Result<Option<Oid>> {
    let mut index = repo.index()?;
    let tree_id = index.write_tree().context("failed to write tree")?;
    let head = repo
        .head()
        .context("the repository has no commits")?
        .peel_to_commit()?;
    if head.tree_id() == tree_id {
        return Ok(None);
    }

    let tree = repo.find_tree(tree_id)?;
    let signature = repo
        .signature()
        .context("git user.name and user.email must be configured to commit")?;
    let commit = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &[&head])?;
    Ok(Some(commit))
}


#[cfg(all(test, unix))]
mod driver_tests {
    use super::*;
    use crate::core::component::Partition;
    use crate::test_support::{quiet_shell, Answer, ScriptedPrompter, WorkspaceFixture};

    fn fixture(npm_exit: i32) -> WorkspaceFixture {
        let fixture = WorkspaceFixture::new("test");
        fixture.use_fake_tools(&[("npm", npm_exit)], "");
        fixture.add_component(
            Partition::Libs,
            "core",
            r#"{"name": "@monorepo/test.core", "version": "1.0.0", "dependencies": {"lodash": "^4.17.0"}}"#,
        );
        fixture.add_component(
            Partition::Libs,
            "ui",
            r#"{"name": "@monorepo/test.ui", "version": "1.0.0", "dependencies": {"@monorepo/test.core": "^1.0.0", "@monorepo/test.old": "^0.1.0", "react": "^18.2.0"}}"#,
        );
        fixture.add_component(
            Partition::Libs,
            "old",
            r#"{"name": "@monorepo/test.old", "version": "0.2.0"}"#,
        );
        fixture.write("libs/test.ui/package-lock.json", "{\"lockfileVersion\": 3}\n");
        fixture
    }

    /// A fake npm whose `audit` fails and whose `update` rewrites the ui
    /// manifest the way `npm update --save` would.
    fn npm_with_failing_audit(fixture: &WorkspaceFixture) {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            "#!/bin/sh\n\
             echo \"npm $*\" >> \"{log}\"\n\
             case \"$1\" in\n\
             update) if [ -f ui.marker ]; then echo '{{\"name\": \"@monorepo/test.ui\", \"version\": \"1.0.0\", \"dependencies\": {{\"@monorepo/test.old\": \"^0.1.0\", \"react\": \"^18.3.1\"}}}}' > package.json; fi ;;\n\
             audit) exit 1 ;;\n\
             esac\n\
             exit 0\n",
            log = fixture.root().join(".bin/calls.log").display()
        );
        let npm = fixture.write(".bin/npm", &script);
        std::fs::set_permissions(&npm, std::fs::Permissions::from_mode(0o755)).unwrap();
        fixture.write("libs/test.ui/ui.marker", "");
    }

    #[test]
    fn test_update_runs_npm_per_component_and_restores_internal_dependencies() {
        let fixture = fixture(0);
        fixture.write("libs/test.core/node_modules/.keep", "");
        fixture.write(".npmrc", "//registry.example.com/:_authToken=secret\n");
        let prompter = ScriptedPrompter::new([]);

        let report = update(
            &fixture.workspace(),
            &UpdateOptions { no_git: true },
            &quiet_shell(),
            &prompter,
        )
        .unwrap();
        assert!(report.unresolved_audits.is_empty());
        assert!(report.commit.is_none());

        let calls = fixture.calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("npm update --save")).count(), 4);
        assert_eq!(calls.iter().filter(|c| c.starts_with("npm audit fix")).count(), 4);
        // only the component with installed modules lists outdated packages
        assert_eq!(calls.iter().filter(|c| *c == "npm outdated").count(), 1);
        assert_eq!(calls.last().map(String::as_str), Some("npm install"));

        let ui = fixture.read_json("libs/test.ui/package.json");
        assert_eq!(ui["dependencies"]["@monorepo/test.core"], "^1.0.0");
        assert_eq!(ui["dependencies"]["@monorepo/test.old"], "^0.1.0");
        let keys: Vec<&String> = ui["dependencies"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["@monorepo/test.core", "@monorepo/test.old", "react"]);

        assert!(!fixture.root().join("libs/test.core/node_modules").exists());
        assert!(!fixture.root().join("libs/test.ui/package.json.bak").exists());
        assert!(!fixture.root().join("libs/test.ui/package-lock.json.bak").exists());
        assert!(!fixture.root().join("libs/test.ui/.npmrc").exists());
    }

    #[test]
    fn test_strip_keeps_references_to_published_versions() {
        let fixture = fixture(0);
        let ws = fixture.workspace();
        let components = ws.components_with_root().unwrap();

        strip_internal_dependencies(&components, 2, &quiet_shell()).unwrap();
        let ui = fixture.read_json("libs/test.ui/package.json");
        assert!(ui["dependencies"].get("@monorepo/test.core").is_none());
        // ^0.1.0 does not admit the local 0.2.0
        assert_eq!(ui["dependencies"]["@monorepo/test.old"], "^0.1.0");
        assert_eq!(ui["dependencies"]["react"], "^18.2.0");
    }

    #[test]
    fn test_accepted_audit_failure_keeps_npm_ranges() {
        let fixture = fixture(0);
        npm_with_failing_audit(&fixture);
        let prompter = ScriptedPrompter::new(vec![Answer::Confirm(true); 4]);

        let report = update(
            &fixture.workspace(),
            &UpdateOptions { no_git: true },
            &quiet_shell(),
            &prompter,
        )
        .unwrap();
        prompter.assert_exhausted();
        assert_eq!(report.unresolved_audits.len(), 4);

        let ui = fixture.read_json("libs/test.ui/package.json");
        assert_eq!(ui["dependencies"]["react"], "^18.3.1");
        assert_eq!(ui["dependencies"]["@monorepo/test.core"], "^1.0.0");
    }

    #[test]
    fn test_declined_audit_restores_backups() {
        let fixture = fixture(0);
        npm_with_failing_audit(&fixture);
        fixture.write(".npmrc", "//registry.example.com/:_authToken=secret\n");
        let before = fixture.read("libs/test.ui/package.json");
        let prompter = ScriptedPrompter::new([Answer::Confirm(false)]);

        let err = update(
            &fixture.workspace(),
            &UpdateOptions { no_git: true },
            &quiet_shell(),
            &prompter,
        )
        .unwrap_err();
        assert!(matches!(err.downcast_ref::<HookError>(), Some(HookError::Cancelled)));

        assert_eq!(fixture.read("libs/test.ui/package.json"), before);
        assert_eq!(fixture.read("libs/test.ui/package-lock.json"), "{\"lockfileVersion\": 3}\n");
        assert!(!fixture.root().join("libs/test.ui/package.json.bak").exists());
        assert!(!fixture.root().join("libs/test.core/.npmrc").exists());
        assert!(!fixture.calls().iter().any(|c| c == "npm install"));
    }

    #[test]
    fn test_failed_update_restores_backups() {
        let fixture = fixture(1);
        let before = fixture.read("libs/test.ui/package.json");

        let err = update(
            &fixture.workspace(),
            &UpdateOptions { no_git: true },
            &quiet_shell(),
            &ScriptedPrompter::new([]),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HookError>(),
            Some(HookError::ToolFailed { .. })
        ));
        assert_eq!(fixture.read("libs/test.ui/package.json"), before);
        assert!(!fixture.root().join("libs/test.ui/package.json.bak").exists());
    }

    #[test]
    fn test_open_manifest_changes_abort() {
        let fixture = fixture(0);
        fixture.git_init();
        fixture.write(
            "libs/test.core/package.json",
            r#"{"name": "@monorepo/test.core", "version": "1.1.0"}"#,
        );

        let err = update(
            &fixture.workspace(),
            &UpdateOptions::default(),
            &quiet_shell(),
            &ScriptedPrompter::new([]),
        )
        .unwrap_err();
        match err.downcast_ref::<HookError>() {
            Some(HookError::UncommittedManifests { files }) => {
                assert_eq!(files, &vec!["libs/test.core/package.json".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(fixture.calls().is_empty());
    }

    #[test]
    fn test_update_commits_changed_package_files() {
        let fixture = fixture(0);
        npm_with_failing_audit(&fixture);
        let repo = fixture.git_init();
        fixture.write("notes.txt", "not part of the update\n");
        let prompter = ScriptedPrompter::new(vec![Answer::Confirm(true); 4]);

        let report = update(&fixture.workspace(), &UpdateOptions::default(), &quiet_shell(), &prompter).unwrap();
        let commit = report.commit.unwrap();

        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.id(), commit);
        assert_eq!(head.message(), Some(UPDATE_COMMIT_MESSAGE));
        let tree = head.tree().unwrap();
        assert!(tree.get_path(Path::new("notes.txt")).is_err());
        let statuses = repo.statuses(None).unwrap();
        assert!(statuses
            .iter()
            .all(|entry| entry.path() != Some("libs/test.ui/package.json")));
    }

    #[test]
    fn test_nothing_to_commit_without_changes() {
        let fixture = fixture(0);
        let repo = fixture.git_init();
        let before = repo.head().unwrap().target().unwrap();

        let report = update(
            &fixture.workspace(),
            &UpdateOptions::default(),
            &quiet_shell(),
            &ScriptedPrompter::new([]),
        )
        .unwrap();
        assert!(report.commit.is_none());
        assert_eq!(repo.head().unwrap().target().unwrap(), before);
    }
}
