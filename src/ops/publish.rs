//! The release driver behind `monohook publish`.
//!
//! Asks which components to publish and at which versions, then walks the
//! publish lifecycle:
//!
//! ```text
//! pre-publish-global
//!   for each component: pre-publish, npm publish (per registry), post-publish
//! git commit + tags
//! post-publish-global
//! git push
//! ```
//!
//! Every hook runs through `npm run` so that overrides and manifest scripts
//! apply exactly as they do for npm itself.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use git2::Repository;
use semver::Version;

use crate::core::component::Component;
use crate::core::errors::HookError;
use crate::core::manifest::{DependencyKind, Manifest, MANIFEST_NAME};
use crate::core::npm_range::{extract_version, range_prefix, satisfies};
use crate::core::payload::{
    encode_components, encode_registries, render_flag, PublishableComponent, RegistryPayload,
};
use crate::core::scope::PublishMode;
use crate::core::workspace::Workspace;
use crate::hooks::HookName;
use crate::util::config::RegistryEntry;
use crate::util::fs;
use crate::util::process;
use crate::util::{Prompter, Shell, Status};

/// Message of the commit holding the bumped manifests.
pub const PUBLISH_COMMIT_MESSAGE: &str = "Publish";

const NPMRC: &str = ".npmrc";
const BACKUP_SUFFIX: &str = ".bak";

/// Options for a publish run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishOptions {
    /// Pass `--dry-run` to npm and restore every manifest afterwards
    pub dry_run: bool,

    /// Skip the git commit, tags and push
    pub no_git: bool,

    /// Leave out registries that already hold the target version
    pub skip_existing: bool,

    /// Publish the current versions instead of asking for new ones
    pub keep_version: bool,
}

/// An internal dependency reference rewritten although its old range did not
/// admit the new version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForcedUpdate {
    pub component: String,
    pub dependency: String,
    pub from: String,
    pub to: String,
}

/// What a publish run did.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub published: Vec<PublishableComponent>,
    /// Selected components every registry already held
    pub skipped: Vec<PublishableComponent>,
    pub forced: Vec<ForcedUpdate>,
    /// Git references created for the release
    pub git_refs: Vec<String>,
    pub pushed: bool,
}

/// Publish components of the workspace.
pub fn publish(
    ws: &Workspace,
    opts: &PublishOptions,
    shell: &Arc<Shell>,
    prompter: &dyn Prompter,
) -> Result<PublishReport> {
    let all = ws.components_with_root()?;
    shell.status(
        Status::Info,
        format!("found {} components in this repository", all.len() - 1),
    );

    let selected = select_components(ws, &all, opts.keep_version, shell, prompter)?;
    let registries = select_registries(ws, shell, prompter)?;

    let mut cleanup = PublishCleanup::new(&all, opts.dry_run);

    let components_json = encode_components(&selected)?;
    let registry_payload: Vec<RegistryPayload> = registries.iter().map(RegistryPayload::from).collect();
    run_hook(
        ws,
        ws.root(),
        HookName::PrePublishGlobal,
        &[
            render_flag(opts.dry_run).to_string(),
            render_flag(opts.no_git).to_string(),
            components_json.clone(),
            encode_registries(&registry_payload)?,
        ],
    )?;

    if opts.dry_run {
        cleanup.backup()?;
    }

    let forced = if opts.keep_version {
        shell.status(Status::Skipped, "version updates");
        Vec::new()
    } else {
        shell.status(Status::Running, "updating component versions");
        update_versions(&all, &selected, ws.indent())?
    };
    confirm_forced_updates(&forced, shell, prompter)?;

    let mut published = Vec::with_capacity(selected.len());
    let mut skipped = Vec::new();
    for item in selected {
        if publish_component(ws, &item, &registries, opts, &mut cleanup, shell)? {
            published.push(item);
        } else {
            skipped.push(item);
        }
    }

    let git_refs = if opts.dry_run || opts.no_git || published.is_empty() {
        shell.status(Status::Skipped, "git commit and tags");
        Vec::new()
    } else {
        commit_and_tag(ws, &all, &published, shell, prompter)?
    };

    run_hook(
        ws,
        ws.root(),
        HookName::PostPublishGlobal,
        &[render_flag(opts.dry_run).to_string(), components_json],
    )?;

    let pushed = if git_refs.is_empty() {
        shell.status(Status::Skipped, "git push");
        false
    } else {
        push_to_origin(ws, &git_refs, shell, prompter)?
    };

    drop(cleanup);

    Ok(PublishReport {
        published,
        skipped,
        forced,
        git_refs,
        pushed,
    })
}

// ============================================================================
// Selection
// ============================================================================

fn select_components(
    ws: &Workspace,
    all: &[Component],
    keep_version: bool,
    shell: &Shell,
    prompter: &dyn Prompter,
) -> Result<Vec<PublishableComponent>> {
    let public: Vec<&Component> = all.iter().filter(|c| !c.private).collect();
    if public.is_empty() {
        bail!("found no public components in this repository");
    }

    let mode = match ws.scope().maintenance().publish_mode {
        Some(mode) => mode,
        None => {
            let items = vec![
                "All public components".to_string(),
                "Select individual components".to_string(),
            ];
            match prompter.select("What should get published?", &items, 0)? {
                0 => PublishMode::All,
                _ => PublishMode::Independent,
            }
        }
    };

    let selected = match mode {
        PublishMode::All if keep_version => public
            .iter()
            .map(|c| PublishableComponent {
                component: (*c).clone(),
                new_version: c.version.clone(),
            })
            .collect(),
        PublishMode::All => {
            let versions: BTreeSet<&str> = public.iter().map(|c| c.version.as_str()).collect();
            if versions.len() > 1 {
                let listing: Vec<String> = public
                    .iter()
                    .map(|c| format!("  * {}, {}", c.name, c.version))
                    .collect();
                bail!(
                    "cannot release all public components since they do not share the same version:\n{}",
                    listing.join("\n")
                );
            }
            let current = public[0].version.as_str();
            let version = ask_version(current, None, shell, prompter)?;
            public
                .iter()
                .map(|c| PublishableComponent {
                    component: (*c).clone(),
                    new_version: version.to_string(),
                })
                .collect::<Vec<_>>()
        }
        PublishMode::Independent => {
            let names: Vec<String> = public.iter().map(|c| c.name.clone()).collect();
            let picked = prompter.multi_select(
                "Select the components to publish",
                &names,
                &vec![true; names.len()],
            )?;
            if picked.is_empty() {
                bail!("at least one component must be selected");
            }

            let mut selected = Vec::with_capacity(picked.len());
            for index in picked {
                let component = public[index];
                let new_version = if keep_version {
                    component.version.clone()
                } else {
                    ask_version(&component.version, Some(&component.name), shell, prompter)?.to_string()
                };
                selected.push(PublishableComponent {
                    component: component.clone(),
                    new_version,
                });
            }
            selected
        }
    };

    shell.note("selected for publishing:");
    for item in &selected {
        shell.print(format!("  * {}, {}", item.component.name, item.new_version));
    }
    Ok(selected)
}

/// The versions offered after `current`: next patch, minor and major.
pub fn next_versions(current: &Version) -> [Version; 3] {
    let release = current.pre.is_empty();
    let patch = if release {
        Version::new(current.major, current.minor, current.patch + 1)
    } else {
        Version::new(current.major, current.minor, current.patch)
    };
    let minor = if release || current.patch != 0 {
        Version::new(current.major, current.minor + 1, 0)
    } else {
        Version::new(current.major, current.minor, 0)
    };
    let major = if release || current.minor != 0 || current.patch != 0 {
        Version::new(current.major + 1, 0, 0)
    } else {
        Version::new(current.major, 0, 0)
    };
    [patch, minor, major]
}

/// Turn operator input into a version; partial versions are padded.
pub fn coerce_version(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    Version::parse(raw.trim_start_matches('v'))
        .ok()
        .or_else(|| extract_version(raw))
}

fn ask_version(current: &str, name: Option<&str>, shell: &Shell, prompter: &dyn Prompter) -> Result<Version> {
    let parsed = Version::parse(current)
        .with_context(|| format!("current version `{}` is not a valid semantic version", current))?;

    let mut prompt = format!("Select a new version (currently {})", current);
    if let Some(name) = name {
        prompt.push_str(&format!(" for {}", name));
    }

    let candidates = next_versions(&parsed);
    let mut items: Vec<String> = candidates.iter().map(Version::to_string).collect();
    items.push("A custom version".to_string());

    let choice = prompter.select(&prompt, &items, 0)?;
    if let Some(version) = candidates.get(choice) {
        return Ok(version.clone());
    }

    let raw = prompter.input("Custom version", None)?;
    let version = coerce_version(&raw).with_context(|| format!("invalid version string `{}`", raw))?;
    if version.to_string() != raw.trim() {
        shell.warn(format!("the custom version `{}` got coerced to `{}`", raw.trim(), version));
        if !prompter.confirm("Proceed?", true)? {
            return Err(HookError::Cancelled.into());
        }
    }
    Ok(version)
}

fn select_registries(ws: &Workspace, shell: &Shell, prompter: &dyn Prompter) -> Result<Vec<RegistryEntry>> {
    let mut selected = Vec::new();
    for registry in ws.config().registries() {
        let prompt = format!("Publish to the {} registry ({})?", registry.name, registry.url);
        if prompter.confirm(&prompt, true)? {
            selected.push(registry);
        }
    }
    if selected.is_empty() {
        bail!("no registry selected");
    }

    for registry in selected.iter().filter(|r| r.login) {
        let user = process::tool(ws.config().tools.npm())?
            .args(["whoami", "--registry", registry.url.as_str()])
            .cwd(ws.root())
            .read_stdout()
            .with_context(|| {
                format!(
                    "you are not logged in to {}, run `npm login --registry {}`",
                    registry.name, registry.url
                )
            })?;
        tracing::debug!("logged in to {} as {}", registry.url, user.trim());
    }

    shell.status(
        Status::Info,
        format!(
            "publishing to {}",
            selected.iter().map(|r| r.name.as_str()).collect::<Vec<_>>().join(", ")
        ),
    );
    Ok(selected)
}

// ============================================================================
// Versions
// ============================================================================

/// Write new versions into every manifest and update internal dependency
/// references to the published components, keeping each range's prefix.
///
/// Returns the references whose old range did not admit the new version.
pub fn update_versions(
    all: &[Component],
    selected: &[PublishableComponent],
    indent: usize,
) -> Result<Vec<ForcedUpdate>> {
    let mut forced = Vec::new();

    for component in all {
        let mut manifest = Manifest::load(&component.manifest_path())?;
        let mut changed = false;

        for item in selected {
            let new_version = Version::parse(&item.new_version)
                .with_context(|| format!("invalid version `{}`", item.new_version))?;

            if item.component.name == component.name {
                manifest.set_version(&new_version);
                changed = true;
            }

            let reference = [DependencyKind::Normal, DependencyKind::Dev]
                .into_iter()
                .find_map(|kind| {
                    manifest
                        .dependency(kind, &item.component.name)
                        .map(|range| (kind, range.to_string()))
                });
            let Some((kind, current)) = reference else {
                continue;
            };

            let updated = format!("{}{}", range_prefix(&current), new_version);
            if !satisfies(&new_version, &current) {
                forced.push(ForcedUpdate {
                    component: component.name.clone(),
                    dependency: item.component.name.clone(),
                    from: current.clone(),
                    to: updated.clone(),
                });
            }
            manifest.set_dependency(kind, &item.component.name, &updated);
            changed = true;
        }

        if changed {
            manifest.save(indent)?;
        }
    }

    Ok(forced)
}

fn confirm_forced_updates(forced: &[ForcedUpdate], shell: &Shell, prompter: &dyn Prompter) -> Result<()> {
    if forced.is_empty() {
        return Ok(());
    }

    shell.warn("internal dependencies were updated regardless of their semantic version ranges:");
    let mut current = None;
    for update in forced {
        if current != Some(&update.component) {
            shell.print(format!("  {}:", update.component));
            current = Some(&update.component);
        }
        shell.print(format!("    * {}: {} -> {}", update.dependency, update.from, update.to));
    }

    if !prompter.confirm("Proceed?", true)? {
        return Err(HookError::Cancelled.into());
    }
    Ok(())
}

// ============================================================================
// Publishing
// ============================================================================

/// Invoke a lifecycle hook through `npm run`.
fn run_hook(ws: &Workspace, dir: &Path, hook: HookName, args: &[String]) -> Result<()> {
    process::tool(ws.config().tools.npm())?
        .args(["run", hook.as_str(), "--"])
        .args(args)
        .cwd(dir)
        .run()
        .with_context(|| format!("`{}` hook failed", hook))
}

/// Run the component hooks and publish to every registry that needs it.
///
/// Returns `false` when `--skip-existing` left no registry to publish to;
/// the component hooks do not run in that case.
fn publish_component(
    ws: &Workspace,
    item: &PublishableComponent,
    registries: &[RegistryEntry],
    opts: &PublishOptions,
    cleanup: &mut PublishCleanup,
    shell: &Shell,
) -> Result<bool> {
    let component = &item.component;

    let mut targets = Vec::with_capacity(registries.len());
    for registry in registries {
        if opts.skip_existing && version_exists(ws, item, registry)? {
            shell.status(
                Status::Skipped,
                format!(
                    "{}@{} already exists in {}",
                    component.name, item.new_version, registry.name
                ),
            );
            continue;
        }
        targets.push(registry);
    }
    if targets.is_empty() {
        return Ok(false);
    }

    shell.status(
        Status::Publishing,
        format!("{}@{}", component.name, item.new_version),
    );

    let dry_run = opts.dry_run;
    let hook_args = [
        render_flag(dry_run).to_string(),
        component.name.clone(),
        item.new_version.clone(),
    ];
    run_hook(ws, &component.location, HookName::PrePublish, &hook_args)?;

    for registry in targets {
        let npmrc = component.location.join(NPMRC);
        if registry.npmrc {
            link_npmrc(ws.root(), &component.location)?;
            cleanup.track_npmrc(npmrc);
        } else {
            fs::remove_file_if_exists(&npmrc)?;
        }

        let mut cmd = process::tool(ws.config().tools.npm())?.arg("publish");
        if dry_run {
            cmd = cmd.arg("--dry-run");
        }
        cmd.args(["--registry", registry.url.as_str()])
            .cwd(&component.location)
            .run()?;
        shell.status(
            Status::Published,
            format!("{}@{} to {}", component.name, item.new_version, registry.name),
        );
    }

    run_hook(ws, &component.location, HookName::PostPublish, &hook_args)?;
    Ok(true)
}

/// Ask a registry whether it already holds the version about to be published.
///
/// `npm view` prints nothing for an unknown version of a known package and
/// fails for an unknown package; both count as missing. It runs from the
/// workspace root so the root `.npmrc` authenticates the query.
fn version_exists(ws: &Workspace, item: &PublishableComponent, registry: &RegistryEntry) -> Result<bool> {
    let spec = format!("{}@{}", item.component.name, item.new_version);
    let output = process::tool(ws.config().tools.npm())?
        .args(["view", spec.as_str(), "version", "--registry", registry.url.as_str()])
        .cwd(ws.root())
        .output()?;
    if !output.status.success() {
        tracing::debug!("`npm view {}` failed, treating it as unpublished", spec);
        return Ok(false);
    }
    Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
}

/// Copy the root `.npmrc` into a component so npm authenticates with it.
fn link_npmrc(root: &Path, component_dir: &Path) -> Result<()> {
    let source = root.join(NPMRC);
    if !source.is_file() {
        bail!("could not link {}: file does not exist", source.display());
    }
    fs::copy_file(&source, &component_dir.join(NPMRC))
}

/// Restores dry-run backups and removes linked `.npmrc` files on every exit
/// path of a publish run.
struct PublishCleanup {
    manifests: Vec<PathBuf>,
    restore: bool,
    backed_up: bool,
    linked: Vec<PathBuf>,
}

impl PublishCleanup {
    fn new(components: &[Component], restore: bool) -> Self {
        PublishCleanup {
            manifests: components.iter().map(Component::manifest_path).collect(),
            restore,
            backed_up: false,
            linked: Vec::new(),
        }
    }

    fn backup(&mut self) -> Result<()> {
        self.backed_up = true;
        for manifest in &self.manifests {
            fs::copy_file(manifest, &backup_path(manifest))?;
        }
        Ok(())
    }

    fn track_npmrc(&mut self, npmrc: PathBuf) {
        if !self.linked.contains(&npmrc) {
            self.linked.push(npmrc);
        }
    }
}

impl Drop for PublishCleanup {
    fn drop(&mut self) {
        if self.backed_up {
            for manifest in &self.manifests {
                let backup = backup_path(manifest);
                if !backup.is_file() {
                    continue;
                }
                if self.restore {
                    if let Err(e) = fs::copy_file(&backup, manifest) {
                        tracing::warn!("failed to restore {}: {:#}", manifest.display(), e);
                        continue;
                    }
                }
                if let Err(e) = fs::remove_file_if_exists(&backup) {
                    tracing::warn!("{:#}", e);
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

fn backup_path(manifest: &Path) -> PathBuf {
    manifest.with_file_name(format!("{}{}", MANIFEST_NAME, BACKUP_SUFFIX))
}

// ============================================================================
// Git
// ============================================================================

/// Commit the bumped manifests and tag the release.
///
/// Returns the references to push: the current branch and the new tags.
fn commit_and_tag(
    ws: &Workspace,
    all: &[Component],
    selected: &[PublishableComponent],
    shell: &Shell,
    prompter: &dyn Prompter,
) -> Result<Vec<String>> {
    let repo = Repository::discover(ws.root())
        .with_context(|| format!("`{}` is not inside a git repository", ws.root().display()))?;
    let workdir = repo
        .workdir()
        .context("cannot commit in a bare repository")?
        .canonicalize()?;

    let mut index = repo.index()?;
    for component in all {
        let manifest = component
            .manifest_path()
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", component.manifest_path().display()))?;
        let rel = manifest
            .strip_prefix(&workdir)
            .with_context(|| format!("{} is outside the repository", manifest.display()))?;
        index.add_path(rel)?;
    }
    index.write()?;

    let tree = repo.find_tree(index.write_tree()?)?;
    let head_ref = repo.head().context("the repository has no commits")?;
    let branch = head_ref
        .name()
        .filter(|_| head_ref.is_branch())
        .context("HEAD is detached, check out a branch before publishing")?
        .to_string();
    let parent = head_ref.peel_to_commit()?;
    let signature = repo
        .signature()
        .context("git user.name and user.email must be configured to commit")?;
    let commit_id = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        PUBLISH_COMMIT_MESSAGE,
        &tree,
        &[&parent],
    )?;
    shell.status(Status::Committed, PUBLISH_COMMIT_MESSAGE);

    let commit = repo.find_object(commit_id, None)?;
    let mut refs = vec![branch];
    for tag in tag_names(ws, selected, prompter)? {
        repo.tag_lightweight(&tag, &commit, false)
            .with_context(|| format!("failed to create tag `{}`", tag))?;
        shell.status(Status::Added, format!("tag {}", tag));
        refs.push(format!("refs/tags/{}", tag));
    }
    Ok(refs)
}

fn tag_names(ws: &Workspace, selected: &[PublishableComponent], prompter: &dyn Prompter) -> Result<Vec<String>> {
    let items = vec![
        "One summary tag for all published components".to_string(),
        "One tag per published component".to_string(),
    ];
    if prompter.select("How many git tags should be created?", &items, 0)? == 1 {
        return Ok(selected
            .iter()
            .map(|item| format!("{}@{}", item.component.name, item.new_version))
            .collect());
    }

    let versions: BTreeSet<&str> = selected.iter().map(|item| item.new_version.as_str()).collect();
    let suggestion = match (ws.scope().maintenance().publish_tag_name, versions.len()) {
        (Some(prefix), 1) => versions.first().map(|version| format!("{}@{}", prefix, version)),
        _ => None,
    };

    if let Some(suggestion) = suggestion {
        let items = vec![format!("Suggested: {}", suggestion), "A custom tag".to_string()];
        if prompter.select("Git tag name", &items, 0)? == 0 {
            return Ok(vec![suggestion]);
        }
    }

    loop {
        let tag = prompter.input("Custom tag (non-empty)", None)?;
        let tag = tag.trim().replace(' ', "_");
        if !tag.is_empty() {
            return Ok(vec![tag]);
        }
    }
}

fn push_to_origin(ws: &Workspace, refs: &[String], shell: &Shell, prompter: &dyn Prompter) -> Result<bool> {
    shell.note("the following git references are ready to be pushed:");
    for r in refs {
        shell.print(format!("  * {}", r));
    }
    if !prompter.confirm("Push to git remote `origin`?", true)? {
        shell.status(Status::Skipped, "push cancelled, no references were pushed");
        return Ok(false);
    }

    process::tool(ws.config().tools.git())?
        .args(["push", "origin"])
        .args(refs)
        .cwd(ws.root())
        .run()?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_next_versions() {
        assert_eq!(next_versions(&v("1.2.3")), [v("1.2.4"), v("1.3.0"), v("2.0.0")]);
        assert_eq!(next_versions(&v("2.0.0-beta.1")), [v("2.0.0"), v("2.0.0"), v("2.0.0")]);
        assert_eq!(next_versions(&v("1.2.0-rc.1")), [v("1.2.0"), v("1.2.0"), v("2.0.0")]);
    }

    #[test]
    fn test_coerce_version() {
        assert_eq!(coerce_version("1.2.3"), Some(v("1.2.3")));
        assert_eq!(coerce_version("v1.2.3-beta.2"), Some(v("1.2.3-beta.2")));
        assert_eq!(coerce_version("1.2"), Some(v("1.2.0")));
        assert_eq!(coerce_version(" 3 "), Some(v("3.0.0")));
        assert_eq!(coerce_version("latest"), None);
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/repo/libs/a/package.json")),
            PathBuf::from("/repo/libs/a/package.json.bak")
        );
    }
}

#[cfg(all(test, unix))]
mod driver_tests {
    use super::*;
    use crate::core::component::Partition;
    use crate::test_support::{quiet_shell, Answer, ScriptedPrompter, WorkspaceFixture};

    const REGISTRY: &str = "[[publish.registries]]\nname = \"local\"\nurl = \"http://localhost:4873/\"\n";

    fn fixture(scope_extra: &str) -> WorkspaceFixture {
        let fixture = WorkspaceFixture::new("test");
        if !scope_extra.is_empty() {
            fixture.write(
                "scope.json",
                &format!("{{\"scope\": \"test\", \"initialized\": true, {}}}\n", scope_extra),
            );
        }
        fixture.use_fake_tools(&[("npm", 0), ("git", 0)], REGISTRY);
        fixture.add_component(
            Partition::Libs,
            "core",
            r#"{"name": "@monorepo/test.core", "version": "1.0.0"}"#,
        );
        fixture.add_component(
            Partition::Libs,
            "ui",
            r#"{"name": "@monorepo/test.ui", "version": "1.0.0", "dependencies": {"@monorepo/test.core": "~1.0.0"}}"#,
        );
        fixture.add_component(
            Partition::Packages,
            "app",
            r#"{"name": "@monorepo/test.app", "version": "0.3.0", "private": true}"#,
        );
        fixture
    }

    fn hook_calls(fixture: &WorkspaceFixture) -> Vec<String> {
        fixture
            .calls()
            .into_iter()
            .map(|call| call.split(" -- ").next().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_dry_run_restores_manifests() {
        let fixture = fixture("");
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),    // all public components
            Answer::Select(0),    // next patch
            Answer::Confirm(true), // local registry
        ]);
        let opts = PublishOptions {
            dry_run: true,
            no_git: false,
            ..PublishOptions::default()
        };

        let report = publish(&fixture.workspace(), &opts, &quiet_shell(), &prompter).unwrap();
        prompter.assert_exhausted();

        assert_eq!(report.published.len(), 2);
        assert!(report.forced.is_empty());
        assert!(report.git_refs.is_empty());
        assert_eq!(
            hook_calls(&fixture),
            vec![
                "npm run pre-publish-global",
                "npm run pre-publish",
                "npm publish --dry-run --registry http://localhost:4873/",
                "npm run post-publish",
                "npm run pre-publish",
                "npm publish --dry-run --registry http://localhost:4873/",
                "npm run post-publish",
                "npm run post-publish-global",
            ]
        );

        assert_eq!(fixture.read_json("libs/test.core/package.json")["version"], "1.0.0");
        assert_eq!(
            fixture.read_json("libs/test.ui/package.json")["dependencies"]["@monorepo/test.core"],
            "~1.0.0"
        );
        assert!(!fixture.root().join("libs/test.core/package.json.bak").exists());
        assert!(!fixture.root().join("package.json.bak").exists());
    }

    #[test]
    fn test_major_bump_forces_dependency_update() {
        let fixture = fixture("");
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Select(2),     // next major
            Answer::Confirm(true), // registry
            Answer::Confirm(true), // accept forced update
        ]);
        let opts = PublishOptions {
            dry_run: false,
            no_git: true,
            ..PublishOptions::default()
        };

        let report = publish(&fixture.workspace(), &opts, &quiet_shell(), &prompter).unwrap();
        assert_eq!(
            report.forced,
            vec![ForcedUpdate {
                component: "@monorepo/test.ui".to_string(),
                dependency: "@monorepo/test.core".to_string(),
                from: "~1.0.0".to_string(),
                to: "~2.0.0".to_string(),
            }]
        );

        assert_eq!(fixture.read_json("libs/test.core/package.json")["version"], "2.0.0");
        let ui = fixture.read_json("libs/test.ui/package.json");
        assert_eq!(ui["version"], "2.0.0");
        assert_eq!(ui["dependencies"]["@monorepo/test.core"], "~2.0.0");
        assert_eq!(fixture.read_json("libs/test.ui/package.json")["name"], "@monorepo/test.ui");
        assert!(fixture.calls().iter().all(|call| !call.starts_with("git ")));
    }

    #[test]
    fn test_zero_major_minor_bump_is_forced() {
        let fixture = WorkspaceFixture::new("test");
        fixture.add_component(
            Partition::Libs,
            "geo",
            r#"{"name": "@monorepo/test.geo", "version": "0.2.0"}"#,
        );
        fixture.add_component(
            Partition::Libs,
            "map",
            r#"{"name": "@monorepo/test.map", "version": "0.2.0", "dependencies": {"@monorepo/test.geo": "^0.2.0"}}"#,
        );
        let all = fixture.workspace().components_with_root().unwrap();
        let geo = all.iter().find(|c| c.name == "@monorepo/test.geo").unwrap();
        let bump = |version: &str| {
            [PublishableComponent {
                component: geo.clone(),
                new_version: version.to_string(),
            }]
        };

        // ^0.2.0 stops below 0.3.0
        let forced = update_versions(&all, &bump("0.3.0"), 2).unwrap();
        assert_eq!(
            forced,
            vec![ForcedUpdate {
                component: "@monorepo/test.map".to_string(),
                dependency: "@monorepo/test.geo".to_string(),
                from: "^0.2.0".to_string(),
                to: "^0.3.0".to_string(),
            }]
        );

        let forced = update_versions(&all, &bump("0.3.1"), 2).unwrap();
        assert!(forced.is_empty());
        assert_eq!(
            fixture.read_json("libs/test.map/package.json")["dependencies"]["@monorepo/test.geo"],
            "^0.3.1"
        );
    }

    #[test]
    fn test_skip_existing_leaves_out_published_versions() {
        use std::os::unix::fs::PermissionsExt;

        let fixture = fixture("");
        let npm = fixture.write(
            ".bin/npm",
            &format!(
                "#!/bin/sh\necho \"npm $*\" >> \"{}\"\nif [ \"$1\" = view ]; then\n  case \"$2\" in\n    @monorepo/test.core@*) echo 1.0.1 ;;\n  esac\nfi\nexit 0\n",
                fixture.root().join(".bin/calls.log").display()
            ),
        );
        std::fs::set_permissions(&npm, std::fs::Permissions::from_mode(0o755)).unwrap();
        let prompter = ScriptedPrompter::new([Answer::Select(0), Answer::Select(0), Answer::Confirm(true)]);
        let opts = PublishOptions {
            dry_run: true,
            no_git: true,
            skip_existing: true,
            ..PublishOptions::default()
        };

        let report = publish(&fixture.workspace(), &opts, &quiet_shell(), &prompter).unwrap();
        let names = |items: &[PublishableComponent]| {
            items.iter().map(|i| i.component.name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(names(&report.published), vec!["@monorepo/test.ui"]);
        assert_eq!(names(&report.skipped), vec!["@monorepo/test.core"]);

        let calls = hook_calls(&fixture);
        assert!(calls.contains(&"npm view @monorepo/test.core@1.0.1 version --registry http://localhost:4873/".to_string()));
        assert_eq!(calls.iter().filter(|c| c.starts_with("npm publish")).count(), 1);
        assert_eq!(calls.iter().filter(|c| *c == "npm run pre-publish").count(), 1);
    }

    #[test]
    fn test_keep_version_publishes_current_versions() {
        let fixture = fixture("");
        fixture.add_component(
            Partition::Libs,
            "extra",
            r#"{"name": "@monorepo/test.extra", "version": "0.9.0"}"#,
        );
        // no version question, and mixed versions are fine
        let prompter = ScriptedPrompter::new([Answer::Select(0), Answer::Confirm(true)]);
        let opts = PublishOptions {
            no_git: true,
            keep_version: true,
            ..PublishOptions::default()
        };

        let report = publish(&fixture.workspace(), &opts, &quiet_shell(), &prompter).unwrap();
        prompter.assert_exhausted();
        assert_eq!(report.published.len(), 3);
        let extra = report
            .published
            .iter()
            .find(|i| i.component.name == "@monorepo/test.extra")
            .unwrap();
        assert_eq!(extra.new_version, "0.9.0");
        assert!(report.forced.is_empty());
        assert_eq!(fixture.read_json("libs/test.core/package.json")["version"], "1.0.0");
        assert_eq!(
            fixture.read_json("libs/test.ui/package.json")["dependencies"]["@monorepo/test.core"],
            "~1.0.0"
        );
    }

    #[test]
    fn test_declined_forced_update_stops_before_publishing() {
        let fixture = fixture("");
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Select(2),
            Answer::Confirm(true),
            Answer::Confirm(false),
        ]);
        let opts = PublishOptions {
            dry_run: true,
            no_git: false,
            ..PublishOptions::default()
        };

        let err = publish(&fixture.workspace(), &opts, &quiet_shell(), &prompter).unwrap_err();
        assert!(matches!(err.downcast_ref::<HookError>(), Some(HookError::Cancelled)));
        assert_eq!(hook_calls(&fixture), vec!["npm run pre-publish-global"]);
        // dry-run backups are restored on the error path too
        assert_eq!(fixture.read_json("libs/test.core/package.json")["version"], "1.0.0");
        assert!(!fixture.root().join("libs/test.ui/package.json.bak").exists());
    }

    #[test]
    fn test_all_mode_requires_shared_version() {
        let fixture = fixture("");
        fixture.add_component(
            Partition::Libs,
            "extra",
            r#"{"name": "@monorepo/test.extra", "version": "0.9.0"}"#,
        );
        let prompter = ScriptedPrompter::new([Answer::Select(0)]);

        let err = publish(&fixture.workspace(), &PublishOptions::default(), &quiet_shell(), &prompter)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("@monorepo/test.extra, 0.9.0"));
        assert!(fixture.calls().is_empty());
    }

    #[test]
    fn test_independent_mode_from_scope_record() {
        let fixture = fixture(r#""repomaintain": {"publish_mode": "independent"}"#);
        let prompter = ScriptedPrompter::new([
            Answer::MultiSelect(vec![1]), // only test.ui
            Answer::Select(3),            // custom version
            Answer::Input("1.4".to_string()),
            Answer::Confirm(true), // coerced to 1.4.0
            Answer::Confirm(true), // registry
        ]);
        let opts = PublishOptions {
            dry_run: false,
            no_git: true,
            ..PublishOptions::default()
        };

        let report = publish(&fixture.workspace(), &opts, &quiet_shell(), &prompter).unwrap();
        prompter.assert_exhausted();
        assert_eq!(report.published.len(), 1);
        assert_eq!(report.published[0].new_version, "1.4.0");
        assert_eq!(fixture.read_json("libs/test.ui/package.json")["version"], "1.4.0");
        assert_eq!(fixture.read_json("libs/test.core/package.json")["version"], "1.0.0");
    }

    #[test]
    fn test_npmrc_registry_links_root_file() {
        let fixture = fixture("");
        fixture.write_config(&format!(
            "{}{}",
            std::fs::read_to_string(fixture.root().join(".monohook/config.toml")).unwrap(),
            "npmrc = true\n"
        ));
        let prompter = ScriptedPrompter::new([Answer::Select(0), Answer::Select(0), Answer::Confirm(true)]);
        let opts = PublishOptions {
            dry_run: true,
            no_git: true,
            ..PublishOptions::default()
        };

        // No root .npmrc: linking fails and nothing is published
        let err = publish(&fixture.workspace(), &opts, &quiet_shell(), &prompter).unwrap_err();
        assert!(format!("{:#}", err).contains(".npmrc"));
        assert!(!hook_calls(&fixture).iter().any(|c| c.starts_with("npm publish")));

        fixture.write(".npmrc", "//localhost:4873/:_authToken=secret\n");
        let prompter = ScriptedPrompter::new([Answer::Select(0), Answer::Select(0), Answer::Confirm(true)]);
        publish(&fixture.workspace(), &opts, &quiet_shell(), &prompter).unwrap();
        assert!(!fixture.root().join("libs/test.core/.npmrc").exists());
        assert!(!fixture.root().join("libs/test.ui/.npmrc").exists());
    }

    #[test]
    fn test_commit_and_summary_tag() {
        let fixture = fixture(r#""maintenance": {"publish_tag_name": "release"}"#);
        let repo = fixture.git_init();
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Select(1), // next minor
            Answer::Confirm(true),
            Answer::Select(0),      // summary tag
            Answer::Select(0),      // suggested name
            Answer::Confirm(false), // do not push
        ]);
        let opts = PublishOptions {
            dry_run: false,
            no_git: false,
            ..PublishOptions::default()
        };

        let report = publish(&fixture.workspace(), &opts, &quiet_shell(), &prompter).unwrap();
        prompter.assert_exhausted();
        assert!(!report.pushed);
        assert_eq!(report.git_refs.len(), 2);
        assert_eq!(report.git_refs[1], "refs/tags/release@1.1.0");

        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.message(), Some(PUBLISH_COMMIT_MESSAGE));
        assert!(repo.find_reference("refs/tags/release@1.1.0").is_ok());
        assert!(fixture.calls().iter().all(|call| !call.starts_with("git push")));
    }

    #[test]
    fn test_tag_per_component_and_push() {
        let fixture = fixture("");
        fixture.git_init();
        let prompter = ScriptedPrompter::new([
            Answer::Select(0),
            Answer::Select(0),
            Answer::Confirm(true),
            Answer::Select(1), // one tag per component
            Answer::Confirm(true),
        ]);
        let opts = PublishOptions {
            dry_run: false,
            no_git: false,
            ..PublishOptions::default()
        };

        let report = publish(&fixture.workspace(), &opts, &quiet_shell(), &prompter).unwrap();
        assert!(report.pushed);
        assert!(report.git_refs.contains(&"refs/tags/@monorepo/test.core@1.0.1".to_string()));
        assert!(report.git_refs.contains(&"refs/tags/@monorepo/test.ui@1.0.1".to_string()));

        let push = fixture
            .calls()
            .into_iter()
            .find(|call| call.starts_with("git push"))
            .unwrap();
        assert!(push.starts_with("git push origin refs/heads/"));
        assert!(push.ends_with("refs/tags/@monorepo/test.ui@1.0.1"));
    }
}
