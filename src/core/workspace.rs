//! Workspace - the monorepo root and everything loaded from it.
//!
//! A Workspace bundles the root directory, the merged configuration and the
//! scope record. It is loaded once per invocation; hooks read from it and
//! persist changes to the scope record explicitly.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::core::component::{
    component_dir_name, package_name, strip_scope_prefix, Component, Partition,
};
use crate::core::errors::HookError;
use crate::core::manifest::{DependencyKind, Manifest, MANIFEST_NAME};
use crate::core::scope::ScopeRecord;
use crate::util::config::Config;
use crate::util::fs;
use crate::util::GlobalContext;

/// A loaded workspace.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
    scope: ScopeRecord,
}

impl Workspace {
    /// Locate and load the workspace containing the context's working directory.
    pub fn load(ctx: &GlobalContext) -> Result<Self> {
        let root = ctx.find_workspace_root()?;
        let config = ctx.load_config(&root);
        config.validate()?;
        let scope = ScopeRecord::load(&root)?;
        tracing::debug!("workspace root: {}", root.display());
        Ok(Workspace::new(root, config, scope))
    }

    pub fn new(root: PathBuf, config: Config, scope: ScopeRecord) -> Self {
        Workspace {
            root,
            config,
            scope,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scope(&self) -> &ScopeRecord {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut ScopeRecord {
        &mut self.scope
    }

    /// JSON indentation for rewritten files.
    pub fn indent(&self) -> usize {
        self.scope.indent()
    }

    pub fn partition_dir(&self, partition: Partition) -> PathBuf {
        self.root.join(partition.dir_name())
    }

    /// Directory a component named `name` has (or would have) in a partition.
    pub fn component_dir(&self, partition: Partition, name: &str) -> PathBuf {
        self.partition_dir(partition)
            .join(component_dir_name(&self.scope.scope, name))
    }

    /// Scoped npm package name for a base name.
    pub fn package_name(&self, name: &str) -> String {
        package_name(self.config.organization(), &self.scope.scope, name)
    }

    pub fn root_manifest(&self) -> Result<Manifest> {
        Manifest::load(&self.root.join(MANIFEST_NAME))
    }

    /// Directories of every component, packages first, each partition sorted.
    ///
    /// Only directories holding a manifest count; npm rejects anything else
    /// as a workspace.
    pub fn component_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for partition in Partition::ALL {
            for dir in fs::glob_dirs(&self.partition_dir(partition), "*")? {
                if dir.join(MANIFEST_NAME).is_file() {
                    dirs.push(dir);
                } else {
                    tracing::debug!("skipping {}: no {}", dir.display(), MANIFEST_NAME);
                }
            }
        }
        Ok(dirs)
    }

    /// Every component, ordered so that internal dependencies come before
    /// their dependents.
    pub fn components(&self) -> Result<Vec<Component>> {
        let manifests = self
            .component_dirs()?
            .iter()
            .map(|dir| Manifest::load(&dir.join(MANIFEST_NAME)))
            .collect::<Result<Vec<_>>>()?;
        topological_order(manifests)
    }

    /// Every component plus the root pseudo-component, which comes last.
    pub fn components_with_root(&self) -> Result<Vec<Component>> {
        let mut components = self.components()?;
        components.push(Component::root(&self.root));
        Ok(components)
    }

    /// The component containing `dir`.
    ///
    /// Walks up from `dir` to the nearest directory that sits directly in a
    /// partition and holds a manifest, so hooks also work from `src/`.
    pub fn component_at(&self, dir: &Path) -> Result<Component, HookError> {
        let not_a_component = || HookError::NotAComponent {
            dir: dir.to_path_buf(),
        };
        let partitions: Vec<PathBuf> = Partition::ALL
            .iter()
            .map(|p| self.partition_dir(*p))
            .collect();

        let found = dir
            .ancestors()
            .take_while(|d| *d != self.root)
            .find(|d| {
                d.parent().is_some_and(|parent| partitions.iter().any(|p| p == parent))
                    && d.join(MANIFEST_NAME).is_file()
            })
            .ok_or_else(not_a_component)?;

        Manifest::load(&found.join(MANIFEST_NAME))
            .and_then(|m| Component::from_manifest(&m))
            .map_err(|_| not_a_component())
    }

    /// Directories `add-dependency` installs into.
    ///
    /// With a component name (optionally `@org/`-prefixed), that is the
    /// matching directory in `packages/` and in `libs/`, whichever exist.
    /// Without one, every component directory.
    pub fn dependency_targets(&self, component: Option<&str>) -> Result<Vec<PathBuf>> {
        match component {
            Some(name) => {
                let dir_name = strip_scope_prefix(name);
                let targets: Vec<PathBuf> = Partition::ALL
                    .iter()
                    .map(|p| self.partition_dir(*p).join(dir_name))
                    .filter(|dir| dir.is_dir())
                    .collect();
                if targets.is_empty() {
                    return Err(HookError::ComponentNotFound {
                        name: dir_name.to_string(),
                    }
                    .into());
                }
                Ok(targets)
            }
            None => self.component_dirs(),
        }
    }
}

/// Order manifests by internal dependencies, dependencies first.
///
/// Among components whose dependencies are all placed, the one with the
/// smallest name goes next.
fn topological_order(manifests: Vec<Manifest>) -> Result<Vec<Component>> {
    let mut entries = manifests
        .into_iter()
        .map(|m| Component::from_manifest(&m).map(|c| (c, m)))
        .collect::<Result<Vec<_>>>()?;
    entries.sort_by(|a, b| a.0.name.cmp(&b.0.name));
    let (components, manifests): (Vec<Component>, Vec<Manifest>) = entries.into_iter().unzip();

    // Edge a -> b means "b depends on a"
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..components.len()).map(|i| graph.add_node(i)).collect();
    let by_name: HashMap<&str, usize> = components
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect();

    for (dependent, manifest) in manifests.iter().enumerate() {
        for kind in [DependencyKind::Normal, DependencyKind::Dev] {
            for (dep_name, _) in manifest.dependencies(kind) {
                if let Some(&dependency) = by_name.get(dep_name.as_str()) {
                    if dependency != dependent
                        && !graph.contains_edge(nodes[dependency], nodes[dependent])
                    {
                        graph.add_edge(nodes[dependency], nodes[dependent], ());
                    }
                }
            }
        }
    }

    let mut in_degree: Vec<usize> = nodes
        .iter()
        .map(|n| graph.neighbors_directed(*n, Direction::Incoming).count())
        .collect();
    let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|i| in_degree[*i] == 0).collect();
    let mut sorted = Vec::with_capacity(nodes.len());

    while let Some(next) = ready.pop_first() {
        sorted.push(next);
        for dependent in graph.neighbors_directed(nodes[next], Direction::Outgoing) {
            let idx = graph[dependent];
            in_degree[idx] -= 1;
            if in_degree[idx] == 0 {
                ready.insert(idx);
            }
        }
    }

    if sorted.len() != components.len() {
        let cyclic: Vec<&str> = (0..components.len())
            .filter(|i| in_degree[*i] > 0)
            .map(|i| components[i].name.as_str())
            .collect();
        bail!(
            "circular dependency between components: {}",
            cyclic.join(", ")
        );
    }

    Ok(sorted.into_iter().map(|i| components[i].clone()).collect())
}
