//! Peer dependency check (`monohook check-peers`).
//!
//! Every dependency declared anywhere in the workspace is resolved to a
//! concrete version, its published peer dependencies are looked up with
//! `npm view`, and each peer is compared against the versions of that peer
//! the workspace itself declares.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use regex::Regex;
use semver::Version;
use serde_json::{Map, Value};

use crate::core::manifest::{DependencyKind, Manifest};
use crate::core::npm_range::{extract_version, satisfies};
use crate::core::workspace::Workspace;
use crate::util::process;
use crate::util::{Shell, Status};

/// A dependency at one concrete version and the components declaring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedDependency {
    pub name: String,
    pub version: Version,
    pub components: Vec<String>,
}

/// A peer requirement not met by a version the workspace uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMismatch {
    pub dependency: String,
    pub dependency_version: Version,
    pub peer: String,
    pub required: String,
    pub found: Version,
    pub components: Vec<String>,
}

impl fmt::Display for PeerMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} requires peer {}@{}, but found {}@{} in components: {}",
            self.dependency,
            self.dependency_version,
            self.peer,
            self.required,
            self.peer,
            self.found,
            self.components.join(", ")
        )
    }
}

/// Where peer dependency declarations come from.
pub trait PeerSource {
    /// Peer dependencies of `name@version`, name to required range.
    fn peer_dependencies(&self, name: &str, version: &Version) -> Result<BTreeMap<String, String>>;
}

/// Looks peers up in the registry with `npm view`.
pub struct NpmView<'a> {
    ws: &'a Workspace,
}

impl<'a> NpmView<'a> {
    pub fn new(ws: &'a Workspace) -> Self {
        NpmView { ws }
    }
}

impl PeerSource for NpmView<'_> {
    fn peer_dependencies(&self, name: &str, version: &Version) -> Result<BTreeMap<String, String>> {
        let output = process::tool(self.ws.config().tools.npm())?
            .arg("view")
            .arg(format!("{}@{}", name, version))
            .args(["peerDependencies", "--json"])
            .cwd(self.ws.root())
            .read_stdout()?;
        Ok(parse_npm_object(&output))
    }
}

/// Check every workspace dependency's peers against the workspace.
///
/// Lookup failures are reported and treated as "no peers"; the check itself
/// never fails because of them.
pub fn check_peers(ws: &Workspace, source: &dyn PeerSource, shell: &Arc<Shell>) -> Result<Vec<PeerMismatch>> {
    let manifests = ws
        .components_with_root()?
        .into_iter()
        .map(|component| Manifest::load(&component.manifest_path()))
        .collect::<Result<Vec<_>>>()?;

    let dependencies = collect_dependencies(&manifests, shell);
    shell.status(
        Status::Info,
        format!("checking peer dependencies of {} dependencies", dependencies.len()),
    );

    let mut progress = shell.progress(dependencies.len() as u64, "npm view");
    let mut mismatches = Vec::new();
    for dependency in &dependencies {
        let peers = match source.peer_dependencies(&dependency.name, &dependency.version) {
            Ok(peers) => peers,
            Err(e) => {
                progress.println(format!(
                    "warning: failed to fetch peer dependencies of {}@{}: {:#}",
                    dependency.name, dependency.version, e
                ));
                BTreeMap::new()
            }
        };
        mismatches.extend(find_mismatches(dependency, &peers, &dependencies));
        progress.inc(1);
    }
    progress.finish();

    if mismatches.is_empty() {
        shell.status(Status::Finished, "no peer dependency mismatches");
    } else {
        for mismatch in &mismatches {
            shell.warn(mismatch);
        }
        shell.status(
            Status::Finished,
            format!("{} peer dependency mismatch(es)", mismatches.len()),
        );
    }
    Ok(mismatches)
}

/// Group every declared dependency by name and concrete version.
///
/// Ranges without a recognizable version (`latest`, git URLs) are skipped
/// with a warning.
pub fn collect_dependencies(manifests: &[Manifest], shell: &Shell) -> Vec<CollectedDependency> {
    let mut grouped: BTreeMap<(String, Version), Vec<String>> = BTreeMap::new();

    for manifest in manifests {
        let component = manifest.name().unwrap_or("root").to_string();
        for kind in DependencyKind::ALL {
            for (name, range) in manifest.dependencies(kind) {
                let Some(version) = extract_version(&range) else {
                    shell.warn(format!(
                        "invalid version `{}` for {} in {}",
                        range, name, component
                    ));
                    continue;
                };
                let components = grouped.entry((name, version)).or_default();
                if !components.contains(&component) {
                    components.push(component.clone());
                }
            }
        }
    }

    grouped
        .into_iter()
        .map(|((name, version), components)| CollectedDependency {
            name,
            version,
            components,
        })
        .collect()
}

fn find_mismatches(
    dependency: &CollectedDependency,
    peers: &BTreeMap<String, String>,
    all: &[CollectedDependency],
) -> Vec<PeerMismatch> {
    let mut mismatches = Vec::new();
    for (peer, required) in peers {
        for candidate in all.iter().filter(|d| &d.name == peer) {
            if !satisfies(&candidate.version, required) {
                mismatches.push(PeerMismatch {
                    dependency: dependency.name.clone(),
                    dependency_version: dependency.version.clone(),
                    peer: peer.clone(),
                    required: required.clone(),
                    found: candidate.version.clone(),
                    components: candidate.components.clone(),
                });
            }
        }
    }
    mismatches
}

/// Parse `npm view` output into a name to range map.
///
/// Accepts JSON, JavaScript object notation and `key: value` lines. Empty
/// output means no peers.
pub fn parse_npm_object(output: &str) -> BTreeMap<String, String> {
    let output = output.trim();
    if output.is_empty() {
        return BTreeMap::new();
    }

    if let Ok(value) = serde_json::from_str::<Value>(output) {
        return string_entries(value);
    }

    static UNQUOTED_KEY: OnceLock<Option<Regex>> = OnceLock::new();
    let unquoted = UNQUOTED_KEY.get_or_init(|| Regex::new(r"([\w@/.-]+)\s*:").ok());
    if let Some(re) = unquoted {
        let fixed = re.replace_all(&output.replace('\'', "\""), "\"$1\":").into_owned();
        if let Ok(value) = serde_json::from_str::<Value>(&fixed) {
            return string_entries(value);
        }
    }

    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| {
            let trim = |s: &str| s.trim().trim_matches(|c| c == '\'' || c == '"' || c == ',').to_string();
            (trim(key), trim(value))
        })
        .filter(|(key, _)| !key.is_empty() && key != "{" && key != "}")
        .collect()
}

fn string_entries(value: Value) -> BTreeMap<String, String> {
    match value {
        Value::Object(map) => object_entries(map),
        _ => BTreeMap::new(),
    }
}

fn object_entries(map: Map<String, Value>) -> BTreeMap<String, String> {
    map.into_iter()
        .filter_map(|(key, value)| value.as_str().map(|range| (key, range.to_string())))
        .collect()
}
