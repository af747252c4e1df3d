//! Test fixtures for common test scenarios.
//!
//! [`WorkspaceFixture`] lays out a throwaway monorepo on disk: the scope
//! record, a root manifest with the shared devDependencies, `lerna.json`,
//! and any components a test adds. Fake tools record their invocations so
//! tests can assert on the commands a hook ran without npm being installed.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use crate::core::component::{component_dir_name, Partition};
use crate::core::scope::{ScopeRecord, PLACEHOLDER_SCOPE, SCOPE_FILE};
use crate::core::workspace::Workspace;
use crate::util::config::{load_config, project_config_path};

/// Root manifest shared by every fixture.
pub const ROOT_MANIFEST: &str = r#"{
  "name": "monorepo",
  "private": true,
  "workspaces": ["packages/*", "libs/*"],
  "devDependencies": {
    "@types/jest": "^29.5.0",
    "jest": "^29.5.0",
    "lerna": "^7.1.0",
    "ts-jest": "^29.1.0",
    "ts-loader": "^9.4.0",
    "typescript": "^5.1.0",
    "webpack": "^5.88.0",
    "webpack-cli": "^5.1.0",
    "webpack-dev-server": "^4.15.0"
  }
}
"#;

/// A temporary monorepo.
pub struct WorkspaceFixture {
    tmp: TempDir,
    scope: String,
}

impl WorkspaceFixture {
    /// Create an initialized workspace with the given scope.
    pub fn new(scope: &str) -> Self {
        let fixture = Self::empty(scope);
        fixture.write(
            SCOPE_FILE,
            &format!("{{\n  \"scope\": \"{}\",\n  \"initialized\": true\n}}\n", scope),
        );
        fixture
    }

    /// Create a workspace still carrying the template placeholder scope.
    pub fn placeholder() -> Self {
        let fixture = Self::empty(PLACEHOLDER_SCOPE);
        fixture.write(
            SCOPE_FILE,
            &format!(
                "{{\n  \"scope\": \"{}\",\n  \"initialized\": false\n}}\n",
                PLACEHOLDER_SCOPE
            ),
        );
        fixture
    }

    fn empty(scope: &str) -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let fixture = WorkspaceFixture {
            tmp,
            scope: scope.to_string(),
        };
        fixture.write("package.json", ROOT_MANIFEST);
        fixture.write(
            "lerna.json",
            "{\n  \"packages\": [\"packages/*\", \"libs/*\"],\n  \"version\": \"0.0.0\"\n}\n",
        );
        std::fs::create_dir_all(fixture.root().join("packages")).expect("failed to create packages");
        std::fs::create_dir_all(fixture.root().join("libs")).expect("failed to create libs");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// Load the workspace the way hooks do, ignoring any user-wide config.
    pub fn workspace(&self) -> Workspace {
        let config = load_config(
            &self.root().join(".no-global-config.toml"),
            &project_config_path(self.root()),
        );
        let scope = ScopeRecord::load(self.root()).expect("failed to load scope record");
        Workspace::new(self.root().to_path_buf(), config, scope)
    }

    /// Write the project configuration file.
    pub fn with_config(self, toml: &str) -> Self {
        self.write_config(toml);
        self
    }

    pub fn write_config(&self, toml: &str) {
        self.write(".monohook/config.toml", toml);
    }

    /// Install fake tools and point the `[tools]` configuration at them.
    ///
    /// Each entry is a `[tools]` key and the exit code of its fake; `extra`
    /// is appended to the configuration verbatim.
    #[cfg(unix)]
    pub fn use_fake_tools(&self, tools: &[(&str, i32)], extra: &str) {
        let mut toml = String::from("[tools]\n");
        for (key, code) in tools {
            let path = self.fake_tool(key, *code);
            toml.push_str(&format!("{} = \"{}\"\n", key, path.display()));
        }
        toml.push_str(extra);
        self.write_config(&toml);
    }

    /// Add a component directory with the given manifest.
    pub fn add_component(&self, partition: Partition, name: &str, manifest: &str) -> PathBuf {
        let rel = Path::new(partition.dir_name()).join(component_dir_name(&self.scope, name));
        let dir = self.root().join(&rel);
        std::fs::create_dir_all(&dir).expect("failed to create component dir");
        std::fs::write(dir.join("package.json"), manifest).expect("failed to write manifest");
        dir
    }

    /// Write a file relative to the root, creating parent directories.
    pub fn write(&self, rel: impl AsRef<Path>, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(&path, content).expect("failed to write file");
        path
    }

    /// Read a file relative to the root.
    pub fn read(&self, rel: impl AsRef<Path>) -> String {
        std::fs::read_to_string(self.root().join(rel)).expect("failed to read file")
    }

    /// Read and parse a JSON file relative to the root.
    pub fn read_json(&self, rel: impl AsRef<Path>) -> Value {
        serde_json::from_str(&self.read(rel)).expect("invalid JSON")
    }

    /// Install a fake tool that records its arguments and exits with `code`.
    ///
    /// Each invocation appends `<name> <args>` to the shared call log.
    #[cfg(unix)]
    pub fn fake_tool(&self, name: &str, code: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let bin = self.root().join(".bin");
        std::fs::create_dir_all(&bin).expect("failed to create bin dir");
        let path = bin.join(name);
        let script = format!(
            "#!/bin/sh\necho \"{} $*\" >> \"{}\"\nexit {}\n",
            name,
            self.call_log().display(),
            code
        );
        std::fs::write(&path, script).expect("failed to write fake tool");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to make fake tool executable");
        path
    }

    /// Lines recorded by fake tools, in call order.
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.call_log())
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn call_log(&self) -> PathBuf {
        self.root().join(".bin").join("calls.log")
    }

    /// Turn the workspace into a git repository with one commit holding
    /// every file currently present.
    pub fn git_init(&self) -> git2::Repository {
        let repo = git2::Repository::init(self.root()).expect("failed to init repo");
        {
            let mut config = repo.config().expect("failed to open git config");
            config.set_str("user.name", "Test").expect("failed to set user.name");
            config
                .set_str("user.email", "test@example.com")
                .expect("failed to set user.email");
        }
        self.write(".gitignore", ".bin/\n");
        commit_all(&repo, "Initial commit");
        repo
    }
}

/// Stage every file in the work tree and commit it on HEAD.
pub fn commit_all(repo: &git2::Repository, message: &str) -> git2::Oid {
    let mut index = repo.index().expect("failed to open index");
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .expect("failed to stage files");
    index.write().expect("failed to write index");
    let tree_id = index.write_tree().expect("failed to write tree");
    let tree = repo.find_tree(tree_id).expect("failed to find tree");
    let sig = repo.signature().expect("failed to build signature");
    let parent = repo
        .head()
        .ok()
        .and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .expect("failed to commit")
}
