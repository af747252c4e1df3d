//! Implementation of the `create-package` and `create-lib` hooks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use crate::core::component::Partition;
use crate::core::errors::HookError;
use crate::core::manifest::{DependencyKind, Manifest};
use crate::core::workspace::Workspace;
use crate::util::fs;
use crate::util::process;
use crate::util::{Shell, Status};

/// devDependencies every component gets, pinned to the root's versions.
const SHARED_DEV_DEPENDENCIES: &[&str] = &["typescript", "jest", "ts-jest", "@types/jest"];

/// Additional devDependencies for bundled packages.
const BUNDLER_DEV_DEPENDENCIES: &[&str] = &[
    "webpack",
    "webpack-cli",
    "webpack-dev-server",
    "ts-loader",
    "html-webpack-plugin",
];

/// Directories `lerna create` generates that components do not use.
const LERNA_LEFTOVERS: &[&str] = &["lib", "__tests__"];

/// Options for scaffolding a component.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Where the component goes
    pub partition: Partition,

    /// Base name, without scope
    pub name: String,
}

/// Scaffold a new component and return its directory.
pub fn create_component(ws: &Workspace, opts: &CreateOptions, shell: &Arc<Shell>) -> Result<PathBuf> {
    ws.scope().ensure_configured()?;

    let dir = ws.component_dir(opts.partition, &opts.name);
    if dir.exists() {
        return Err(HookError::PathExists { path: dir }.into());
    }

    let package_name = ws.package_name(&opts.name);
    tracing::debug!("creating {} {} at {}", opts.partition.noun(), package_name, dir.display());

    {
        let _span = shell.span(Status::Running, format!("lerna create {}", package_name));
        process::tool(ws.config().tools.npx())?
            .args(["lerna", "create"])
            .arg(&package_name)
            .arg(opts.partition.dir_name())
            .arg("--yes")
            .cwd(ws.root())
            .run()?;
    }

    fs::ensure_dir(&dir)?;
    for leftover in LERNA_LEFTOVERS {
        fs::remove_dir_all_if_exists(&dir.join(leftover))?;
    }

    scaffold_files(ws, &dir, opts)?;
    patch_manifest(ws, &dir, &package_name, opts.partition, shell)?;

    {
        let _span = shell.span(Status::Installing, "workspace dependencies");
        process::tool(ws.config().tools.npm())?
            .arg("install")
            .cwd(ws.root())
            .run()?;
    }

    shell.status(
        Status::Created,
        format!(
            "{} `{}` at {}",
            opts.partition.noun(),
            package_name,
            fs::relative_path(ws.root(), &dir).display()
        ),
    );
    Ok(dir)
}

/// Write source, test and config files that do not exist yet.
fn scaffold_files(ws: &Workspace, dir: &Path, opts: &CreateOptions) -> Result<()> {
    write_if_missing(&dir.join("src").join("index.ts"), "")?;
    write_if_missing(
        &dir.join("test").join("index.test.ts"),
        &format!(
            "describe('{}', () => {{\n  it('is set up', () => {{\n    expect(true).toBe(true);\n  }});\n}});\n",
            opts.name
        ),
    )?;

    let tsconfig = dir.join("tsconfig.json");
    if !tsconfig.exists() {
        let value = json!({
            "compilerOptions": {
                "target": "es2019",
                "module": "commonjs",
                "declaration": true,
                "outDir": "dist",
                "rootDir": "src",
                "strict": true,
                "esModuleInterop": true
            },
            "include": ["src"]
        });
        fs::write_json(&tsconfig, &value, ws.indent())?;
    }

    if opts.partition == Partition::Packages {
        write_if_missing(&dir.join("src").join("index.html"), &index_html(&opts.name))?;
        write_if_missing(&dir.join("webpack.dev.js"), &webpack_config("development", "dist-dev"))?;
        write_if_missing(&dir.join("webpack.prod.js"), &webpack_config("production", "dist-prod"))?;
    }
    Ok(())
}

fn write_if_missing(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write_string(path, contents)
}

fn index_html(name: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\" />\n    <title>{}</title>\n  </head>\n  <body></body>\n</html>\n",
        name
    )
}

fn webpack_config(mode: &str, out_dir: &str) -> String {
    format!(
        r#"const path = require('path');
const HtmlWebpackPlugin = require('html-webpack-plugin');

module.exports = {{
  mode: '{mode}',
  entry: './src/index.ts',
  module: {{
    rules: [{{ test: /\.tsx?$/, use: 'ts-loader', exclude: /node_modules/ }}],
  }},
  resolve: {{ extensions: ['.tsx', '.ts', '.js'] }},
  output: {{
    filename: 'bundle.js',
    path: path.resolve(__dirname, '{out_dir}'),
  }},
  plugins: [new HtmlWebpackPlugin({{ template: './src/index.html' }})],
}};
"#
    )
}

/// Script entries a component's manifest delegates to this tool.
fn hook_scripts(partition: Partition) -> serde_json::Map<String, serde_json::Value> {
    let mut hooks = vec!["build", "build-dep", "test", "pre-publish", "post-publish"];
    if partition == Partition::Packages {
        hooks.extend(["build-dev", "build-prod"]);
    }
    hooks
        .into_iter()
        .map(|hook| (hook.to_string(), json!(format!("monohook {}", hook))))
        .collect()
}

/// Patch the generated manifest field by field.
fn patch_manifest(
    ws: &Workspace,
    dir: &Path,
    package_name: &str,
    partition: Partition,
    shell: &Arc<Shell>,
) -> Result<()> {
    let root = ws.root_manifest()?;
    let mut manifest = Manifest::load_or_empty(dir)?;

    manifest.set("name", package_name);
    manifest.set_default("description", "");
    manifest.set("main", "dist/index.js");
    manifest.set("typings", "dist/index.d.ts");
    manifest.set("files", json!(["dist"]));
    manifest.set_nested(&["directories", "test"], "test");
    manifest.set("scripts", hook_scripts(partition));
    manifest.set(
        "jest",
        json!({
            "preset": "ts-jest",
            "testEnvironment": "node",
            "testMatch": ["**/test/**/*.test.ts"]
        }),
    );

    let mut dev_dependencies: Vec<&str> = SHARED_DEV_DEPENDENCIES.to_vec();
    if partition == Partition::Packages {
        dev_dependencies.extend(BUNDLER_DEV_DEPENDENCIES);
    }
    for name in dev_dependencies {
        match root.any_dependency(name) {
            Some(range) => manifest.set_dependency(DependencyKind::Dev, name, range),
            None => shell.warn(format!(
                "`{}` is not a dependency of the root manifest, not added",
                name
            )),
        }
    }

    match partition {
        Partition::Libs => {
            manifest.remove("private");
        }
        Partition::Packages => manifest.set("private", true),
    }

    manifest.save(ws.indent())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::{quiet_shell, WorkspaceFixture};
    use std::os::unix::fs::PermissionsExt;

    fn opts(partition: Partition, name: &str) -> CreateOptions {
        CreateOptions {
            partition,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_create_package() {
        let fixture = WorkspaceFixture::new("test");
        fixture.use_fake_tools(&[("npx", 0), ("npm", 0)], "");
        let ws = fixture.workspace();

        let dir = create_component(&ws, &opts(Partition::Packages, "alpha"), &quiet_shell()).unwrap();
        assert_eq!(dir, fixture.root().join("packages").join("test.alpha"));

        let manifest = fixture.read_json("packages/test.alpha/package.json");
        assert_eq!(manifest["name"], "@monorepo/test.alpha");
        assert_eq!(manifest["description"], "");
        assert_eq!(manifest["main"], "dist/index.js");
        assert_eq!(manifest["typings"], "dist/index.d.ts");
        assert_eq!(manifest["files"], json!(["dist"]));
        assert_eq!(manifest["directories"]["test"], "test");
        assert_eq!(manifest["scripts"]["build"], "monohook build");
        assert_eq!(manifest["scripts"]["build-dev"], "monohook build-dev");
        assert_eq!(manifest["jest"]["preset"], "ts-jest");
        assert_eq!(manifest["devDependencies"]["typescript"], "^5.1.0");
        assert_eq!(manifest["devDependencies"]["webpack"], "^5.88.0");
        assert!(manifest["devDependencies"].get("html-webpack-plugin").is_none());
        assert_eq!(manifest["private"], true);

        assert_eq!(fixture.read("packages/test.alpha/src/index.ts"), "");
        assert!(dir.join("test").join("index.test.ts").is_file());
        assert!(dir.join("webpack.dev.js").is_file());
        assert!(dir.join("src").join("index.html").is_file());

        assert_eq!(
            fixture.calls(),
            vec![
                "npx lerna create @monorepo/test.alpha packages --yes".to_string(),
                "npm install".to_string(),
            ]
        );
    }

    #[test]
    fn test_create_twice_fails_without_mutation() {
        let fixture = WorkspaceFixture::new("test");
        fixture.use_fake_tools(&[("npx", 0), ("npm", 0)], "");
        let ws = fixture.workspace();

        create_component(&ws, &opts(Partition::Packages, "alpha"), &quiet_shell()).unwrap();
        let before = fixture.read("packages/test.alpha/package.json");
        let calls_before = fixture.calls().len();

        let err = create_component(&ws, &opts(Partition::Packages, "alpha"), &quiet_shell())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HookError>(),
            Some(HookError::PathExists { .. })
        ));
        assert_eq!(fixture.read("packages/test.alpha/package.json"), before);
        assert_eq!(fixture.calls().len(), calls_before);
    }

    #[test]
    fn test_create_lib_cleans_lerna_output() {
        let fixture = WorkspaceFixture::new("test");
        fixture.use_fake_tools(&[("npm", 0)], "");
        let npx = fixture.write(
            ".bin/lerna-npx",
            "#!/bin/sh\n\
             mkdir -p libs/test.core/lib libs/test.core/__tests__\n\
             echo '{\"name\": \"@monorepo/test.core\", \"version\": \"0.0.0\", \"license\": \"MIT\", \"private\": true}' > libs/test.core/package.json\n",
        );
        std::fs::set_permissions(&npx, std::fs::Permissions::from_mode(0o755)).unwrap();
        let config = fixture.read(".monohook/config.toml");
        fixture.write_config(&config.replace("[tools]\n", &format!("[tools]\nnpx = \"{}\"\n", npx.display())));
        let ws = fixture.workspace();

        let dir = create_component(&ws, &opts(Partition::Libs, "core"), &quiet_shell()).unwrap();
        assert!(!dir.join("lib").exists());
        assert!(!dir.join("__tests__").exists());
        assert!(!dir.join("webpack.dev.js").exists());

        let manifest = fixture.read_json("libs/test.core/package.json");
        assert_eq!(manifest["license"], "MIT");
        assert_eq!(manifest["version"], "0.0.0");
        assert!(manifest.get("private").is_none());
        assert!(manifest["devDependencies"].get("webpack").is_none());
        assert_eq!(manifest["devDependencies"]["jest"], "^29.5.0");
    }

    #[test]
    fn test_placeholder_scope_blocks_scaffolding() {
        let fixture = WorkspaceFixture::placeholder();
        fixture.use_fake_tools(&[("npx", 0), ("npm", 0)], "");
        let ws = fixture.workspace();

        let err = create_component(&ws, &opts(Partition::Libs, "core"), &quiet_shell()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HookError>(),
            Some(HookError::PlaceholderScope { .. })
        ));
        assert!(fixture.calls().is_empty());
    }

    #[test]
    fn test_failed_lerna_create_aborts() {
        let fixture = WorkspaceFixture::new("test");
        fixture.use_fake_tools(&[("npx", 1), ("npm", 0)], "");
        let ws = fixture.workspace();

        let err = create_component(&ws, &opts(Partition::Libs, "core"), &quiet_shell()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HookError>(),
            Some(HookError::ToolFailed { code: Some(1), .. })
        ));
        assert_eq!(fixture.calls().len(), 1);
    }
}
