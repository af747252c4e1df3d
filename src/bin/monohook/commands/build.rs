//! `monohook build`, `build-dep`, `build-dev` and `build-prod` commands
//!
//! All four act on the component in the current directory.

use anyhow::{bail, Result};

use monohook::hooks::{HookName, HookRunner};
use monohook::ops::{self, BundleProfile};

pub fn execute(hook: HookName, runner: &HookRunner) -> Result<i32> {
    let dir = runner.ctx().cwd().to_path_buf();
    let shell = runner.shell();

    let outcome = runner.run(hook, &[], |ws| match hook {
        HookName::Build => ops::build(ws, &dir, shell),
        HookName::BuildDep => ops::build_dep(ws, &dir, shell),
        HookName::BuildDev => ops::build_bundle(ws, &dir, BundleProfile::Dev, shell),
        HookName::BuildProd => ops::build_bundle(ws, &dir, BundleProfile::Prod, shell),
        other => bail!("`{}` is not a build hook", other),
    })?;
    Ok(outcome.exit_code())
}
