//! `monohook add-dependency` and `monohook add-dev-dependency` commands

use anyhow::Result;

use crate::cli::AddDependencyArgs;
use crate::commands::{raw_args, required};
use monohook::hooks::{HookName, HookRunner};
use monohook::ops::{self, AddDependencyOptions};

pub fn execute(args: AddDependencyArgs, dev: bool, runner: &HookRunner) -> Result<i32> {
    let (hook, usage) = if dev {
        (HookName::AddDevDependency, "monohook add-dev-dependency <dependency> [component]")
    } else {
        (HookName::AddDependency, "monohook add-dependency <dependency> [component]")
    };
    let dependency = required(args.dependency.as_ref(), "dependency", usage)?;

    let opts = AddDependencyOptions {
        dependency,
        component: args.component.clone().filter(|c| !c.is_empty()),
        dev,
    };
    let raw = raw_args(&[&args.dependency, &args.component]);
    let outcome = runner.run(hook, &raw, |ws| {
        ops::add_dependency(ws, &opts, runner.shell())?;
        Ok(())
    })?;
    Ok(outcome.exit_code())
}
