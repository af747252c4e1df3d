//! `monohook create-package` and `monohook create-lib` commands

use anyhow::Result;

use crate::cli::CreateArgs;
use crate::commands::{raw_args, required};
use monohook::core::Partition;
use monohook::hooks::{HookName, HookRunner};
use monohook::ops::{self, CreateOptions};

pub fn execute(args: CreateArgs, partition: Partition, runner: &HookRunner) -> Result<i32> {
    let (hook, usage) = match partition {
        Partition::Packages => (HookName::CreatePackage, "monohook create-package <name>"),
        Partition::Libs => (HookName::CreateLib, "monohook create-lib <name>"),
    };
    let name = required(args.name.as_ref(), "name", usage)?;

    let opts = CreateOptions { partition, name };
    let outcome = runner.run(hook, &raw_args(&[&args.name]), |ws| {
        ops::create_component(ws, &opts, runner.shell())?;
        Ok(())
    })?;
    Ok(outcome.exit_code())
}
