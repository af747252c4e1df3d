//! `monohook upgrade` and `monohook apply-upgrade` commands

use anyhow::Result;

use crate::cli::UpgradeArgs;
use monohook::hooks::HookRunner;
use monohook::ops::{self, UpgradeOptions, UpgradeTarget};
use monohook::util::{Status, TerminalPrompter};

pub fn execute(args: UpgradeArgs, runner: &HookRunner) -> Result<i32> {
    let ws = runner.workspace()?;
    let shell = runner.shell();

    let opts = UpgradeOptions {
        target: args.target.as_deref().map(str::parse::<UpgradeTarget>).transpose()?,
        filter: args.filter,
        exclude: args.exclude,
    };
    let report = ops::upgrade(&ws, &opts, shell, &TerminalPrompter)?;

    if report.failed.is_empty() {
        shell.status(Status::Finished, format!("{} upgrade", report.target));
        Ok(0)
    } else {
        shell.status(
            Status::Error,
            format!("upgrade failed for {}", report.failed.join(", ")),
        );
        Ok(1)
    }
}

pub fn execute_apply(runner: &HookRunner) -> Result<i32> {
    let ws = runner.workspace()?;
    ops::apply_upgrade(&ws, runner.shell(), &TerminalPrompter)?;
    Ok(0)
}
