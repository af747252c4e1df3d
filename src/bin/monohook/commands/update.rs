//! `monohook update` command

use anyhow::Result;

use crate::cli::UpdateArgs;
use monohook::hooks::HookRunner;
use monohook::ops::{self, UpdateOptions};
use monohook::util::{Status, TerminalPrompter};

pub fn execute(args: UpdateArgs, runner: &HookRunner) -> Result<i32> {
    let ws = runner.workspace()?;
    let shell = runner.shell();

    let opts = UpdateOptions { no_git: args.no_git };
    let report = ops::update(&ws, &opts, shell, &TerminalPrompter)?;

    for name in &report.unresolved_audits {
        shell.warn(format!("{} still has unresolved audit findings", name));
    }
    shell.status(Status::Finished, "dependency update");
    Ok(0)
}
