//! `monohook init` command

use anyhow::Result;

use monohook::hooks::{HookName, HookRunner};
use monohook::ops;
use monohook::util::{Status, TerminalPrompter};

pub fn execute(runner: &HookRunner) -> Result<i32> {
    let shell = runner.shell();
    let outcome = runner.run(HookName::Init, &[], |ws| {
        let result = ops::init(ws, shell, &TerminalPrompter)?;
        if !result.first_run {
            shell.status(Status::Finished, "workspace dependencies are up to date");
        }
        Ok(())
    })?;
    Ok(outcome.exit_code())
}
