//! `monohook merge-template` command

use anyhow::Result;

use monohook::hooks::{HookName, HookRunner};
use monohook::ops::{self, MergeOutcome, MergeTemplateOptions};
use monohook::util::{Status, TerminalPrompter};

pub fn execute(runner: &HookRunner) -> Result<i32> {
    let shell = runner.shell();
    let outcome = runner.run(HookName::MergeTemplate, &[], |ws| {
        let opts = MergeTemplateOptions::from_config(&ws.config().template)?;
        match ops::merge_template(ws, &opts, shell, &TerminalPrompter)? {
            MergeOutcome::Committed { commit, .. } => {
                shell.status(Status::Merging, format!("template `{}` as {}", opts.url, commit));
            }
            MergeOutcome::UpToDate { .. } => {}
        }
        Ok(())
    })?;
    Ok(outcome.exit_code())
}
