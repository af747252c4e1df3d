//! `monohook publish` command
//!
//! Not a hook: the publish driver calls the publish hooks itself.

use anyhow::Result;

use crate::cli::PublishArgs;
use monohook::hooks::HookRunner;
use monohook::ops::{self, PublishOptions};
use monohook::util::{DefaultsPrompter, Prompter, Status, TerminalPrompter};

pub fn execute(args: PublishArgs, runner: &HookRunner) -> Result<i32> {
    let ws = runner.workspace()?;
    let shell = runner.shell();

    let prompter: &dyn Prompter = if args.yes {
        &DefaultsPrompter
    } else {
        &TerminalPrompter
    };
    let opts = PublishOptions {
        dry_run: args.dry_run,
        no_git: args.no_git,
        skip_existing: args.skip_existing,
        keep_version: args.keep_version,
    };

    let report = ops::publish(&ws, &opts, shell, prompter)?;

    let verb = if opts.dry_run { "checked" } else { "published" };
    shell.status(
        Status::Finished,
        format!("{} {} component(s)", verb, report.published.len()),
    );
    for item in &report.skipped {
        shell.status(
            Status::Skipped,
            format!("{}@{} was already published", item.component.name, item.new_version),
        );
    }
    if report.pushed {
        shell.status(Status::Finished, format!("pushed {} git ref(s)", report.git_refs.len()));
    }
    Ok(0)
}
