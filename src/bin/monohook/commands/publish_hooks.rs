//! `monohook pre-publish`, `post-publish`, `pre-publish-global` and
//! `post-publish-global` commands
//!
//! These are called by `monohook publish` through each manifest's scripts.
//! A `true` dry-run flag echoes every argument before anything runs.

use anyhow::{bail, Result};

use crate::cli::{ComponentHookArgs, PostPublishGlobalArgs, PrePublishGlobalArgs};
use crate::commands::{raw_args, required};
use monohook::hooks::{HookName, HookRunner};
use monohook::ops::{self, GlobalHookArgs};

pub fn execute_component(hook: HookName, args: ComponentHookArgs, runner: &HookRunner) -> Result<i32> {
    let usage = match hook {
        HookName::PrePublish => "monohook pre-publish <dry-run> <name> <version>",
        HookName::PostPublish => "monohook post-publish <dry-run> <name> <version>",
        other => bail!("`{}` is not a per-component publish hook", other),
    };
    let dry_run = required(args.dry_run.as_ref(), "dry-run", usage)?;
    let name = required(args.name.as_ref(), "name", usage)?;
    let version = required(args.version.as_ref(), "version", usage)?;
    let parsed = ops::publish_hooks::ComponentHookArgs::parse(&dry_run, &name, &version)?;

    let raw = raw_args(&[&args.dry_run, &args.name, &args.version]);
    let shell = runner.shell();
    if parsed.dry_run {
        shell.echo_args(hook.as_str(), &raw);
    }

    let dir = runner.ctx().cwd().to_path_buf();
    let outcome = runner.run(hook, &raw, |ws| match hook {
        HookName::PrePublish => ops::pre_publish(ws, &dir, &parsed, shell),
        _ => ops::post_publish(&parsed, shell),
    })?;
    Ok(outcome.exit_code())
}

pub fn execute_pre_global(args: PrePublishGlobalArgs, runner: &HookRunner) -> Result<i32> {
    const USAGE: &str = "monohook pre-publish-global <dry-run> <no-git> <components> <registries>";
    let parsed = GlobalHookArgs::parse_pre(
        &required(args.dry_run.as_ref(), "dry-run", USAGE)?,
        &required(args.no_git.as_ref(), "no-git", USAGE)?,
        &required(args.components.as_ref(), "components", USAGE)?,
        &required(args.registries.as_ref(), "registries", USAGE)?,
    )?;

    let raw = raw_args(&[&args.dry_run, &args.no_git, &args.components, &args.registries]);
    execute_global(HookName::PrePublishGlobal, parsed, &raw, runner)
}

pub fn execute_post_global(args: PostPublishGlobalArgs, runner: &HookRunner) -> Result<i32> {
    const USAGE: &str = "monohook post-publish-global <dry-run> <components>";
    let parsed = GlobalHookArgs::parse_post(
        &required(args.dry_run.as_ref(), "dry-run", USAGE)?,
        &required(args.components.as_ref(), "components", USAGE)?,
    )?;

    let raw = raw_args(&[&args.dry_run, &args.components]);
    execute_global(HookName::PostPublishGlobal, parsed, &raw, runner)
}

fn execute_global(hook: HookName, parsed: GlobalHookArgs, raw: &[String], runner: &HookRunner) -> Result<i32> {
    let shell = runner.shell();
    if parsed.dry_run {
        shell.echo_args(hook.as_str(), raw);
    }

    let outcome = runner.run(hook, raw, |_| match hook {
        HookName::PrePublishGlobal => ops::pre_publish_global(&parsed, shell),
        _ => ops::post_publish_global(&parsed, shell),
    })?;
    Ok(outcome.exit_code())
}
