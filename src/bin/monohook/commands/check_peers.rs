//! `monohook check-peers` command
//!
//! Mismatches are reported as warnings; the command itself succeeds.

use anyhow::Result;

use monohook::hooks::HookRunner;
use monohook::ops::{self, NpmView};

pub fn execute(runner: &HookRunner) -> Result<i32> {
    let ws = runner.workspace()?;
    ops::check_peers(&ws, &NpmView::new(&ws), runner.shell())?;
    Ok(0)
}
