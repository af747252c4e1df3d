//! Command implementations
//!
//! Hook commands validate their positional arguments, then hand the raw
//! arguments to [`HookRunner::run`](monohook::hooks::HookRunner::run) so an
//! override script sees exactly what the hook received.

pub mod add_dependency;
pub mod build;
pub mod check_peers;
pub mod completions;
pub mod create;
pub mod init;
pub mod merge_template;
pub mod publish;
pub mod publish_hooks;
pub mod update;
pub mod upgrade;

use monohook::core::HookError;

/// Take a required positional argument. Absent and empty count as missing.
pub fn required(value: Option<&String>, argument: &'static str, usage: &'static str) -> Result<String, HookError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(HookError::MissingArgument { argument, usage }),
    }
}

/// The positional arguments as given, up to the first one that was omitted.
pub fn raw_args(args: &[&Option<String>]) -> Vec<String> {
    args.iter().map_while(|arg| (*arg).clone()).collect()
}
