//! Shared utilities

pub mod config;
pub mod context;
pub mod fs;
pub mod process;
pub mod prompt;
pub mod shell;

pub use config::Config;
pub use context::GlobalContext;
pub use prompt::{DefaultsPrompter, Prompter, TerminalPrompter};
pub use shell::{ColorChoice, Shell, Status};
