//! monohook - lifecycle hooks for JavaScript/TypeScript monorepos
//!
//! This crate provides the library behind the `monohook` binary: the
//! workspace model, hook dispatch with override scripts, and the operations
//! each hook performs.

pub mod core;
pub mod hooks;
pub mod ops;
pub mod util;

/// Test utilities for monohook unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides on-disk workspace fixtures, fake tools and a scripted prompter.
#[cfg(test)]
pub mod test_support;

pub use core::{component::Component, manifest::Manifest, workspace::Workspace};
pub use hooks::{HookName, HookOutcome, HookRunner};
pub use util::context::GlobalContext;
