//! Operator prompts.
//!
//! Hooks that need a human (first-run setup, conflict resolution, publish
//! selection) ask through [`Prompter`], so tests can script the answers.

use anyhow::{bail, Context, Result};
use dialoguer::{Confirm, Input, MultiSelect, Select};

/// Interactive questions asked by hooks.
pub trait Prompter {
    /// Ask a yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    /// Ask for free text.
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String>;

    /// Pick one item; returns its index.
    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize>;

    /// Pick any number of items; returns their indices.
    fn multi_select(&self, prompt: &str, items: &[String], defaults: &[bool]) -> Result<Vec<usize>>;
}

/// Terminal prompts backed by dialoguer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("failed to read confirmation")
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new().with_prompt(prompt);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().context("failed to read input")
    }

    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .context("failed to read selection")
    }

    fn multi_select(&self, prompt: &str, items: &[String], defaults: &[bool]) -> Result<Vec<usize>> {
        MultiSelect::new()
            .with_prompt(prompt)
            .items(items)
            .defaults(defaults)
            .interact()
            .context("failed to read selection")
    }
}

/// Answers every question with its default, for `--yes` runs.
///
/// Free-text questions without a default cannot be answered and fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultsPrompter;

impl Prompter for DefaultsPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        tracing::debug!("{} -> {}", prompt, default);
        Ok(default)
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(value) => Ok(value.to_string()),
            None => bail!("`{}` needs an answer and cannot run non-interactively", prompt),
        }
    }

    fn select(&self, _prompt: &str, _items: &[String], default: usize) -> Result<usize> {
        Ok(default)
    }

    fn multi_select(&self, _prompt: &str, _items: &[String], defaults: &[bool]) -> Result<Vec<usize>> {
        Ok(defaults
            .iter()
            .enumerate()
            .filter_map(|(i, selected)| selected.then_some(i))
            .collect())
    }
}
