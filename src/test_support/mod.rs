//! Test utilities for monohook unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use monohook::test_support::{Answer, ScriptedPrompter, WorkspaceFixture};
//!
//! #[test]
//! fn test_example() {
//!     let fixture = WorkspaceFixture::new("test");
//!     let prompter = ScriptedPrompter::new([Answer::Confirm(true)]);
//!     // Run an operation against fixture.workspace() with &prompter...
//!     prompter.assert_exhausted();
//! }
//! ```

pub mod fixtures;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::util::shell::{ColorChoice, Shell, Verbosity};
use crate::util::Prompter;

pub use fixtures::*;

/// A scripted answer for [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Confirm(bool),
    Input(String),
    Select(usize),
    MultiSelect(Vec<usize>),
    /// Answer whatever question comes next with its default
    Default,
}

/// Prompter that replays answers in order and records the questions.
///
/// Asking a question of the wrong kind, or more questions than were
/// scripted, is an error so tests notice unexpected prompts.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<Answer>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        ScriptedPrompter {
            answers: RefCell::new(answers.into_iter().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    /// Prompts asked so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    /// Panic if scripted answers were left unused.
    pub fn assert_exhausted(&self) {
        let left = self.answers.borrow();
        assert!(left.is_empty(), "unused scripted answers: {:?}", left);
    }

    fn next(&self, prompt: &str) -> Result<Answer> {
        self.asked.borrow_mut().push(prompt.to_string());
        match self.answers.borrow_mut().pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("unexpected prompt: {}", prompt),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        match self.next(prompt)? {
            Answer::Confirm(value) => Ok(value),
            Answer::Default => Ok(default),
            other => bail!("expected a confirm answer for `{}`, scripted {:?}", prompt, other),
        }
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        match (self.next(prompt)?, default) {
            (Answer::Input(value), _) => Ok(value),
            (Answer::Default, Some(default)) => Ok(default.to_string()),
            (other, _) => bail!("expected an input answer for `{}`, scripted {:?}", prompt, other),
        }
    }

    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize> {
        match self.next(prompt)? {
            Answer::Select(index) if index < items.len() => Ok(index),
            Answer::Default => Ok(default),
            other => bail!("expected a select answer for `{}`, scripted {:?}", prompt, other),
        }
    }

    fn multi_select(&self, prompt: &str, items: &[String], defaults: &[bool]) -> Result<Vec<usize>> {
        match self.next(prompt)? {
            Answer::MultiSelect(indices) if indices.iter().all(|i| *i < items.len()) => Ok(indices),
            Answer::Default => Ok(defaults
                .iter()
                .enumerate()
                .filter_map(|(i, selected)| selected.then_some(i))
                .collect()),
            other => bail!("expected a multi-select answer for `{}`, scripted {:?}", prompt, other),
        }
    }
}

/// A shell that prints nothing but errors.
pub fn quiet_shell() -> Arc<Shell> {
    Arc::new(Shell::new(Verbosity::Quiet, ColorChoice::Never))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_prompter_replays_in_order() {
        let prompter = ScriptedPrompter::new([
            Answer::Confirm(false),
            Answer::Input("viewer".to_string()),
            Answer::Select(1),
            Answer::Default,
        ]);

        assert!(!prompter.confirm("Proceed?", true).unwrap());
        assert_eq!(prompter.input("Scope", None).unwrap(), "viewer");
        assert_eq!(prompter.select("Pick", &["a".into(), "b".into()], 0).unwrap(), 1);
        assert_eq!(
            prompter
                .multi_select("Pick", &["a".into(), "b".into()], &[false, true])
                .unwrap(),
            vec![1]
        );
        prompter.assert_exhausted();
        assert_eq!(prompter.asked().len(), 4);
    }

    #[test]
    fn test_scripted_prompter_rejects_unexpected_prompts() {
        let prompter = ScriptedPrompter::new([Answer::Confirm(true)]);
        assert!(prompter.input("Scope", None).is_err());
        assert!(prompter.confirm("Again?", true).is_err());
    }

    #[test]
    fn test_fixture_layout() {
        let fixture = WorkspaceFixture::new("test");
        assert!(fixture.root().join("scope.json").is_file());
        assert!(fixture.root().join("packages").is_dir());
        assert_eq!(fixture.workspace().scope().scope, "test");
        assert!(WorkspaceFixture::placeholder().workspace().scope().is_placeholder());
    }
}
