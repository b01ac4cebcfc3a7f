//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! Commands never touch the terminal directly. They ask an
//! [`InteractionSource`], which is the real terminal in the binary and a
//! [`ScriptedInteraction`] in tests.
//!
//! Prompts are written to stderr so stdout stays parseable.

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("not in interactive mode")]
    NotInteractive,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A source of answers to interactive questions.
pub trait InteractionSource: Send {
    /// Whether a human can be asked questions.
    fn is_interactive(&self) -> bool;

    /// Ask for a line of text. The trailing newline is removed.
    fn prompt_line(&mut self, prompt: &str) -> Result<String, PromptError>;

    /// Ask for text without echoing it.
    fn prompt_secret(&mut self, prompt: &str) -> Result<String, PromptError>;

    /// Ask `Warning: Are you sure you want to <action>? (y/N) ? `.
    ///
    /// Only `y` and `yes` (any case) confirm.
    fn confirm(&mut self, action: &str) -> Result<bool, PromptError> {
        let answer = self.prompt_line(&confirm_prompt(action))?;
        Ok(is_yes(&answer))
    }
}

/// The confirmation question for a destructive action.
pub fn confirm_prompt(action: &str) -> String {
    format!("Warning: Are you sure you want to {}? (y/N) ? ", action)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Prompts on the process's terminal.
#[derive(Debug, Clone)]
pub struct TerminalInteraction {
    stdin_is_tty: bool,
}

impl Default for TerminalInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalInteraction {
    pub fn new() -> Self {
        Self {
            stdin_is_tty: io::stdin().is_terminal(),
        }
    }

    fn read_stdin_line(&self, prompt: &str) -> Result<String, PromptError> {
        let mut stderr = io::stderr();
        write!(stderr, "{}", prompt)?;
        stderr.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(PromptError::Cancelled);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl InteractionSource for TerminalInteraction {
    fn is_interactive(&self) -> bool {
        self.stdin_is_tty
    }

    fn prompt_line(&mut self, prompt: &str) -> Result<String, PromptError> {
        self.read_stdin_line(prompt)
    }

    fn prompt_secret(&mut self, prompt: &str) -> Result<String, PromptError> {
        if self.stdin_is_tty {
            Ok(rpassword::prompt_password(prompt)?)
        } else {
            self.read_stdin_line(prompt)
        }
    }
}

/// Pre-recorded answers, for tests and scripted use.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInteraction {
    interactive: bool,
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedInteraction {
    /// An interactive source that replies with `answers` in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interactive: true,
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// A source that reports itself as non-interactive and has no answers.
    pub fn non_interactive() -> Self {
        Self::default()
    }

    /// Prompts shown so far.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    fn next_answer(&mut self, prompt: &str) -> Result<String, PromptError> {
        self.asked.push(prompt.to_string());
        self.answers.pop_front().ok_or(PromptError::Cancelled)
    }
}

impl InteractionSource for ScriptedInteraction {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn prompt_line(&mut self, prompt: &str) -> Result<String, PromptError> {
        self.next_answer(prompt)
    }

    fn prompt_secret(&mut self, prompt: &str) -> Result<String, PromptError> {
        self.next_answer(prompt)
    }
}
