// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt definitions and the terminal surface that renders them.
//!
//! Questions go to stderr so stdout stays clean for command output. Masked
//! kinds are read with `rpassword` and never echoed.

use std::io::{BufRead, Write};

use kms_core::KmsError;
use secrecy::SecretString;

/// The closed set of prompt kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// Pick one of a fixed list of choices.
    Option(Vec<String>),
    /// Yes or no.
    Boolean,
    /// Free text.
    Value,
    /// Pick how the vault should be unlocked (password, keyfile or both).
    CredentialChoice,
    /// Masked password entry.
    Password,
    /// Masked entry for anything else that must not be echoed.
    Secret,
}

impl PromptKind {
    /// Whether input for this kind must not be echoed.
    pub fn is_masked(&self) -> bool {
        matches!(self, Self::Password | Self::Secret)
    }
}

/// A single question put to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub name: String,
    pub kind: PromptKind,
    pub question: String,
    /// Returned when the user just presses enter.
    pub default: Option<String>,
}

impl Prompt {
    pub fn new(name: impl Into<String>, kind: PromptKind, question: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            question: question.into(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// The line shown to the user, including choices and default hints.
    pub fn render(&self) -> String {
        let hint = match &self.kind {
            PromptKind::Option(choices) => format!(" [{}]", choices.join("/")),
            PromptKind::Boolean => " [y/n]".to_string(),
            PromptKind::CredentialChoice => " [password/keyfile/both]".to_string(),
            PromptKind::Value | PromptKind::Password | PromptKind::Secret => String::new(),
        };
        match (&self.default, self.kind.is_masked()) {
            (Some(default), false) => format!("{}{hint} ({default}): ", self.question),
            _ => format!("{}{hint}: ", self.question),
        }
    }

    /// Apply the default to an empty answer.
    pub fn resolve_answer(&self, answer: String) -> String {
        match (&self.default, answer.is_empty()) {
            (Some(default), true) => default.clone(),
            _ => answer,
        }
    }
}

/// A text surface able to put questions to a user.
pub trait PromptSurface {
    /// Ask an unmasked question and return the trimmed answer.
    fn ask(&mut self, prompt: &Prompt) -> Result<String, KmsError>;

    /// Ask a masked question.
    fn secret(&mut self, prompt: &Prompt) -> Result<SecretString, KmsError>;

    /// Ask `prompt`, choosing masked or plain input from its kind.
    fn answer(&mut self, prompt: &Prompt) -> Result<PromptAnswer, KmsError> {
        if prompt.kind.is_masked() {
            self.secret(prompt).map(PromptAnswer::Masked)
        } else {
            self.ask(prompt).map(PromptAnswer::Plain)
        }
    }
}

/// An answer as returned by [`PromptSurface::answer`].
#[derive(Debug)]
pub enum PromptAnswer {
    Plain(String),
    Masked(SecretString),
}

/// [`PromptSurface`] on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalSurface;

impl TerminalSurface {
    pub fn new() -> Self {
        Self
    }
}

impl PromptSurface for TerminalSurface {
    fn ask(&mut self, prompt: &Prompt) -> Result<String, KmsError> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{}", prompt.render())
            .and_then(|()| stderr.flush())
            .map_err(|e| KmsError::Unauthorized(format!("failed to show prompt: {e}")))?;

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| KmsError::Unauthorized(format!("failed to read {}: {e}", prompt.name)))?;
        Ok(prompt.resolve_answer(line.trim().to_string()))
    }

    fn secret(&mut self, prompt: &Prompt) -> Result<SecretString, KmsError> {
        eprint!("{}", prompt.render());
        let value = rpassword::read_password()
            .map_err(|e| KmsError::Unauthorized(format!("failed to read {}: {e}", prompt.name)))?;
        Ok(SecretString::from(prompt.resolve_answer(value)))
    }
}
