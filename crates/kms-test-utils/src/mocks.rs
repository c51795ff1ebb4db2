// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic stand-ins for the pipeline's collaborators.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use kms_core::{KmsError, VaultError};
use kms_vault::gateway::{KeyfileCredential, VaultGateway, VaultHandle};
use kms_vault::prompt::{Prompt, PromptSurface};
use kms_vault::trust::{ProcessProbe, ShellRegistry};
use secrecy::{ExposeSecret, SecretString};

/// A prompt surface that answers from a pre-loaded queue.
///
/// Every prompt shown is recorded. An exhausted queue fails the prompt,
/// which makes an unexpected extra question visible in tests.
#[derive(Debug, Default)]
pub struct ScriptedSurface {
    answers: VecDeque<String>,
    asked: Vec<Prompt>,
}

impl ScriptedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Prompts shown so far, in order.
    pub fn asked(&self) -> &[Prompt] {
        &self.asked
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next_answer(&mut self, prompt: &Prompt) -> Result<String, KmsError> {
        self.asked.push(prompt.clone());
        self.answers
            .pop_front()
            .ok_or_else(|| KmsError::Unauthorized(format!("no scripted answer for `{}`", prompt.name)))
    }
}

impl PromptSurface for ScriptedSurface {
    fn ask(&mut self, prompt: &Prompt) -> Result<String, KmsError> {
        let answer = self.next_answer(prompt)?;
        Ok(prompt.resolve_answer(answer))
    }

    fn secret(&mut self, prompt: &Prompt) -> Result<SecretString, KmsError> {
        let answer = self.next_answer(prompt)?;
        Ok(SecretString::from(prompt.resolve_answer(answer)))
    }
}

/// A process probe reporting a fixed identity.
#[derive(Debug, Clone)]
pub struct FakeProbe {
    user: String,
    parent: String,
}

impl FakeProbe {
    pub fn new(user: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            parent: parent.into(),
        }
    }

    /// `alice` started from `bash`.
    pub fn shell() -> Self {
        Self::new("alice", "bash")
    }

    /// `alice` started from `systemd`.
    pub fn service() -> Self {
        Self::new("alice", "systemd")
    }
}

impl ProcessProbe for FakeProbe {
    fn login_user(&self) -> Result<String, KmsError> {
        Ok(self.user.clone())
    }

    fn parent_process_name(&self) -> Result<String, KmsError> {
        Ok(self.parent.clone())
    }
}

/// An in-memory shell registry.
#[derive(Debug, Clone)]
pub struct StaticShells {
    shells: Option<Vec<String>>,
}

impl StaticShells {
    pub fn new<I, S>(shells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shells: Some(shells.into_iter().map(Into::into).collect()),
        }
    }

    /// A registry that fails like an unreadable `/etc/shells`.
    pub fn unreadable() -> Self {
        Self { shells: None }
    }
}

impl Default for StaticShells {
    fn default() -> Self {
        Self::new(["/bin/sh", "/bin/bash", "/usr/bin/zsh"])
    }
}

impl ShellRegistry for StaticShells {
    fn shells(&self) -> Result<Vec<String>, KmsError> {
        self.shells
            .clone()
            .ok_or_else(|| KmsError::Config("shell registry is unreadable".to_string()))
    }
}

/// One call to [`VaultGateway::create`] as seen by [`RecordingGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCreate {
    pub filename: PathBuf,
    pub password: Option<String>,
    pub keyfile_path: Option<PathBuf>,
    pub keyfile_secret: Option<String>,
}

/// A vault gateway that records calls and touches no files.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    creates: Mutex<Vec<RecordedCreate>>,
    fail_with_existing: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create` fails with [`VaultError::AlreadyExists`].
    pub fn failing() -> Self {
        Self {
            creates: Mutex::new(Vec::new()),
            fail_with_existing: true,
        }
    }

    pub fn creates(&self) -> Vec<RecordedCreate> {
        self.creates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl VaultGateway for RecordingGateway {
    fn create(
        &self,
        filename: &Path,
        password: Option<&SecretString>,
        keyfile: Option<&KeyfileCredential>,
    ) -> Result<(), VaultError> {
        if self.fail_with_existing {
            return Err(VaultError::AlreadyExists {
                path: filename.to_path_buf(),
            });
        }
        self.creates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCreate {
                filename: filename.to_path_buf(),
                password: password.map(|p| p.expose_secret().to_string()),
                keyfile_path: keyfile.map(|k| k.path.clone()),
                keyfile_secret: keyfile.map(|k| k.secret.expose_secret().to_string()),
            });
        Ok(())
    }

    fn open(
        &self,
        filename: &Path,
        _password: Option<&SecretString>,
        _keyfile: Option<&KeyfileCredential>,
        readonly: bool,
    ) -> Result<VaultHandle, VaultError> {
        let known = self
            .creates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|c| c.filename == filename);
        if !known {
            return Err(VaultError::NotFound {
                path: filename.to_path_buf(),
            });
        }
        Ok(VaultHandle {
            path: filename.to_path_buf(),
            readonly,
        })
    }
}
