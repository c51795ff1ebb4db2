// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process trust classification.
//!
//! A caller whose parent process is not an interactive shell (a service
//! manager, a scheduler, another program) is trusted by identity and gets
//! its credentials synthesized without a prompt. A caller started from a
//! recognized shell has a human at the keyboard and must authenticate.

use std::path::{Path, PathBuf};

use kms_core::{KmsError, ProcessCredentials};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, Users};
use tracing::{debug, info};

/// Source of the recognized interactive shells.
pub trait ShellRegistry {
    /// All registered shells. An unreadable registry is an error, never an
    /// empty list.
    fn shells(&self) -> Result<Vec<String>, KmsError>;
}

/// Shell registry backed by an `/etc/shells` style file.
#[derive(Debug, Clone)]
pub struct EtcShells {
    path: PathBuf,
}

impl EtcShells {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for EtcShells {
    fn default() -> Self {
        Self::new("/etc/shells")
    }
}

impl ShellRegistry for EtcShells {
    fn shells(&self) -> Result<Vec<String>, KmsError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            KmsError::Config(format!(
                "shell registry {} is unreadable: {e}",
                self.path.display()
            ))
        })?;
        Ok(parse_shells(&content))
    }
}

/// Entries of a shells file, skipping blank lines and `#` comments.
pub fn parse_shells(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Identity facts about the running process.
pub trait ProcessProbe {
    /// Login name of the user owning this process.
    fn login_user(&self) -> Result<String, KmsError>;

    /// Executable name of the parent process.
    fn parent_process_name(&self) -> Result<String, KmsError>;
}

/// [`ProcessProbe`] backed by the operating system's process table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl SystemProbe {
    fn snapshot() -> Result<(System, Pid), KmsError> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| KmsError::Unauthorized(format!("unexpected trust state: {e}")))?;
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::everything(),
        );
        Ok((system, pid))
    }
}

impl ProcessProbe for SystemProbe {
    fn login_user(&self) -> Result<String, KmsError> {
        let (system, pid) = Self::snapshot()?;
        let uid = system
            .process(pid)
            .and_then(|process| process.user_id())
            .ok_or_else(|| {
                KmsError::Unauthorized("unexpected trust state: process owner unknown".into())
            })?;
        let users = Users::new_with_refreshed_list();
        users
            .get_user_by_id(uid)
            .map(|user| user.name().to_string())
            .ok_or_else(|| {
                KmsError::Unauthorized("unexpected trust state: login user unknown".into())
            })
    }

    fn parent_process_name(&self) -> Result<String, KmsError> {
        let (mut system, pid) = Self::snapshot()?;
        let parent = system
            .process(pid)
            .and_then(|process| process.parent())
            .ok_or_else(|| {
                KmsError::Unauthorized("unexpected trust state: no parent process".into())
            })?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[parent]),
            true,
            ProcessRefreshKind::everything(),
        );
        system
            .process(parent)
            .map(|process| process.name().to_string_lossy().into_owned())
            .ok_or_else(|| {
                KmsError::Unauthorized(format!(
                    "unexpected trust state: parent process {parent} vanished"
                ))
            })
    }
}

/// Outcome of trust classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    /// No prompt; the vault is unlocked with the keyfile alone.
    ProcessTrusted(ProcessCredentials),
    /// A human must authenticate through the credential resolver.
    Interactive,
}

impl TrustDecision {
    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::ProcessTrusted(_))
    }
}

/// Decide whether the caller needs to authenticate interactively.
///
/// Fails closed: a registry that cannot be read is a configuration error
/// rather than a default decision.
pub fn classify(
    os_login_user: &str,
    parent_process_name: &str,
    registry: &dyn ShellRegistry,
    keyfile_path: &Path,
) -> Result<TrustDecision, KmsError> {
    let shells = registry.shells()?;
    debug!(parent = parent_process_name, shells = shells.len(), "classifying caller");

    if is_registered_shell(parent_process_name, &shells) {
        info!(
            user = os_login_user,
            parent = parent_process_name,
            "caller started from an interactive shell, credentials required"
        );
        return Ok(TrustDecision::Interactive);
    }

    info!(
        user = os_login_user,
        parent = parent_process_name,
        "caller trusted by process identity"
    );
    Ok(TrustDecision::ProcessTrusted(ProcessCredentials {
        os_user: os_login_user.to_string(),
        process_name: parent_process_name.to_string(),
        keyfile_path: keyfile_path.to_path_buf(),
    }))
}

/// `name` matches an entry itself or the entry's file name.
fn is_registered_shell(name: &str, shells: &[String]) -> bool {
    let name = name.trim();
    !name.is_empty()
        && shells.iter().any(|entry| {
            entry == name || Path::new(entry).file_name().is_some_and(|file| file == name)
        })
}
