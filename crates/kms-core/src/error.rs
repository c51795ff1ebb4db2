// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the kms credential provisioner.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// The error type shared by every stage of the provisioning pipeline.
///
/// All variants are fatal for the running command; nothing is retried.
#[derive(Debug, Error)]
pub enum KmsError {
    /// Missing or corrupt configuration, shell registry, or content template.
    #[error("configuration error: {0}")]
    Config(String),

    /// The caller could not be authorized (user mismatch, empty password,
    /// unexpected trust state).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A password policy rule was violated or the confirmation did not match.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// Key generation, randomness, encryption or decryption failure.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Filesystem failure while creating directories or writing key material.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Error reported by the vault library, passed through unchanged.
    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl KmsError {
    /// Build an [`KmsError::Io`] whose context names the path involved.
    pub fn io(action: &str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context: format!("failed to {action} {}", path.display()),
            source,
        }
    }
}

/// Errors raised by a vault gateway implementation.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A vault already exists at the requested location.
    #[error("vault already exists at {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// No vault exists at the requested location.
    #[error("no vault found at {}", path.display())]
    NotFound { path: PathBuf },

    /// Neither a password nor a keyfile was supplied.
    #[error("a vault needs at least a password or a keyfile")]
    MissingCredential,

    /// Underlying I/O failure inside the vault library.
    #[error("vault i/o error: {0}")]
    Io(#[from] std::io::Error),
}
