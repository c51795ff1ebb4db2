// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential resolution and key provisioning for a secret vault.
//!
//! The pipeline decides whether the calling process is trusted, gathers and
//! validates a password when it is not, derives a deterministic secure
//! directory, writes an RSA keypair there and protects the vault keyfile by
//! encrypting it under the public key. The plaintext keyfile never touches
//! the disk.

pub mod crypto;
pub mod gateway;
pub mod keyfile;
pub mod paths;
pub mod pipeline;
pub mod policy;
pub mod prompt;
pub mod resolver;
pub mod trust;

pub use gateway::{KeyfileCredential, LocalVault, VaultGateway, VaultHandle};
pub use keyfile::KeyMaterialProvisioner;
pub use paths::{PathDeriver, SecurePathSet};
pub use pipeline::{InitReport, Pipeline, Request};
pub use policy::{PasswordPolicy, PasswordPolicyRule};
pub use prompt::{Prompt, PromptKind, PromptSurface, TerminalSurface};
pub use resolver::{CredentialResolver, ResolverState};
pub use trust::{EtcShells, ProcessProbe, ShellRegistry, SystemProbe, TrustDecision, classify};
