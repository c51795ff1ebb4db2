// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types for the kms credential provisioner.
//!
//! This crate holds the error taxonomy shared by every stage of the
//! pipeline and the closed set of credential variants that flow between
//! trust classification, interactive resolution and key provisioning.

pub mod credentials;
pub mod error;

// Re-export key items at crate root for ergonomic imports.
pub use credentials::{
    Credentials, InteractiveCredentials, ProcessCredentials, ProvisioningCredentials,
};
pub use error::{KmsError, VaultError};
