// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary to the vault library that owns the encrypted store.
//!
//! The store format is not ours. A gateway receives the resolved password
//! and the *plaintext* keyfile content, never the ciphertext on disk.

use std::path::{Path, PathBuf};

use kms_core::VaultError;
use secrecy::SecretString;
use tracing::info;

/// Keyfile credential handed to the vault: where it lives and what it unlocks with.
#[derive(Debug)]
pub struct KeyfileCredential {
    pub path: PathBuf,
    /// Decrypted keyfile content.
    pub secret: SecretString,
}

/// An opened vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultHandle {
    pub path: PathBuf,
    pub readonly: bool,
}

/// Operations the pipeline needs from a vault library.
pub trait VaultGateway {
    /// Create a new vault. At least one credential must be supplied.
    fn create(
        &self,
        filename: &Path,
        password: Option<&SecretString>,
        keyfile: Option<&KeyfileCredential>,
    ) -> Result<(), VaultError>;

    /// Open an existing vault.
    fn open(
        &self,
        filename: &Path,
        password: Option<&SecretString>,
        keyfile: Option<&KeyfileCredential>,
        readonly: bool,
    ) -> Result<VaultHandle, VaultError>;
}

/// Gateway that prepares the vault location on the local filesystem.
///
/// It reserves the database file and its directory; writing the store
/// itself is left to the vault library that later opens it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalVault;

impl VaultGateway for LocalVault {
    fn create(
        &self,
        filename: &Path,
        password: Option<&SecretString>,
        keyfile: Option<&KeyfileCredential>,
    ) -> Result<(), VaultError> {
        if password.is_none() && keyfile.is_none() {
            return Err(VaultError::MissingCredential);
        }
        if filename.exists() {
            return Err(VaultError::AlreadyExists {
                path: filename.to_path_buf(),
            });
        }
        if let Some(parent) = filename.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(filename)?;
        info!(
            vault = %filename.display(),
            password = password.is_some(),
            keyfile = keyfile.is_some(),
            "created vault"
        );
        Ok(())
    }

    fn open(
        &self,
        filename: &Path,
        password: Option<&SecretString>,
        keyfile: Option<&KeyfileCredential>,
        readonly: bool,
    ) -> Result<VaultHandle, VaultError> {
        if password.is_none() && keyfile.is_none() {
            return Err(VaultError::MissingCredential);
        }
        if !filename.is_file() {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn password() -> SecretString {
        SecretString::from("Secret123!".to_string())
    }

    #[test]
    fn create_reserves_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested/kms.kdbx");

        LocalVault.create(&db, Some(&password()), None).unwrap();
        assert!(db.is_file());
    }

    #[test]
    fn create_refuses_existing_vault() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("kms.kdbx");
        std::fs::write(&db, b"existing").unwrap();

        let err = LocalVault.create(&db, Some(&password()), None).unwrap_err();
        assert!(matches!(err, VaultError::AlreadyExists { .. }));
        assert_eq!(std::fs::read(&db).unwrap(), b"existing");
    }

    #[test]
    fn create_needs_a_credential() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalVault
            .create(&dir.path().join("kms.kdbx"), None, None)
            .unwrap_err();
        assert!(matches!(err, VaultError::MissingCredential));
    }

    #[test]
    fn open_missing_vault_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let keyfile = KeyfileCredential {
            path: dir.path().join("kms.keyx"),
            secret: SecretString::from("plain".to_string()),
        };
        let err = LocalVault
            .open(&dir.path().join("absent.kdbx"), None, Some(&keyfile), true)
            .unwrap_err();
        assert!(matches!(err, VaultError::NotFound { .. }));
    }

    #[test]
    fn open_returns_handle_for_created_vault() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("kms.kdbx");
        LocalVault.create(&db, Some(&password()), None).unwrap();

        let handle = LocalVault.open(&db, Some(&password()), None, false).unwrap();
        assert_eq!(handle, VaultHandle { path: db, readonly: false });
    }
}
