// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic secure directory layout derived from an application identifier.
//!
//! A SHAKE256 state is seeded with the identifier and read three times: once
//! as-is for the directory name, then after absorbing `"encrypt"` for the
//! public key file, then after additionally absorbing `"decrypt"` for the
//! private key file. The same identifier therefore always maps to the same
//! three paths, so later runs find material written by earlier ones.
//!
//! This is obfuscation, not a security boundary. The names only avoid
//! well-known locations; anyone able to list the filesystem can find the
//! files, and the private key sits next to the material it protects.

use std::path::{Path, PathBuf};

use kms_config::KmsConfig;
use kms_core::KmsError;
use sha3::Shake256;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use tracing::debug;

/// Bytes of digest output used for the directory name.
const ROOT_LEN: usize = 16;

/// Bytes of digest output used for each key file name.
const KEY_LEN: usize = 10;

const PUBLIC_LABEL: &[u8] = b"encrypt";
const PRIVATE_LABEL: &[u8] = b"decrypt";

/// Locations of the key material for one application identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurePathSet {
    pub root_dir: PathBuf,
    pub public_key_path: PathBuf,
    pub private_key_path: PathBuf,
}

impl SecurePathSet {
    /// Default keyfile location for a database inside the secure directory.
    pub fn keyfile_for(&self, name: &str) -> PathBuf {
        self.root_dir.join(format!("{name}.keyx"))
    }

    /// Create the secure directory if it does not exist yet.
    pub fn create_dirs(&self) -> Result<(), KmsError> {
        create_private_dir(&self.root_dir)
    }
}

/// Derives [`SecurePathSet`]s under a root path template.
#[derive(Debug, Clone)]
pub struct PathDeriver {
    /// Template whose `{}` receives the derived directory name.
    root_template: String,
}

impl PathDeriver {
    pub fn new(root_template: impl Into<String>) -> Self {
        Self {
            root_template: root_template.into(),
        }
    }

    /// Deriver for the configured `encryption.path`.
    pub fn from_config(config: &KmsConfig) -> Self {
        Self::new(config.encryption.path.clone())
    }

    /// Compute the layout for `identifier`. Pure; touches no files.
    pub fn derive(&self, identifier: &str) -> SecurePathSet {
        let mut state = Shake256::default();
        state.update(identifier.as_bytes());
        let root_name = read_hex(&state, ROOT_LEN);

        state.update(PUBLIC_LABEL);
        let public_name = read_hex(&state, KEY_LEN);

        state.update(PRIVATE_LABEL);
        let private_name = read_hex(&state, KEY_LEN);

        let root_dir = kms_config::model::expand_home(&kms_config::model::fill_slot(
            &self.root_template,
            &root_name,
        ));
        debug!(identifier, root = %root_dir.display(), "derived secure layout");

        SecurePathSet {
            public_key_path: root_dir.join(format!(".{public_name}")),
            private_key_path: root_dir.join(format!(".{private_name}")),
            root_dir,
        }
    }

    /// Derive the layout and create the secure directory. Idempotent.
    pub fn prepare(&self, identifier: &str) -> Result<SecurePathSet, KmsError> {
        let paths = self.derive(identifier);
        paths.create_dirs()?;
        Ok(paths)
    }
}

/// Read `len` bytes from a snapshot of the XOF state, hex encoded.
fn read_hex(state: &Shake256, len: usize) -> String {
    let mut out = vec![0u8; len];
    state.clone().finalize_xof().read(&mut out);
    hex::encode(out)
}

/// `create_dir_all`, restricted to the owner on Unix.
pub(crate) fn create_private_dir(dir: &Path) -> Result<(), KmsError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)
            .map_err(|e| KmsError::io("create directory", dir, e))
    }
    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir).map_err(|e| KmsError::io("create directory", dir, e))
    }
}
