// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keypair and protected keyfile provisioning.
//!
//! The keyfile on disk is the RSA-OAEP ciphertext of the content template
//! with a fresh secret substituted in. Only the private key stored in the
//! secure directory can turn it back into the plaintext the vault expects.
//! This keeps the secret away from casual inspection; it does not survive
//! a full filesystem compromise since both halves live side by side.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use kms_config::KmsConfig;
use kms_config::model::{SLOT, fill_slot};
use kms_config::validation::MIN_KEY_BITS;
use kms_core::KmsError;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{self, KeyPair};
use crate::paths::SecurePathSet;

const PRIVATE_KEY_MODE: u32 = 0o600;
const PUBLIC_KEY_MODE: u32 = 0o644;
const KEYFILE_MODE: u32 = 0o600;

/// Generates key material and writes the protected keyfile.
#[derive(Debug, Clone)]
pub struct KeyMaterialProvisioner {
    key_bits: usize,
    cleanup_on_failure: bool,
}

impl KeyMaterialProvisioner {
    pub fn new(key_bits: usize) -> Self {
        Self {
            key_bits,
            cleanup_on_failure: false,
        }
    }

    /// Remove files written by a call that fails part way.
    pub fn with_cleanup(mut self, enabled: bool) -> Self {
        self.cleanup_on_failure = enabled;
        self
    }

    pub fn from_config(config: &KmsConfig) -> Self {
        Self::new(config.encryption.key_bits).with_cleanup(config.encryption.cleanup_on_failure)
    }

    /// Provision key material and write the encrypted keyfile.
    ///
    /// Steps run in a fixed order: keys are on disk before anything is
    /// encrypted, and the keyfile is written last. An existing keypair is
    /// reused; an existing keyfile is never overwritten.
    pub fn provision(
        &self,
        paths: &SecurePathSet,
        keyfile_path: &Path,
        template: &str,
    ) -> Result<(), KmsError> {
        let mut written = Vec::new();
        let result = self.provision_into(paths, keyfile_path, template, &mut written);
        if result.is_err() && self.cleanup_on_failure {
            remove_artifacts(&written);
        }
        result
    }

    fn provision_into(
        &self,
        paths: &SecurePathSet,
        keyfile_path: &Path,
        template: &str,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), KmsError> {
        check_template(template)?;
        if keyfile_path.exists() {
            return Err(KmsError::io(
                "write keyfile",
                keyfile_path,
                std::io::Error::new(ErrorKind::AlreadyExists, "keyfile already exists"),
            ));
        }

        let pair = match load_keypair(paths)? {
            Some(pair) => {
                info!(root = %paths.root_dir.display(), "reusing existing key material");
                pair
            }
            None => {
                let pair = self.generate()?;
                write_new(&paths.private_key_path, pair.private_pem()?.as_bytes(), PRIVATE_KEY_MODE)?;
                written.push(paths.private_key_path.clone());
                write_new(&paths.public_key_path, pair.public_pem()?.as_bytes(), PUBLIC_KEY_MODE)?;
                written.push(paths.public_key_path.clone());
                info!(
                    public = %paths.public_key_path.display(),
                    private = %paths.private_key_path.display(),
                    "wrote new keypair"
                );
                pair
            }
        };

        let secret = crypto::generate_secret()?;
        let plaintext = Zeroizing::new(fill_slot(template, &secret));
        let ciphertext = crypto::seal(pair.public_key(), plaintext.as_bytes())?;

        if let Some(parent) = keyfile_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| KmsError::io("create directory", parent, e))?;
        }
        write_new(keyfile_path, &ciphertext, KEYFILE_MODE)?;
        written.push(keyfile_path.to_path_buf());
        info!(keyfile = %keyfile_path.display(), bytes = ciphertext.len(), "wrote protected keyfile");
        Ok(())
    }

    /// Decrypt the keyfile with the private key from the secure directory.
    pub fn recover(&self, paths: &SecurePathSet, keyfile_path: &Path) -> Result<SecretString, KmsError> {
        let pem = read_private_key(&paths.private_key_path)?;
        let private = crypto::decode_private_key(&pem)?;
        let ciphertext = std::fs::read(keyfile_path)
            .map_err(|e| KmsError::io("read keyfile", keyfile_path, e))?;
        let plaintext = crypto::open(&private, &ciphertext)?;
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| KmsError::Crypto("keyfile plaintext is not UTF-8".to_string()))?;
        debug!(keyfile = %keyfile_path.display(), "recovered keyfile plaintext");
        Ok(SecretString::from(text.to_string()))
    }

    /// Replace the keypair and re-encrypt the keyfile's current plaintext.
    ///
    /// Each file is swapped in with a rename. The three renames are not one
    /// transaction; a crash between them leaves the old keyfile readable
    /// only with a backup of the old private key.
    pub fn rotate(&self, paths: &SecurePathSet, keyfile_path: &Path) -> Result<(), KmsError> {
        let plaintext = self.recover(paths, keyfile_path)?;
        let pair = self.generate()?;
        let ciphertext = crypto::seal(pair.public_key(), plaintext.expose_secret().as_bytes())?;

        replace_file(&paths.private_key_path, pair.private_pem()?.as_bytes(), PRIVATE_KEY_MODE)?;
        replace_file(&paths.public_key_path, pair.public_pem()?.as_bytes(), PUBLIC_KEY_MODE)?;
        replace_file(keyfile_path, &ciphertext, KEYFILE_MODE)?;
        info!(
            root = %paths.root_dir.display(),
            keyfile = %keyfile_path.display(),
            "rotated key material"
        );
        Ok(())
    }

    fn generate(&self) -> Result<KeyPair, KmsError> {
        if self.key_bits < MIN_KEY_BITS {
            return Err(KmsError::Crypto(format!(
                "RSA-{} is below the {MIN_KEY_BITS}-bit minimum",
                self.key_bits
            )));
        }
        debug!(bits = self.key_bits, "generating RSA keypair");
        KeyPair::generate(self.key_bits)
    }
}

fn check_template(template: &str) -> Result<(), KmsError> {
    let slots = template.matches(SLOT).count();
    if slots != 1 {
        return Err(KmsError::Config(format!(
            "keyfile content template needs exactly one `{{}}` slot, found {slots}"
        )));
    }
    Ok(())
}

/// Load the keypair if both halves exist; `None` if neither does.
fn load_keypair(paths: &SecurePathSet) -> Result<Option<KeyPair>, KmsError> {
    let private = paths.private_key_path.exists();
    let public = paths.public_key_path.exists();
    match (private, public) {
        (false, false) => Ok(None),
        (true, true) => {
            let private_pem = read_private_key(&paths.private_key_path)?;
            let public_pem = std::fs::read_to_string(&paths.public_key_path)
                .map_err(|e| KmsError::io("read public key", &paths.public_key_path, e))?;
            KeyPair::from_pem(&private_pem, &public_pem).map(Some)
        }
        (true, false) => Err(inconsistent(&paths.public_key_path, "public")),
        (false, true) => Err(inconsistent(&paths.private_key_path, "private")),
    }
}

fn inconsistent(missing: &Path, half: &str) -> KmsError {
    KmsError::io(
        "read",
        missing,
        std::io::Error::new(
            ErrorKind::NotFound,
            format!("{half} key missing while its counterpart exists; remove the secure directory to start over"),
        ),
    )
}

fn read_private_key(path: &Path) -> Result<Zeroizing<String>, KmsError> {
    std::fs::read_to_string(path)
        .map(Zeroizing::new)
        .map_err(|e| KmsError::io("read private key", path, e))
}

/// Create `path` exclusively and write `contents`.
fn write_new(path: &Path, contents: &[u8], mode: u32) -> Result<(), KmsError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options
        .open(path)
        .map_err(|e| KmsError::io("create", path, e))?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .map_err(|e| KmsError::io("write", path, e))
}

/// Write `contents` to a sibling temporary file and rename it over `path`.
fn replace_file(path: &Path, contents: &[u8], mode: u32) -> Result<(), KmsError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| KmsError::io("create temporary file in", dir, e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| KmsError::io("write", tmp.path(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(mode))
            .map_err(|e| KmsError::io("set permissions on", tmp.path(), e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist(path)
        .map(|_| ())
        .map_err(|e| KmsError::io("replace", path, e.error))
}

fn remove_artifacts(written: &[PathBuf]) {
    for path in written.iter().rev() {
        match std::fs::remove_file(path) {
            Ok(()) => warn!(path = %path.display(), "removed artifact after failed provisioning"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove artifact"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathDeriver;

    const BITS: usize = 3072;

    fn layout(dir: &tempfile::TempDir) -> SecurePathSet {
        PathDeriver::new(format!("{}/.{{}}", dir.path().display()))
            .prepare("kms")
            .unwrap()
    }

    #[test]
    fn keyfile_decrypts_to_template_with_secret() {
        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        let keyfile = paths.keyfile_for("kms");
        let provisioner = KeyMaterialProvisioner::new(BITS);

        provisioner.provision(&paths, &keyfile, "secret:{}").unwrap();

        let on_disk = std::fs::read(&keyfile).unwrap();
        assert!(!on_disk.starts_with(b"secret:"));

        let plaintext = provisioner.recover(&paths, &keyfile).unwrap();
        let secret = plaintext.expose_secret().strip_prefix("secret:").unwrap();
        assert_eq!(secret.len(), crypto::SECRET_HEX_LEN);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn keys_are_pem_files_in_secure_root() {
        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        KeyMaterialProvisioner::new(BITS)
            .provision(&paths, &paths.keyfile_for("kms"), "{}")
            .unwrap();

        let private = std::fs::read_to_string(&paths.private_key_path).unwrap();
        let public = std::fs::read_to_string(&paths.public_key_path).unwrap();
        assert!(private.contains("BEGIN PRIVATE KEY"));
        assert!(public.contains("BEGIN PUBLIC KEY"));
    }

    #[cfg(unix)]
    #[test]
    fn private_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        KeyMaterialProvisioner::new(BITS)
            .provision(&paths, &paths.keyfile_for("kms"), "{}")
            .unwrap();
        let mode = std::fs::metadata(&paths.private_key_path)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn existing_keypair_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        let provisioner = KeyMaterialProvisioner::new(BITS);

        provisioner.provision(&paths, &paths.keyfile_for("first"), "{}").unwrap();
        let before = std::fs::read(&paths.private_key_path).unwrap();
        provisioner.provision(&paths, &paths.keyfile_for("second"), "{}").unwrap();
        let after = std::fs::read(&paths.private_key_path).unwrap();

        assert_eq!(before, after);
        assert!(provisioner.recover(&paths, &paths.keyfile_for("first")).is_ok());
        assert!(provisioner.recover(&paths, &paths.keyfile_for("second")).is_ok());
    }

    #[test]
    fn existing_keyfile_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        let keyfile = paths.keyfile_for("kms");
        std::fs::write(&keyfile, b"precious").unwrap();

        let err = KeyMaterialProvisioner::new(BITS)
            .provision(&paths, &keyfile, "{}")
            .unwrap_err();
        assert!(matches!(err, KmsError::Io { .. }));
        assert_eq!(std::fs::read(&keyfile).unwrap(), b"precious");
        assert!(!paths.private_key_path.exists());
    }

    #[test]
    fn half_a_keypair_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        std::fs::write(&paths.public_key_path, b"orphan").unwrap();

        let err = KeyMaterialProvisioner::new(BITS)
            .provision(&paths, &paths.keyfile_for("kms"), "{}")
            .unwrap_err();
        assert!(matches!(err, KmsError::Io { .. }), "{err}");
    }

    #[test]
    fn bad_template_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        let err = KeyMaterialProvisioner::new(BITS)
            .provision(&paths, &paths.keyfile_for("kms"), "no slot")
            .unwrap_err();
        assert!(matches!(err, KmsError::Config(_)));
        assert!(!paths.private_key_path.exists());
    }

    #[test]
    fn oversized_template_cleans_up_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        let keyfile = paths.keyfile_for("kms");
        let template = format!("{}{{}}", "x".repeat(400));

        let err = KeyMaterialProvisioner::new(BITS)
            .with_cleanup(true)
            .provision(&paths, &keyfile, &template)
            .unwrap_err();
        assert!(matches!(err, KmsError::Crypto(_)));
        assert!(!paths.private_key_path.exists());
        assert!(!paths.public_key_path.exists());
        assert!(!keyfile.exists());
    }

    #[test]
    fn oversized_template_keeps_keys_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        let template = format!("{}{{}}", "x".repeat(400));

        KeyMaterialProvisioner::new(BITS)
            .provision(&paths, &paths.keyfile_for("kms"), &template)
            .unwrap_err();
        assert!(paths.private_key_path.exists());
        assert!(!paths.keyfile_for("kms").exists());
    }

    #[test]
    fn rotation_changes_keys_and_preserves_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        let keyfile = paths.keyfile_for("kms");
        let provisioner = KeyMaterialProvisioner::new(BITS);
        provisioner.provision(&paths, &keyfile, "secret:{}").unwrap();

        let before_key = std::fs::read(&paths.private_key_path).unwrap();
        let before_plain = provisioner.recover(&paths, &keyfile).unwrap();

        provisioner.rotate(&paths, &keyfile).unwrap();

        assert_ne!(std::fs::read(&paths.private_key_path).unwrap(), before_key);
        let after_plain = provisioner.recover(&paths, &keyfile).unwrap();
        assert_eq!(after_plain.expose_secret(), before_plain.expose_secret());
    }

    #[test]
    fn wrong_private_key_cannot_recover() {
        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        let keyfile = paths.keyfile_for("kms");
        let provisioner = KeyMaterialProvisioner::new(BITS);
        provisioner.provision(&paths, &keyfile, "secret:{}").unwrap();

        let other = KeyPair::generate(BITS).unwrap();
        std::fs::write(&paths.private_key_path, other.private_pem().unwrap().as_bytes()).unwrap();

        let err = provisioner.recover(&paths, &keyfile).unwrap_err();
        assert!(matches!(err, KmsError::Crypto(_)));
    }

    #[test]
    fn undersized_modulus_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = layout(&dir);
        let err = KeyMaterialProvisioner::new(1024)
            .provision(&paths, &paths.keyfile_for("kms"), "{}")
            .unwrap_err();
        assert!(matches!(err, KmsError::Crypto(_)));
    }
}
