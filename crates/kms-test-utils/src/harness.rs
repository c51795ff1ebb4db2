// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end provisioning tests.
//!
//! `TestHarness` owns a temporary directory and a configuration whose
//! database, secure root and config file paths all point into it, so a test
//! can run the whole pipeline without touching the real home directory.

use std::path::{Path, PathBuf};

use kms_config::KmsConfig;
use kms_vault::paths::{PathDeriver, SecurePathSet};
use tempfile::TempDir;

/// Smallest modulus the provisioner accepts; keeps key generation fast.
pub const TEST_KEY_BITS: usize = 3072;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    key_bits: usize,
    content: Option<String>,
    keyfile_template: Option<String>,
    cleanup_on_failure: bool,
    min_length: Option<usize>,
    characters: Option<Vec<String>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            key_bits: TEST_KEY_BITS,
            content: None,
            keyfile_template: None,
            cleanup_on_failure: false,
            min_length: None,
            characters: None,
        }
    }

    /// Set the keyfile content template.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Place keyfiles under `<tmp>/<relative>` instead of the secure root.
    pub fn with_keyfile_template(mut self, relative: impl Into<String>) -> Self {
        self.keyfile_template = Some(relative.into());
        self
    }

    pub fn with_cleanup(mut self, enabled: bool) -> Self {
        self.cleanup_on_failure = enabled;
        self
    }

    pub fn with_password_rules(mut self, min_length: usize, characters: &[&str]) -> Self {
        self.min_length = Some(min_length);
        self.characters = Some(characters.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Create the temporary directory and the matching configuration.
    pub fn build(self) -> std::io::Result<TestHarness> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().display().to_string();

        let mut config = KmsConfig::default();
        config.database.path = format!("{root}/vaults/{{}}.kdbx");
        config.config.path = format!("{root}/config/kms.toml");
        config.encryption.path = format!("{root}/secure/.{{}}");
        config.encryption.key_bits = self.key_bits;
        config.encryption.cleanup_on_failure = self.cleanup_on_failure;
        config.trust.shells_path = format!("{root}/shells");
        config.keyfile.path = self
            .keyfile_template
            .map(|relative| format!("{root}/{relative}"));
        if let Some(content) = self.content {
            config.keyfile.content = content;
        }
        if let Some(min_length) = self.min_length {
            config.rules.password.min_length = min_length;
        }
        if let Some(characters) = self.characters {
            config.rules.password.characters = characters;
        }

        tracing::debug!(root = %root, "test harness ready");
        Ok(TestHarness { dir, config })
    }
}

/// A temporary kms installation.
pub struct TestHarness {
    dir: TempDir,
    pub config: KmsConfig,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The secure layout the configuration derives.
    pub fn layout(&self) -> SecurePathSet {
        PathDeriver::from_config(&self.config).derive(&self.config.encryption.identifier)
    }

    pub fn database_path(&self, name: &str) -> PathBuf {
        self.config.database_path(name)
    }

    /// Write a shells file at the configured `trust.shells_path`.
    pub fn write_shells(&self, shells: &[&str]) -> std::io::Result<PathBuf> {
        let path = PathBuf::from(&self.config.trust.shells_path);
        std::fs::write(&path, shells.join("\n"))?;
        Ok(path)
    }
}
