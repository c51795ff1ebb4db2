// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for kms.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of being silently ignored. Path values are
//! templates: the single `{}` is replaced by a database name or, for
//! `encryption.path`, by the derived secure directory name.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Placeholder substituted in path templates and the keyfile content.
pub const SLOT: &str = "{}";

/// Top-level kms configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KmsConfig {
    /// Vault database location.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Keyfile location and content template.
    #[serde(default)]
    pub keyfile: KeyfileConfig,

    /// Where the effective configuration is persisted.
    #[serde(default)]
    pub config: ConfigFileConfig,

    /// Secure directory and key material settings.
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Password acceptance rules.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Process trust settings.
    #[serde(default)]
    pub trust: TrustConfig,
}

impl KmsConfig {
    /// Vault database path for the given database name.
    pub fn database_path(&self, name: &str) -> PathBuf {
        expand_home(&fill_slot(&self.database.path, name))
    }

    /// Configured keyfile path for the given database name, if one is set.
    ///
    /// `None` means the keyfile lives in the secure directory.
    pub fn keyfile_path(&self, name: &str) -> Option<PathBuf> {
        self.keyfile
            .path
            .as_deref()
            .map(|template| expand_home(&fill_slot(template, name)))
    }

    /// Path of the persisted configuration file.
    pub fn config_path(&self) -> PathBuf {
        expand_home(&self.config.path)
    }
}

/// Vault database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path template for the vault file.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "~/.local/share/kms/{}.kdbx".to_string()
}

/// Keyfile configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeyfileConfig {
    /// Optional path template. Unset places the keyfile in the secure directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Plaintext template with one `{}` slot for the generated secret.
    #[serde(default = "default_keyfile_content")]
    pub content: String,
}

impl Default for KeyfileConfig {
    fn default() -> Self {
        Self {
            path: None,
            content: default_keyfile_content(),
        }
    }
}

fn default_keyfile_content() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="utf-8"?>"#,
        "<KeyFile><Meta><Version>2.0</Version></Meta>",
        "<Key><Data>{}</Data></Key></KeyFile>"
    )
    .to_string()
}

/// Location of the persisted configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileConfig {
    #[serde(default = "default_config_path")]
    pub path: String,
}

impl Default for ConfigFileConfig {
    fn default() -> Self {
        Self {
            path: default_config_path(),
        }
    }
}

pub(crate) fn default_config_path() -> String {
    "~/.config/kms/kms.toml".to_string()
}

/// Secure directory and key material configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionConfig {
    /// Path template for the secure root; `{}` receives the derived name.
    #[serde(default = "default_encryption_path")]
    pub path: String,

    /// Application identifier the secure layout is derived from.
    #[serde(default = "default_identifier")]
    pub identifier: String,

    /// RSA modulus size in bits.
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,

    /// Remove artifacts written by a provisioning run that fails part way.
    #[serde(default)]
    pub cleanup_on_failure: bool,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            path: default_encryption_path(),
            identifier: default_identifier(),
            key_bits: default_key_bits(),
            cleanup_on_failure: false,
        }
    }
}

fn default_encryption_path() -> String {
    "~/.local/share/kms/.{}".to_string()
}

fn default_identifier() -> String {
    "kms".to_string()
}

fn default_key_bits() -> usize {
    4096
}

/// Rule sections.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    #[serde(default)]
    pub password: PasswordRulesConfig,
}

/// Password policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordRulesConfig {
    /// Minimum number of characters.
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    /// Character classes (regex class bodies such as `A-Z`), one of each required.
    #[serde(default = "default_characters")]
    pub characters: Vec<String>,
}

impl Default for PasswordRulesConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            characters: default_characters(),
        }
    }
}

fn default_min_length() -> usize {
    8
}

fn default_characters() -> Vec<String> {
    vec!["A-Z".to_string(), "a-z".to_string(), "0-9".to_string()]
}

/// Process trust configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrustConfig {
    /// File listing recognized interactive shells, one per line.
    #[serde(default = "default_shells_path")]
    pub shells_path: String,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            shells_path: default_shells_path(),
        }
    }
}

fn default_shells_path() -> String {
    "/etc/shells".to_string()
}

/// Replace the first `{}` in `template` with `value`.
pub fn fill_slot(template: &str, value: &str) -> String {
    template.replacen(SLOT, value, 1)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}
