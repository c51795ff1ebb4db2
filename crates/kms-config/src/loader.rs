// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. The config file (`--config`, else `~/.config/kms/kms.toml`)
//! 3. `KMS_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use tracing::info;

use crate::model::{KmsConfig, default_config_path, expand_home};

/// Sections addressable through `KMS_<SECTION>_<KEY>` variables, longest first.
const ENV_SECTIONS: &[(&str, &str)] = &[
    ("rules_password_", "rules.password."),
    ("encryption_", "encryption."),
    ("database_", "database."),
    ("keyfile_", "keyfile."),
    ("config_", "config."),
    ("trust_", "trust."),
];

/// Default location of the config file when `--config` is not given.
pub fn default_config_file() -> PathBuf {
    expand_home(&default_config_path())
}

/// Load configuration from `path` (or the default file) with env var overrides.
///
/// A missing file is not an error; defaults apply.
pub fn load_config(path: Option<&Path>) -> Result<KmsConfig, figment::Error> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_file);
    build_figment(&path).extract()
}

/// Load configuration from a TOML string only (no file, no environment).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<KmsConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KmsConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(KmsConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
}

/// Persist the effective configuration as TOML, creating parent directories.
pub fn write_config(config: &KmsConfig, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = toml::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(path, rendered)?;
    info!(path = %path.display(), "configuration written");
    Ok(())
}

/// Environment provider mapping `KMS_ENCRYPTION_KEY_BITS` to `encryption.key_bits`.
///
/// Uses an explicit section table rather than `Env::split("_")` because key
/// names themselves contain underscores. Variables outside the known sections
/// (`KMS_KEY_ID` and friends belong to other tools) are ignored.
fn env_provider() -> Env {
    Env::prefixed("KMS_")
        .filter(|key| map_env_key(key.as_str()).is_some())
        .map(|key| {
            map_env_key(key.as_str())
                .unwrap_or_else(|| key.as_str().to_string())
                .into()
        })
}

fn map_env_key(key: &str) -> Option<String> {
    ENV_SECTIONS.iter().find_map(|(prefix, section)| {
        key.strip_prefix(prefix)
            .filter(|field| !field.is_empty())
            .map(|field| format!("{section}{field}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("database_path").as_deref(), Some("database.path"));
        assert_eq!(
            map_env_key("encryption_key_bits").as_deref(),
            Some("encryption.key_bits")
        );
        assert_eq!(
            map_env_key("encryption_cleanup_on_failure").as_deref(),
            Some("encryption.cleanup_on_failure")
        );
        assert_eq!(
            map_env_key("rules_password_min_length").as_deref(),
            Some("rules.password.min_length")
        );
        assert_eq!(
            map_env_key("trust_shells_path").as_deref(),
            Some("trust.shells_path")
        );
    }

    #[test]
    fn foreign_env_keys_are_not_mapped() {
        assert_eq!(map_env_key("key_id"), None);
        assert_eq!(map_env_key("region"), None);
        assert_eq!(map_env_key("database_"), None);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.encryption.key_bits, 4096);
        assert_eq!(config.encryption.identifier, "kms");
    }

    #[test]
    fn written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/kms.toml");

        let mut config = KmsConfig::default();
        config.database.path = "/srv/vaults/{}.kdbx".into();
        config.rules.password.min_length = 12;
        write_config(&config, &path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.database.path, "/srv/vaults/{}.kdbx");
        assert_eq!(loaded.rules.password.min_length, 12);
        assert!(loaded.keyfile.path.is_none());
    }
}
