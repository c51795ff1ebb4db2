// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: every path template carries its
//! `{}` slot, the keyfile template has exactly one and fits in a single RSA
//! block once the secret is substituted, the RSA modulus is large enough and
//! every character class compiles.

use crate::diagnostic::ConfigError;
use crate::model::{KmsConfig, SLOT};

/// Smallest RSA modulus accepted for key material.
pub const MIN_KEY_BITS: usize = 3072;

/// Largest RSA modulus accepted; generation above this takes minutes.
pub const MAX_KEY_BITS: usize = 16384;

/// Length of the hex-encoded SHA3-512 secret substituted into the keyfile.
pub const SECRET_HEX_LEN: usize = 128;

/// Bytes of OAEP(SHA-256) overhead: two digests plus two marker bytes.
pub const OAEP_OVERHEAD: usize = 2 * 32 + 2;

/// Largest keyfile plaintext a `key_bits` modulus can seal in one block.
pub fn sealable_len(key_bits: usize) -> usize {
    (key_bits / 8).saturating_sub(OAEP_OVERHEAD)
}

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &KmsConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    require_slot(&mut errors, "database.path", &config.database.path);
    require_slot(&mut errors, "encryption.path", &config.encryption.path);
    if let Some(path) = &config.keyfile.path {
        require_slot(&mut errors, "keyfile.path", path);
    }

    if config.config.path.trim().is_empty() {
        errors.push(ConfigError::validation("config.path", "must not be empty"));
    }

    let slots = config.keyfile.content.matches(SLOT).count();
    if slots != 1 {
        errors.push(ConfigError::validation(
            "keyfile.content",
            format!("must contain exactly one `{{}}` slot, found {slots}"),
        ));
    }

    if config.encryption.identifier.trim().is_empty() {
        errors.push(ConfigError::validation(
            "encryption.identifier",
            "must not be empty",
        ));
    }

    let bits = config.encryption.key_bits;
    let bits_valid = (MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bits) && bits % 8 == 0;
    if !bits_valid {
        errors.push(ConfigError::validation(
            "encryption.key_bits",
            format!(
                "must be a multiple of 8 between {MIN_KEY_BITS} and {MAX_KEY_BITS}, got {bits}"
            ),
        ));
    }

    if slots == 1 && bits_valid {
        let plaintext = config.keyfile.content.len() - SLOT.len() + SECRET_HEX_LEN;
        let limit = sealable_len(bits);
        if plaintext > limit {
            errors.push(ConfigError::validation(
                "keyfile.content",
                format!(
                    "expands to {plaintext} bytes with the secret but a {bits}-bit key can seal at most {limit}"
                ),
            ));
        }
    }

    if config.rules.password.min_length == 0 {
        errors.push(ConfigError::validation(
            "rules.password.min_length",
            "must be at least 1",
        ));
    }

    for (i, class) in config.rules.password.characters.iter().enumerate() {
        let key = format!("rules.password.characters[{i}]");
        if class.is_empty() {
            errors.push(ConfigError::validation(&key, "must not be empty"));
        } else if let Err(e) = regex::Regex::new(&format!("[{class}]")) {
            errors.push(ConfigError::validation(
                &key,
                format!("`{class}` is not a valid character class: {e}"),
            ));
        }
    }

    if config.trust.shells_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "trust.shells_path",
            "must not be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn require_slot(errors: &mut Vec<ConfigError>, key: &str, template: &str) {
    if !template.contains(SLOT) {
        errors.push(ConfigError::validation(
            key,
            format!("`{template}` has no `{{}}` placeholder"),
        ));
    }
}
