// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for kms.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! `KMS_*` environment overrides and miette diagnostics with typo suggestions.
//! The configuration is built once per command and never mutated afterwards.
//!
//! # Usage
//!
//! ```no_run
//! use kms_config::load_and_validate;
//!
//! let config = load_and_validate(None).expect("config errors");
//! println!("vault template: {}", config.database.path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{default_config_file, load_config, load_config_from_str, write_config};
pub use model::KmsConfig;

/// Load configuration from `path` (or the default file) and validate it.
///
/// On failure returns every diagnostic found, ready for [`render_errors`].
pub fn load_and_validate(path: Option<&Path>) -> Result<KmsConfig, Vec<ConfigError>> {
    let file = path
        .map(Path::to_path_buf)
        .unwrap_or_else(loader::default_config_file);

    match loader::load_config(Some(&file)) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = std::fs::read_to_string(&file)
                .map(|content| vec![(file.display().to_string(), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<KmsConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}
