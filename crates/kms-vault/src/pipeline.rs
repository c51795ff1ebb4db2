// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end provisioning: trust, credentials, layout, key material, vault.
//!
//! Writes are sequenced: secure directory, keypair, keyfile, vault. Every
//! failure aborts the command at the step where it happened.

use std::path::{Path, PathBuf};

use kms_config::KmsConfig;
use kms_core::{Credentials, KmsError, ProvisioningCredentials, VaultError};
use tracing::{debug, info};

use crate::gateway::{KeyfileCredential, VaultGateway};
use crate::keyfile::KeyMaterialProvisioner;
use crate::paths::{PathDeriver, SecurePathSet};
use crate::policy::PasswordPolicy;
use crate::prompt::PromptSurface;
use crate::resolver::CredentialResolver;
use crate::trust::{self, ProcessProbe, ShellRegistry, TrustDecision};

/// Per-invocation overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Database name; defaults to the application identifier.
    pub name: Option<String>,
    pub database: Option<PathBuf>,
    pub keyfile: Option<PathBuf>,
}

/// What a successful `init` produced.
#[derive(Debug, Clone)]
pub struct InitReport {
    pub vault: ProvisioningCredentials,
    pub layout: SecurePathSet,
    /// Whether the caller was trusted by process identity.
    pub trusted: bool,
    /// Set when the effective configuration was persisted by this run.
    pub config_written: Option<PathBuf>,
}

/// The provisioning pipeline wired to its collaborators.
pub struct Pipeline<'a> {
    config: &'a KmsConfig,
    probe: &'a dyn ProcessProbe,
    shells: &'a dyn ShellRegistry,
    gateway: &'a dyn VaultGateway,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a KmsConfig,
        probe: &'a dyn ProcessProbe,
        shells: &'a dyn ShellRegistry,
        gateway: &'a dyn VaultGateway,
    ) -> Self {
        Self {
            config,
            probe,
            shells,
            gateway,
        }
    }

    fn deriver(&self) -> PathDeriver {
        PathDeriver::from_config(self.config)
    }

    fn provisioner(&self) -> KeyMaterialProvisioner {
        KeyMaterialProvisioner::from_config(self.config)
    }

    /// Derived layout and vault locations for a request. Touches no files.
    pub fn locate(&self, request: &Request) -> (SecurePathSet, ProvisioningCredentials) {
        let layout = self.deriver().derive(&self.config.encryption.identifier);
        let vault = provisioning_credentials(self.config, request, &layout);
        (layout, vault)
    }

    /// Provision a new vault.
    pub fn init(
        &self,
        request: &Request,
        surface: &mut dyn PromptSurface,
    ) -> Result<InitReport, KmsError> {
        let (_, vault) = self.locate(request);
        if vault.database_path.exists() {
            return Err(VaultError::AlreadyExists {
                path: vault.database_path.clone(),
            }
            .into());
        }

        let credentials = self.authenticate(&vault.keyfile_path, surface)?;
        let trusted = matches!(credentials, Credentials::ProcessTrusted(_));

        let layout = self.deriver().prepare(&self.config.encryption.identifier)?;
        let provisioner = self.provisioner();
        provisioner.provision(&layout, &vault.keyfile_path, &self.config.keyfile.content)?;

        let keyfile = KeyfileCredential {
            path: vault.keyfile_path.clone(),
            secret: provisioner.recover(&layout, &vault.keyfile_path)?,
        };
        self.gateway
            .create(&vault.database_path, credentials.password(), Some(&keyfile))?;

        let config_written = self.persist_config()?;
        info!(
            name = %vault.name,
            database = %vault.database_path.display(),
            trusted,
            "vault provisioned"
        );
        Ok(InitReport {
            vault,
            layout,
            trusted,
            config_written,
        })
    }

    /// Replace the keypair and re-encrypt the keyfile of an existing vault.
    ///
    /// The caller is classified and, from a shell, prompted exactly as for
    /// `init` before any key material is touched.
    pub fn rotate(
        &self,
        request: &Request,
        surface: &mut dyn PromptSurface,
    ) -> Result<ProvisioningCredentials, KmsError> {
        let (layout, vault) = self.locate(request);
        if !layout.root_dir.is_dir() {
            return Err(KmsError::io(
                "open secure directory",
                &layout.root_dir,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }
        self.authenticate(&vault.keyfile_path, surface)?;
        self.provisioner().rotate(&layout, &vault.keyfile_path)?;
        Ok(vault)
    }

    /// Classify the caller and collect confirmed credentials when it is interactive.
    fn authenticate(
        &self,
        keyfile_path: &Path,
        surface: &mut dyn PromptSurface,
    ) -> Result<Credentials, KmsError> {
        let user = self.probe.login_user()?;
        let parent = self.probe.parent_process_name()?;
        let credentials = match trust::classify(&user, &parent, self.shells, keyfile_path)? {
            TrustDecision::ProcessTrusted(process) => Credentials::ProcessTrusted(process),
            TrustDecision::Interactive => {
                let policy = PasswordPolicy::from_config(&self.config.rules.password)?;
                CredentialResolver::new(user, policy).resolve(surface)?
            }
        };
        if !credentials.is_valid() {
            return Err(KmsError::Unauthorized(format!(
                "{} credentials were not confirmed",
                credentials.kind()
            )));
        }
        debug!(kind = credentials.kind(), "credentials resolved");
        Ok(credentials)
    }

    /// Write the effective configuration unless a file already exists there.
    fn persist_config(&self) -> Result<Option<PathBuf>, KmsError> {
        let path = self.config.config_path();
        if path.exists() {
            debug!(path = %path.display(), "configuration file already present");
            return Ok(None);
        }
        kms_config::write_config(self.config, &path)
            .map_err(|e| KmsError::io("write configuration", &path, e))?;
        Ok(Some(path))
    }
}

/// Resolve the vault name and paths, command-line overrides first.
///
/// Without a configured `keyfile.path` the keyfile lives in the secure root.
pub fn provisioning_credentials(
    config: &KmsConfig,
    request: &Request,
    layout: &SecurePathSet,
) -> ProvisioningCredentials {
    let name = request
        .name
        .clone()
        .unwrap_or_else(|| config.encryption.identifier.clone());
    let database_path = request
        .database
        .clone()
        .unwrap_or_else(|| config.database_path(&name));
    let keyfile_path = request
        .keyfile
        .clone()
        .unwrap_or_else(|| keyfile_location(config, &name, layout));
    ProvisioningCredentials {
        name,
        database_path,
        keyfile_path,
    }
}

/// Keyfile path for `name` under `layout`, honoring the configured template.
pub fn keyfile_location(config: &KmsConfig, name: &str, layout: &SecurePathSet) -> PathBuf {
    config
        .keyfile_path(name)
        .unwrap_or_else(|| layout.keyfile_for(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> KmsConfig {
        let mut config = KmsConfig::default();
        config.database.path = format!("{}/db/{{}}.kdbx", dir.display());
        config.encryption.path = format!("{}/.{{}}", dir.display());
        config
    }

    #[test]
    fn keyfile_defaults_to_secure_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let layout = PathDeriver::from_config(&config).derive("kms");

        let vault = provisioning_credentials(&config, &Request::default(), &layout);
        assert_eq!(vault.name, "kms");
        assert_eq!(vault.keyfile_path, layout.root_dir.join("kms.keyx"));
        assert_eq!(vault.database_path, dir.path().join("db/kms.kdbx"));
    }

    #[test]
    fn configured_keyfile_template_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.keyfile.path = Some(format!("{}/keys/{{}}.keyx", dir.path().display()));
        let layout = PathDeriver::from_config(&config).derive("kms");

        let request = Request {
            name: Some("payroll".into()),
            ..Request::default()
        };
        let vault = provisioning_credentials(&config, &request, &layout);
        assert_eq!(vault.keyfile_path, dir.path().join("keys/payroll.keyx"));
        assert_eq!(
            keyfile_location(&config, "payroll", &layout),
            vault.keyfile_path
        );
    }

    #[test]
    fn command_line_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let layout = PathDeriver::from_config(&config).derive("kms");
        let request = Request {
            name: Some("ops".into()),
            database: Some(PathBuf::from("/elsewhere/ops.kdbx")),
            keyfile: Some(PathBuf::from("/elsewhere/ops.keyx")),
        };

        let vault = provisioning_credentials(&config, &request, &layout);
        assert_eq!(vault.database_path, PathBuf::from("/elsewhere/ops.kdbx"));
        assert_eq!(vault.keyfile_path, PathBuf::from("/elsewhere/ops.keyx"));
    }
}
