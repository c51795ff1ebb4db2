// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential values produced by the trust and resolution stages.
//!
//! Every variant is built once and never mutated. The only state change an
//! interactive credential undergoes is the consuming [`InteractiveCredentials::confirm`]
//! transition.

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::KmsError;

/// Credentials handed from the resolution stage to provisioning.
#[derive(Debug)]
pub enum Credentials {
    /// A human supplied a user name and a password at the terminal.
    Interactive(InteractiveCredentials),
    /// The calling process is trusted by identity; no prompt took place.
    ProcessTrusted(ProcessCredentials),
    /// Names and locations of the vault being provisioned.
    Provisioning(ProvisioningCredentials),
}

impl Credentials {
    /// Whether these credentials may be passed on to the vault layer.
    ///
    /// Interactive credentials are only valid after confirmation.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Interactive(creds) => creds.is_confirmed(),
            Self::ProcessTrusted(_) | Self::Provisioning(_) => true,
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Interactive(_) => "interactive",
            Self::ProcessTrusted(_) => "process-trusted",
            Self::Provisioning(_) => "provisioning",
        }
    }

    /// The password carried by confirmed interactive credentials.
    pub fn password(&self) -> Option<&SecretString> {
        match self {
            Self::Interactive(creds) if creds.is_confirmed() => Some(creds.password()),
            _ => None,
        }
    }
}

/// A user name and password gathered at the terminal.
///
/// The password is held as a [`SecretString`] and never shows up in `Debug`
/// output.
#[derive(Debug)]
pub struct InteractiveCredentials {
    user: String,
    password: SecretString,
    confirmed: bool,
}

impl InteractiveCredentials {
    /// Create unconfirmed credentials.
    pub fn new(user: impl Into<String>, password: SecretString) -> Self {
        Self {
            user: user.into(),
            password,
            confirmed: false,
        }
    }

    /// Confirm the password against a second entry.
    ///
    /// The comparison is byte-for-byte. On mismatch the credentials are
    /// consumed and a `PolicyViolation("confirmation mismatch")` is returned.
    pub fn confirm(self, confirmation: &SecretString) -> Result<Self, KmsError> {
        if self.password.expose_secret().as_bytes() != confirmation.expose_secret().as_bytes() {
            return Err(KmsError::PolicyViolation("confirmation mismatch".to_string()));
        }
        debug!(user = %self.user, "password confirmed");
        Ok(Self {
            confirmed: true,
            ..self
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }
}

/// Identity of a trusted, non-shell caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCredentials {
    /// Login name of the OS user running the process.
    pub os_user: String,
    /// Name of the parent process that invoked kms.
    pub process_name: String,
    /// Keyfile the trusted caller will unlock the vault with.
    pub keyfile_path: PathBuf,
}

/// The vault being provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningCredentials {
    /// Database name, substituted into the configured path templates.
    pub name: String,
    pub database_path: PathBuf,
    pub keyfile_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn new_interactive_credentials_are_unconfirmed() {
        let creds = InteractiveCredentials::new("alice", secret("Secret123!"));
        assert!(!creds.is_confirmed());
        assert!(!Credentials::Interactive(creds).is_valid());
    }

    #[test]
    fn matching_confirmation_confirms() {
        let creds = InteractiveCredentials::new("alice", secret("Secret123!"))
            .confirm(&secret("Secret123!"))
            .unwrap();
        assert!(creds.is_confirmed());
        assert_eq!(creds.user(), "alice");
        assert_eq!(creds.password().expose_secret(), "Secret123!");
    }

    #[test]
    fn mismatched_confirmation_is_a_policy_violation() {
        let err = InteractiveCredentials::new("alice", secret("Secret123!"))
            .confirm(&secret("Secret124!"))
            .unwrap_err();
        match err {
            KmsError::PolicyViolation(msg) => assert_eq!(msg, "confirmation mismatch"),
            other => panic!("expected PolicyViolation, got: {other:?}"),
        }
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = InteractiveCredentials::new("alice", secret("hunter2-hunter2"));
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn password_only_exposed_once_confirmed() {
        let unconfirmed =
            Credentials::Interactive(InteractiveCredentials::new("bob", secret("pw")));
        assert!(unconfirmed.password().is_none());

        let confirmed = Credentials::Interactive(
            InteractiveCredentials::new("bob", secret("pw"))
                .confirm(&secret("pw"))
                .unwrap(),
        );
        assert_eq!(confirmed.password().unwrap().expose_secret(), "pw");
    }

    #[test]
    fn process_and_provisioning_credentials_are_valid() {
        let process = Credentials::ProcessTrusted(ProcessCredentials {
            os_user: "alice".into(),
            process_name: "cron".into(),
            keyfile_path: PathBuf::from("/tmp/kms.keyx"),
        });
        assert!(process.is_valid());
        assert!(process.password().is_none());
        assert_eq!(process.kind(), "process-trusted");
    }

    proptest! {
        #[test]
        fn confirmation_rejects_any_different_value(
            password in ".{1,32}",
            confirm in ".{1,32}",
        ) {
            prop_assume!(password != confirm);
            let result = InteractiveCredentials::new("alice", secret(&password))
                .confirm(&secret(&confirm));
            prop_assert!(matches!(result, Err(KmsError::PolicyViolation(_))));
        }
    }
}
