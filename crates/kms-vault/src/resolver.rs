// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interactive credential resolution.
//!
//! Resolution is an explicit state machine:
//!
//! ```text
//! AwaitUser -> ValidateUser -> AwaitPassword -> ValidatePolicy
//!           -> AwaitConfirmation -> Accepted | Rejected
//! ```
//!
//! `Await*` states need an answer from the [`PromptSurface`]; `Validate*`
//! states advance on their own. Any failure moves straight to `Rejected`.
//! There is no retry: a rejected resolution aborts the command.

use kms_core::{Credentials, InteractiveCredentials, KmsError};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::policy::PasswordPolicy;
use crate::prompt::{Prompt, PromptAnswer, PromptKind, PromptSurface};

/// Where a resolution currently stands.
#[derive(Debug)]
pub enum ResolverState {
    AwaitUser,
    ValidateUser(String),
    AwaitPassword { user: String },
    ValidatePolicy { user: String, password: SecretString },
    AwaitConfirmation(InteractiveCredentials),
    Accepted(InteractiveCredentials),
    Rejected(KmsError),
}

impl ResolverState {
    /// The question this state waits on, if any.
    pub fn prompt(&self) -> Option<Prompt> {
        match self {
            Self::AwaitUser => Some(Prompt::new("user", PromptKind::Secret, "User")),
            Self::AwaitPassword { .. } => {
                Some(Prompt::new("password", PromptKind::Password, "Password"))
            }
            Self::AwaitConfirmation(_) => Some(Prompt::new(
                "confirm",
                PromptKind::Password,
                "Confirm password",
            )),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted(_) | Self::Rejected(_))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::AwaitUser => "await-user",
            Self::ValidateUser(_) => "validate-user",
            Self::AwaitPassword { .. } => "await-password",
            Self::ValidatePolicy { .. } => "validate-policy",
            Self::AwaitConfirmation(_) => "await-confirmation",
            Self::Accepted(_) => "accepted",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// Collects and validates a user name and password for the login user.
#[derive(Debug)]
pub struct CredentialResolver {
    os_user: String,
    policy: PasswordPolicy,
}

impl CredentialResolver {
    pub fn new(os_user: impl Into<String>, policy: PasswordPolicy) -> Self {
        Self {
            os_user: os_user.into(),
            policy,
        }
    }

    /// Run the state machine to completion against `surface`.
    pub fn resolve(&self, surface: &mut dyn PromptSurface) -> Result<Credentials, KmsError> {
        let mut state = ResolverState::AwaitUser;
        loop {
            state = match state {
                ResolverState::Accepted(creds) => {
                    info!(user = %creds.user(), "credentials accepted");
                    return Ok(Credentials::Interactive(creds));
                }
                ResolverState::Rejected(err) => return Err(err),
                pending => {
                    let input = match pending.prompt() {
                        Some(prompt) => Some(surface.answer(&prompt)?),
                        None => None,
                    };
                    self.advance(pending, input)
                }
            };
        }
    }

    /// Move one step. `input` must be present exactly when the state has a prompt.
    pub fn advance(&self, state: ResolverState, input: Option<PromptAnswer>) -> ResolverState {
        let from = state.name();
        let next = match (state, input) {
            (ResolverState::AwaitUser, Some(answer)) => {
                ResolverState::ValidateUser(expose_answer(answer))
            }
            (ResolverState::ValidateUser(user), None) => self.validate_user(user),
            (ResolverState::AwaitPassword { user }, Some(answer)) => {
                ResolverState::ValidatePolicy {
                    user,
                    password: secret_answer(answer),
                }
            }
            (ResolverState::ValidatePolicy { user, password }, None) => {
                if password.expose_secret().is_empty() {
                    ResolverState::Rejected(KmsError::Unauthorized("empty password".to_string()))
                } else {
                    match self.policy.check(&password) {
                        Ok(()) => ResolverState::AwaitConfirmation(InteractiveCredentials::new(
                            user, password,
                        )),
                        Err(err) => ResolverState::Rejected(err),
                    }
                }
            }
            (ResolverState::AwaitConfirmation(creds), Some(answer)) => {
                match creds.confirm(&secret_answer(answer)) {
                    Ok(confirmed) => ResolverState::Accepted(confirmed),
                    Err(err) => ResolverState::Rejected(err),
                }
            }
            (terminal @ (ResolverState::Accepted(_) | ResolverState::Rejected(_)), _) => terminal,
            (state, _) => ResolverState::Rejected(KmsError::Unauthorized(format!(
                "unexpected input in state {}",
                state.name()
            ))),
        };
        debug!(from, to = next.name(), "resolver transition");
        next
    }

    fn validate_user(&self, user: String) -> ResolverState {
        if user.is_empty() {
            return ResolverState::Rejected(KmsError::Unauthorized("empty user name".to_string()));
        }
        if user != self.os_user {
            return ResolverState::Rejected(KmsError::Unauthorized(format!(
                "user `{user}` does not match the login user"
            )));
        }
        ResolverState::AwaitPassword { user }
    }
}

fn expose_answer(answer: PromptAnswer) -> String {
    match answer {
        PromptAnswer::Plain(value) => value,
        PromptAnswer::Masked(secret) => secret.expose_secret().to_string(),
    }
}

fn secret_answer(answer: PromptAnswer) -> SecretString {
    match answer {
        PromptAnswer::Plain(value) => SecretString::from(value),
        PromptAnswer::Masked(secret) => secret,
    }
}
