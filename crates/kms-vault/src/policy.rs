// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password acceptance rules.

use kms_config::model::PasswordRulesConfig;
use kms_core::KmsError;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

/// A character class a password must draw at least one character from.
#[derive(Debug, Clone)]
pub struct CharacterClass {
    pattern: String,
    regex: Regex,
}

impl CharacterClass {
    /// Compile a class body such as `A-Z` or `!@#$%`.
    pub fn new(pattern: &str) -> Result<Self, KmsError> {
        let regex = Regex::new(&format!("[{pattern}]")).map_err(|e| {
            KmsError::Config(format!("`{pattern}` is not a valid character class: {e}"))
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

/// One rule of a [`PasswordPolicy`].
#[derive(Debug, Clone)]
pub enum PasswordPolicyRule {
    /// At least this many characters.
    MinLength(usize),
    /// At least one character from each class.
    CharacterClasses(Vec<CharacterClass>),
}

impl PasswordPolicyRule {
    /// Check `candidate`, naming the rule and its requirement on failure.
    pub fn check(&self, candidate: &str) -> Result<(), KmsError> {
        match self {
            Self::MinLength(min) => {
                if candidate.chars().count() < *min {
                    return Err(KmsError::PolicyViolation(format!(
                        "min_length: password must be at least {min} characters"
                    )));
                }
            }
            Self::CharacterClasses(classes) => {
                if let Some(missing) = classes.iter().find(|class| !class.matches(candidate)) {
                    return Err(KmsError::PolicyViolation(format!(
                        "characters: password must contain at least one of [{}]",
                        missing.pattern()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Ordered set of rules; the first violated rule is reported.
#[derive(Debug, Clone, Default)]
pub struct PasswordPolicy {
    rules: Vec<PasswordPolicyRule>,
}

impl PasswordPolicy {
    pub fn new(rules: Vec<PasswordPolicyRule>) -> Self {
        Self { rules }
    }

    /// Length rule first, then character classes.
    pub fn from_config(config: &PasswordRulesConfig) -> Result<Self, KmsError> {
        let classes = config
            .characters
            .iter()
            .map(|pattern| CharacterClass::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rules = vec![PasswordPolicyRule::MinLength(config.min_length)];
        if !classes.is_empty() {
            rules.push(PasswordPolicyRule::CharacterClasses(classes));
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[PasswordPolicyRule] {
        &self.rules
    }

    pub fn check(&self, candidate: &SecretString) -> Result<(), KmsError> {
        let candidate = candidate.expose_secret();
        self.rules.iter().try_for_each(|rule| rule.check(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(min_length: usize, characters: &[&str]) -> PasswordPolicy {
        PasswordPolicy::from_config(&PasswordRulesConfig {
            min_length,
            characters: characters.iter().map(|c| c.to_string()).collect(),
        })
        .unwrap()
    }

    fn check(policy: &PasswordPolicy, candidate: &str) -> Result<(), KmsError> {
        policy.check(&SecretString::from(candidate.to_string()))
    }

    #[test]
    fn accepts_password_meeting_every_rule() {
        assert!(check(&policy(8, &["A-Z", "0-9"]), "Secret123!").is_ok());
    }

    #[test]
    fn short_password_names_min_length() {
        let err = check(&policy(8, &["A-Z"]), "Ab1").unwrap_err();
        match err {
            KmsError::PolicyViolation(msg) => {
                assert!(msg.starts_with("min_length"), "{msg}");
                assert!(msg.contains('8'), "{msg}");
            }
            other => panic!("expected PolicyViolation, got: {other:?}"),
        }
    }

    #[test]
    fn first_violated_rule_wins() {
        // Too short and missing a digit: length is checked first.
        let err = check(&policy(20, &["0-9"]), "abc").unwrap_err();
        assert!(matches!(err, KmsError::PolicyViolation(msg) if msg.starts_with("min_length")));
    }

    #[test]
    fn missing_class_is_named() {
        let err = check(&policy(4, &["A-Z", "0-9", "!@#$%"]), "Secret123").unwrap_err();
        assert!(matches!(err, KmsError::PolicyViolation(msg) if msg.contains("[!@#$%]")));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(check(&policy(4, &[]), "äöü").is_err());
        assert!(check(&policy(3, &[]), "äöü").is_ok());
    }

    #[test]
    fn invalid_class_is_a_config_error() {
        let err = CharacterClass::new("z-a").unwrap_err();
        assert!(matches!(err, KmsError::Config(_)));
    }

    #[test]
    fn no_classes_means_length_rule_only() {
        assert_eq!(policy(8, &[]).rules().len(), 1);
    }
}
