//! Rule-based password scorer
//!
//! Each enabled check runs independently. A passed check adds its weight to
//! the score; a failed hard rule lands in `errors` and a failed soft rule in
//! `warnings`. The result is valid when there are no errors and the derived
//! strength reaches the configured threshold.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::checks::{self, MIN_SEQUENCE_LEN, SpecialChars};
use super::config::{PartialPasswordConfig, PasswordConfig, PasswordContext, Strength};
use super::wordlist::WordList;

/// Identifier of one rule, in the order the validator evaluates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckKind {
    Length,
    Uppercase,
    Lowercase,
    Numbers,
    SpecialChars,
    CommonPassword,
    KeyboardPattern,
    Sequence,
    RepeatingChars,
    UserInfo,
    UniqueChars,
}

impl CheckKind {
    /// Points contributed when the check passes.
    pub fn weight(&self) -> u32 {
        match self {
            CheckKind::Length => 15,
            CheckKind::Uppercase | CheckKind::Lowercase | CheckKind::Numbers => 10,
            CheckKind::SpecialChars => 15,
            CheckKind::CommonPassword => 20,
            CheckKind::KeyboardPattern => 10,
            CheckKind::Sequence | CheckKind::RepeatingChars => 5,
            CheckKind::UserInfo | CheckKind::UniqueChars => 10,
        }
    }

    /// Hard rules invalidate the password on failure; soft rules only warn.
    pub fn is_hard(&self) -> bool {
        matches!(
            self,
            CheckKind::Length
                | CheckKind::Uppercase
                | CheckKind::Lowercase
                | CheckKind::Numbers
                | CheckKind::SpecialChars
                | CheckKind::CommonPassword
                | CheckKind::UserInfo
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::Length => "length",
            CheckKind::Uppercase => "uppercase",
            CheckKind::Lowercase => "lowercase",
            CheckKind::Numbers => "numbers",
            CheckKind::SpecialChars => "specialChars",
            CheckKind::CommonPassword => "commonPassword",
            CheckKind::KeyboardPattern => "keyboardPattern",
            CheckKind::Sequence => "sequence",
            CheckKind::RepeatingChars => "repeatingChars",
            CheckKind::UserInfo => "userInfo",
            CheckKind::UniqueChars => "uniqueChars",
        }
    }
}

/// Outcome of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub passed: bool,
    pub message: String,
    pub weight: u32,
}

/// Aggregate outcome of one validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub score: u32,
    pub strength: Strength,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub checks: BTreeMap<CheckKind, ValidationCheck>,
}

impl ValidationResult {
    pub fn check(&self, kind: CheckKind) -> Option<&ValidationCheck> {
        self.checks.get(&kind)
    }

    pub fn passed(&self, kind: CheckKind) -> bool {
        self.check(kind).is_some_and(|c| c.passed)
    }
}

/// Accumulates checks as they run.
#[derive(Default)]
struct Tally {
    score: u32,
    errors: Vec<String>,
    warnings: Vec<String>,
    checks: BTreeMap<CheckKind, ValidationCheck>,
}

impl Tally {
    fn record(&mut self, kind: CheckKind, passed: bool, ok: String, failed: String) {
        let weight = kind.weight();
        let message = if passed {
            self.score += weight;
            ok
        } else {
            if kind.is_hard() {
                self.errors.push(failed.clone());
            } else {
                self.warnings.push(failed.clone());
            }
            failed
        };
        self.checks.insert(
            kind,
            ValidationCheck {
                passed,
                message,
                weight,
            },
        );
    }
}

/// Stateless validator bound to one configuration and word list.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    config: PasswordConfig,
    special: SpecialChars,
    words: WordList,
}

impl Default for PasswordValidator {
    fn default() -> Self {
        Self::new(PasswordConfig::default())
    }
}

impl PasswordValidator {
    pub fn new(config: PasswordConfig) -> Self {
        Self::with_wordlist(config, WordList::builtin().clone())
    }

    /// Validator using a custom word list.
    pub fn with_wordlist(config: PasswordConfig, words: WordList) -> Self {
        let special = SpecialChars::new(&config.allowed_special_chars);
        Self {
            config,
            special,
            words,
        }
    }

    /// Validator whose configuration is `partial` layered over the default.
    pub fn from_partial(partial: &PartialPasswordConfig) -> Self {
        Self::new(partial.apply_to(&PasswordConfig::default()))
    }

    /// A copy of the active configuration.
    pub fn config(&self) -> PasswordConfig {
        self.config.clone()
    }

    /// Merge `partial` over the active configuration.
    pub fn update_config(&mut self, partial: &PartialPasswordConfig) {
        self.config = partial.apply_to(&self.config);
        self.special = SpecialChars::new(&self.config.allowed_special_chars);
    }

    pub fn validate(&self, password: &str, context: Option<&PasswordContext>) -> ValidationResult {
        let cfg = &self.config;
        let mut tally = Tally::default();

        let length = password.chars().count();
        tally.record(
            CheckKind::Length,
            length >= cfg.min_length && length <= cfg.max_length,
            format!("Length requirement met ({}+ characters)", cfg.min_length),
            format!(
                "Password must be between {} and {} characters",
                cfg.min_length, cfg.max_length
            ),
        );

        if cfg.require_uppercase {
            tally.record(
                CheckKind::Uppercase,
                checks::count_uppercase(password) >= cfg.min_uppercase,
                "Contains uppercase letters".to_string(),
                format!(
                    "Must contain at least {} uppercase letter(s)",
                    cfg.min_uppercase
                ),
            );
        }

        if cfg.require_lowercase {
            tally.record(
                CheckKind::Lowercase,
                checks::count_lowercase(password) >= cfg.min_lowercase,
                "Contains lowercase letters".to_string(),
                format!(
                    "Must contain at least {} lowercase letter(s)",
                    cfg.min_lowercase
                ),
            );
        }

        if cfg.require_numbers {
            tally.record(
                CheckKind::Numbers,
                checks::count_digits(password) >= cfg.min_numbers,
                "Contains numbers".to_string(),
                format!("Must contain at least {} number(s)", cfg.min_numbers),
            );
        }

        if cfg.require_special_chars {
            tally.record(
                CheckKind::SpecialChars,
                self.special.count(password) >= cfg.min_special_chars,
                "Contains special characters".to_string(),
                format!(
                    "Must contain at least {} special character(s)",
                    cfg.min_special_chars
                ),
            );
        }

        if cfg.check_common_passwords {
            tally.record(
                CheckKind::CommonPassword,
                !checks::is_common_password(password, &self.words),
                "Not a common password".to_string(),
                "This password is too common and easily guessed".to_string(),
            );
        }

        if cfg.check_keyboard_patterns {
            tally.record(
                CheckKind::KeyboardPattern,
                !checks::contains_keyboard_pattern(password, &self.words),
                "No keyboard patterns detected".to_string(),
                r#"Avoid keyboard patterns like "qwerty" or "12345""#.to_string(),
            );
        }

        if cfg.check_sequences {
            tally.record(
                CheckKind::Sequence,
                !checks::contains_sequence(password, MIN_SEQUENCE_LEN),
                "No sequential characters".to_string(),
                r#"Avoid sequential characters like "abcd" or "1234""#.to_string(),
            );
        }

        if cfg.check_repeating_chars {
            tally.record(
                CheckKind::RepeatingChars,
                !checks::has_repeating_chars(password, cfg.max_repeating_chars),
                "No excessive repeating characters".to_string(),
                format!(
                    "Avoid repeating the same character more than {} times",
                    cfg.max_repeating_chars
                ),
            );
        }

        if cfg.check_user_info
            && let Some(context) = context
        {
            tally.record(
                CheckKind::UserInfo,
                !contains_user_info(password, context),
                "Does not contain personal information".to_string(),
                "Password should not contain your personal information".to_string(),
            );
        }

        tally.record(
            CheckKind::UniqueChars,
            checks::unique_chars(password) >= cfg.min_unique_chars,
            "Good character diversity".to_string(),
            format!("Use at least {} different characters", cfg.min_unique_chars),
        );

        let strength = Strength::from_score(tally.score);
        let is_valid = tally.errors.is_empty() && strength >= cfg.strength_threshold;

        ValidationResult {
            is_valid,
            score: tally.score,
            strength,
            errors: tally.errors,
            warnings: tally.warnings,
            checks: tally.checks,
        }
    }
}

/// Identity tokens: email local part, first name, last name, username.
fn identity_tokens(context: &PasswordContext) -> Vec<String> {
    let email_local = context
        .email
        .as_deref()
        .map(|email| email.split('@').next().unwrap_or_default());

    [
        email_local,
        context.first_name.as_deref(),
        context.last_name.as_deref(),
        context.username.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::to_lowercase)
    .filter(|token| token.chars().count() > 2)
    .collect()
}

fn contains_user_info(password: &str, context: &PasswordContext) -> bool {
    let lower = password.to_lowercase();
    identity_tokens(context)
        .iter()
        .any(|token| lower.contains(token.as_str()) || token.contains(lower.as_str()))
}

/// Validate with an optional partial configuration over the default.
pub fn validate_password(
    password: &str,
    context: Option<&PasswordContext>,
    config: Option<&PartialPasswordConfig>,
) -> ValidationResult {
    match config {
        Some(partial) => PasswordValidator::from_partial(partial).validate(password, context),
        None => PasswordValidator::default().validate(password, context),
    }
}
