//! Validation configuration, strength levels and presets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ordered strength category derived from a password's score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Strength {
    VeryWeak,
    Weak,
    Medium,
    Strong,
    VeryStrong,
}

impl Strength {
    /// Map a score onto the fixed cut points (30 / 50 / 70 / 90).
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 90 => Strength::VeryStrong,
            s if s >= 70 => Strength::Strong,
            s if s >= 50 => Strength::Medium,
            s if s >= 30 => Strength::Weak,
            _ => Strength::VeryWeak,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strength::VeryWeak => "very-weak",
            Strength::Weak => "weak",
            Strength::Medium => "medium",
            Strength::Strong => "strong",
            Strength::VeryStrong => "very-strong",
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "very-weak" => Ok(Strength::VeryWeak),
            "weak" => Ok(Strength::Weak),
            "medium" => Ok(Strength::Medium),
            "strong" => Ok(Strength::Strong),
            "very-strong" => Ok(Strength::VeryStrong),
            other => Err(format!("unknown strength level: {other}")),
        }
    }
}

/// Identity details a password must not contain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordContext {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// Full rule set for one validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,
    pub min_uppercase: usize,
    pub min_lowercase: usize,
    pub min_numbers: usize,
    pub min_special_chars: usize,
    pub check_common_passwords: bool,
    pub check_keyboard_patterns: bool,
    pub check_sequences: bool,
    pub check_repeating_chars: bool,
    pub check_user_info: bool,
    pub max_repeating_chars: usize,
    pub min_unique_chars: usize,
    pub allowed_special_chars: String,
    pub strength_threshold: Strength,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_uppercase: true,
            require_lowercase: true,
            require_numbers: true,
            require_special_chars: true,
            min_uppercase: 1,
            min_lowercase: 1,
            min_numbers: 1,
            min_special_chars: 1,
            check_common_passwords: true,
            check_keyboard_patterns: true,
            check_sequences: true,
            check_repeating_chars: true,
            check_user_info: true,
            max_repeating_chars: 3,
            min_unique_chars: 5,
            allowed_special_chars: r#"!@#$%^&*(),.?":{}|<>-_=+[]\;'`~"#.to_string(),
            strength_threshold: Strength::Medium,
        }
    }
}

/// Partial override layered over a full [`PasswordConfig`].
///
/// Unset fields keep the base value, so a partial can never leave a check
/// without a threshold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialPasswordConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_uppercase: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_lowercase: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_numbers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_special_chars: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_uppercase: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_lowercase: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_numbers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_special_chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_common_passwords: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_keyboard_patterns: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_sequences: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_repeating_chars: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_user_info: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_repeating_chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_unique_chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_special_chars: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength_threshold: Option<Strength>,
}

impl PartialPasswordConfig {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply this override on top of `base`.
    pub fn apply_to(&self, base: &PasswordConfig) -> PasswordConfig {
        PasswordConfig {
            min_length: self.min_length.unwrap_or(base.min_length),
            max_length: self.max_length.unwrap_or(base.max_length),
            require_uppercase: self.require_uppercase.unwrap_or(base.require_uppercase),
            require_lowercase: self.require_lowercase.unwrap_or(base.require_lowercase),
            require_numbers: self.require_numbers.unwrap_or(base.require_numbers),
            require_special_chars: self
                .require_special_chars
                .unwrap_or(base.require_special_chars),
            min_uppercase: self.min_uppercase.unwrap_or(base.min_uppercase),
            min_lowercase: self.min_lowercase.unwrap_or(base.min_lowercase),
            min_numbers: self.min_numbers.unwrap_or(base.min_numbers),
            min_special_chars: self.min_special_chars.unwrap_or(base.min_special_chars),
            check_common_passwords: self
                .check_common_passwords
                .unwrap_or(base.check_common_passwords),
            check_keyboard_patterns: self
                .check_keyboard_patterns
                .unwrap_or(base.check_keyboard_patterns),
            check_sequences: self.check_sequences.unwrap_or(base.check_sequences),
            check_repeating_chars: self
                .check_repeating_chars
                .unwrap_or(base.check_repeating_chars),
            check_user_info: self.check_user_info.unwrap_or(base.check_user_info),
            max_repeating_chars: self.max_repeating_chars.unwrap_or(base.max_repeating_chars),
            min_unique_chars: self.min_unique_chars.unwrap_or(base.min_unique_chars),
            allowed_special_chars: self
                .allowed_special_chars
                .clone()
                .unwrap_or_else(|| base.allowed_special_chars.clone()),
            strength_threshold: self.strength_threshold.unwrap_or(base.strength_threshold),
        }
    }
}

/// Named configuration overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Short passwords, no uppercase/special requirement, weak threshold
    Basic,
    /// The default rule set
    #[default]
    Standard,
    /// Long passwords, two of every class, strong threshold
    Strict,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Basic, Preset::Standard, Preset::Strict];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Basic => "basic",
            Preset::Standard => "standard",
            Preset::Strict => "strict",
        }
    }

    /// The overlay this preset applies to the default configuration.
    pub fn overlay(&self) -> PartialPasswordConfig {
        match self {
            Preset::Basic => PartialPasswordConfig {
                min_length: Some(6),
                require_uppercase: Some(false),
                require_special_chars: Some(false),
                check_common_passwords: Some(false),
                check_keyboard_patterns: Some(false),
                strength_threshold: Some(Strength::Weak),
                ..Default::default()
            },
            Preset::Standard => PartialPasswordConfig::default(),
            Preset::Strict => PartialPasswordConfig {
                min_length: Some(12),
                min_uppercase: Some(2),
                min_lowercase: Some(2),
                min_numbers: Some(2),
                min_special_chars: Some(2),
                check_common_passwords: Some(true),
                check_keyboard_patterns: Some(true),
                check_sequences: Some(true),
                check_repeating_chars: Some(true),
                check_user_info: Some(true),
                max_repeating_chars: Some(2),
                min_unique_chars: Some(8),
                strength_threshold: Some(Strength::Strong),
                ..Default::default()
            },
        }
    }

    /// Resolve the preset to a full configuration.
    pub fn config(&self) -> PasswordConfig {
        self.overlay().apply_to(&PasswordConfig::default())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown password preset: {s}"))
    }
}
