//! Password commands

use colored::Colorize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::cli::context::CommandContext;
use crate::error::{ConfigError, Result};
use crate::output::{print_json, table::format_table};
use crate::password::{
    PasswordConfig, PasswordContext, PasswordValidator, Preset, Strength, ValidationResult,
    WordList,
};

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "CHECK")]
    check: String,
    #[tabled(rename = "RESULT")]
    result: String,
    #[tabled(rename = "WEIGHT")]
    weight: u32,
    #[tabled(rename = "MESSAGE")]
    message: String,
}

/// Rules for this run: a preset if given, else the configured overrides
/// over the defaults.
fn effective_config(ctx: &CommandContext, preset: Option<Preset>) -> PasswordConfig {
    match preset {
        Some(preset) => preset.config(),
        None => ctx.config.password.apply_to(&PasswordConfig::default()),
    }
}

/// The configured word lists, or the compiled-in ones when none are set.
fn word_list(ctx: &CommandContext) -> Result<WordList> {
    let paths = &ctx.config.wordlists;
    if paths.is_empty() {
        return Ok(WordList::builtin().clone());
    }
    let words = WordList::load(
        paths.common_passwords.as_deref(),
        paths.keyboard_patterns.as_deref(),
    )
    .map_err(|e| ConfigError::Invalid(format!("Cannot read word list: {}", e)))?;
    log::debug!("Loaded {} common passwords from config", words.len());
    Ok(words)
}

/// Validate a password. Returns whether it is acceptable.
pub fn check(
    ctx: &CommandContext,
    password: &str,
    preset: Option<Preset>,
    identity: PasswordContext,
) -> Result<bool> {
    let validator =
        PasswordValidator::with_wordlist(effective_config(ctx, preset), word_list(ctx)?);
    let has_identity = identity != PasswordContext::default();
    let result = validator.validate(password, has_identity.then_some(&identity));

    match ctx.format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => println!("{}", format_table(&check_rows(&result), "No checks ran.")),
        OutputFormat::Pretty => print_pretty(&result),
    }

    Ok(result.is_valid)
}

fn check_rows(result: &ValidationResult) -> Vec<CheckRow> {
    result
        .checks
        .iter()
        .map(|(kind, check)| CheckRow {
            check: kind.name().to_string(),
            result: if check.passed { "pass" } else { "fail" }.to_string(),
            weight: check.weight,
            message: check.message.clone(),
        })
        .collect()
}

fn print_pretty(result: &ValidationResult) {
    let strength = match result.strength {
        Strength::VeryWeak | Strength::Weak => result.strength.as_str().red(),
        Strength::Medium => result.strength.as_str().yellow(),
        Strength::Strong | Strength::VeryStrong => result.strength.as_str().green(),
    };

    if result.is_valid {
        println!("{} Password accepted", "✓".green());
    } else {
        println!("{} Password rejected", "✗".red());
    }
    println!("Score:    {}", result.score.to_string().bold());
    println!("Strength: {}", strength.bold());

    for error in &result.errors {
        println!("  {} {}", "✗".red(), error);
    }
    for warning in &result.warnings {
        println!("  {} {}", "⚠".yellow(), warning);
    }

    println!();
    println!("{}", format_table(&check_rows(result), "No checks ran."));
}

/// Show the effective rule set
pub fn rules(ctx: &CommandContext, preset: Option<Preset>) -> Result<()> {
    let config = effective_config(ctx, preset);

    match ctx.format {
        OutputFormat::Json => print_json(&config)?,
        _ => {
            let yaml =
                serde_yaml::to_string(&config).map_err(|e| ConfigError::SaveError(e.to_string()))?;
            print!("{}", yaml);
        }
    }
    Ok(())
}
