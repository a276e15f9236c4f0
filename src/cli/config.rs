//! Configuration file commands

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::output::print_json;

/// Print the effective configuration (file plus CLI overrides).
pub fn show(opts: &GlobalOptions, strict: bool) -> Result<()> {
    let path = Config::resolve_path(opts.config_ref())?;
    if strict && !path.exists() {
        return Err(ConfigError::NotFound.into());
    }

    let ctx = CommandContext::new(opts)?;
    match ctx.format {
        OutputFormat::Json => print_json(&ctx.config)?,
        _ => {
            let yaml = serde_yaml::to_string(&ctx.config)
                .map_err(|e| ConfigError::SaveError(e.to_string()))?;
            if !path.exists() {
                eprintln!("# {} not found, showing defaults", path.display());
            }
            print!("{}", yaml);
        }
    }
    Ok(())
}

/// Write the default configuration, refusing to overwrite without `force`.
pub fn init(opts: &GlobalOptions, force: bool) -> Result<()> {
    let path = Config::resolve_path(opts.config_ref())?;
    if path.exists() && !force {
        return Err(ConfigError::Invalid(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ))
        .into());
    }

    let mut config = Config::default();
    if let Some(origin) = opts.origin_ref() {
        config.worker.origin = origin.to_string();
        config.worker.scope = format!("{}/", origin.trim_end_matches('/'));
    }
    config.save_to(path.clone())?;

    match opts.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "success": true,
        }))?,
        _ => println!("{} Wrote {}", "✓".green(), path.display()),
    }
    Ok(())
}
