//! `vantage config` - Inspect the effective configuration.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::output::OutputFormat;

pub fn execute(ctx: &Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(ctx),
        ConfigCommands::Path => show_path(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(config)?);
        }
        _ => {
            println!("{}", "Current Configuration:".bold());
            println!();
            println!("  {} {}", "data_dir:".bold(), ctx.data.root().display());
            println!("  {} {}", "vantage:".bold(), config.vantage.cyan());
            println!("  {} {}", "remote_vantage:".bold(), config.remote_vantage.cyan());
            println!("  {} {}", "output_format:".bold(), ctx.output_format);
            println!();
            print!("{}", toml::to_string_pretty(config)?);
        }
    }

    Ok(())
}

fn show_path(ctx: &Context) -> Result<()> {
    if ctx.pretty() {
        let status = if ctx.config_path.exists() {
            "(exists)".green()
        } else {
            "(not created, defaults in use)".dimmed()
        };
        println!("{} {}", ctx.config_path.display(), status);
    } else {
        println!("{}", ctx.config_path.display());
    }
    Ok(())
}
