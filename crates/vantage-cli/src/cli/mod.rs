//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vantage_store::DataDir;

use crate::config::Config;
use crate::output::OutputFormat;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins unless `--verbose` asks for debug output; the default
/// level is `warn`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Load configuration
    let config_path = Config::resolve_path(cli.config.as_deref())?;
    let config = Config::load(cli.config.as_deref())?;

    // Flags beat the config file
    let output_format = cli
        .output
        .or(config.output_format)
        .unwrap_or(OutputFormat::Pretty);
    let data = DataDir::new(cli.data_dir.clone().unwrap_or_else(|| config.data_dir.clone()));

    // Create context for commands
    let ctx = commands::Context {
        config,
        config_path,
        data,
        output_format,
        verbose: cli.verbose,
    };

    // Dispatch to appropriate command
    match cli.command {
        Commands::Measure(args) => commands::measure::execute(ctx, args).await,
        Commands::Ingest(args) => commands::ingest::execute(ctx, args).await,
        Commands::Merge(args) => commands::merge::execute(&ctx, args),
        Commands::Compare(args) => commands::compare::execute(&ctx, args),
        Commands::Classify(args) => commands::classify::execute(&ctx, args),
        Commands::Analyze(args) => commands::analyze::execute(&ctx, args),
        Commands::Summary => commands::summary::execute(&ctx),
        Commands::Config(args) => commands::config::execute(&ctx, args),
    }
}
