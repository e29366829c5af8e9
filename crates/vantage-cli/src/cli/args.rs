//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Multi-vantage web reachability measurement
///
/// Probe a curated domain list from this network, compare what different
/// vantages see, and classify likely censorship.
#[derive(Parser, Debug)]
#[command(name = "vantage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding every store (overrides the config file)
    #[arg(short, long, env = "VANTAGE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(short, long, env = "VANTAGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe every included domain and append the rows to the store
    Measure(MeasureArgs),

    /// Fetch the external feed and keep measurements of listed domains
    Ingest(IngestArgs),

    /// Join the latest local run with feed failure rates
    Merge(VantageArgs),

    /// Compare the latest runs of two vantages
    Compare(CompareArgs),

    /// Assign a censorship class to every summarized domain
    Classify(ClassifyArgs),

    /// Describe the latest run of a vantage
    Analyze(AnalyzeArgs),

    /// Counts per censorship class and notable domains
    Summary,

    /// Show the effective configuration
    Config(ConfigArgs),
}

// ============================================================================
// Measure command
// ============================================================================

#[derive(Args, Debug)]
pub struct MeasureArgs {
    /// Vantage label stamped on every row
    #[arg(long)]
    pub vantage: Option<String>,

    /// Domain list (defaults to domains.csv in the data directory)
    #[arg(long)]
    pub domains: Option<PathBuf>,

    /// Only measure the first N included domains
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Rows buffered per store flush
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Use this many seconds for every probe timeout
    #[arg(long)]
    pub timeout: Option<f64>,
}

// ============================================================================
// Ingest command
// ============================================================================

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Earliest measurement date (YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<String>,

    /// Probe country code
    #[arg(long)]
    pub probe_cc: Option<String>,

    /// Cap on fetched measurements
    #[arg(long)]
    pub max: Option<usize>,

    /// Feed endpoint
    #[arg(long, hide = true)]
    pub feed_url: Option<String>,
}

// ============================================================================
// Merge / Analyze commands
// ============================================================================

#[derive(Args, Debug)]
pub struct VantageArgs {
    /// Local vantage label
    #[arg(long)]
    pub vantage: Option<String>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Vantage to describe (defaults to the busiest vantage of the latest run)
    #[arg(long)]
    pub vantage: Option<String>,
}

// ============================================================================
// Compare command
// ============================================================================

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Local vantage label
    #[arg(long)]
    pub local: Option<String>,

    /// Remote vantage label
    #[arg(long)]
    pub remote: Option<String>,
}

// ============================================================================
// Classify command
// ============================================================================

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Comparison file (defaults to the first one found for the local vantage)
    #[arg(long)]
    pub comparison_file: Option<PathBuf>,

    /// Local vantage used for block page evidence
    #[arg(long)]
    pub vantage: Option<String>,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from(["vantage", "compare", "--local", "IN-home", "-o", "json", "--no-color"]).unwrap();
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert!(cli.no_color);
        match cli.command {
            Commands::Compare(args) => {
                assert_eq!(args.local.as_deref(), Some("IN-home"));
                assert!(args.remote.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
