//! `vantage compare` - Compare the latest runs of two vantages.

use anyhow::{Context as _, Result};
use colored::Colorize;
use tabled::Tabled;
use vantage_analysis::{compare_vantages, suspicious, Tally};
use vantage_store::write_comparison;

use super::Context;
use crate::cli::args::CompareArgs;
use crate::output::{self, paint_diff, paint_outcome, OutputFormat};

#[derive(Tabled)]
struct SuspiciousRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Local")]
    local: String,
    #[tabled(rename = "Remote")]
    remote: String,
    #[tabled(rename = "Verdict")]
    verdict: String,
}

pub fn execute(ctx: &Context, args: CompareArgs) -> Result<()> {
    let local = ctx.vantage(args.local);
    let remote = ctx.remote_vantage(args.remote);
    let rows = ctx.read_measurements()?;

    let comparisons = compare_vantages(&rows, &local, &remote)?;
    let path = ctx.data.comparison(&local, &remote);
    write_comparison(&path, &comparisons).with_context(|| format!("Failed to write {}", path.display()))?;

    match ctx.output_format {
        OutputFormat::Csv => output::csv_rows(&comparisons)?,
        OutputFormat::Pretty => {
            println!(
                "{} {} vs {} ({} domains)",
                "Comparison:".bold(),
                local.cyan(),
                remote.cyan(),
                comparisons.len()
            );
            println!();
            let counts = comparisons.iter().map(|c| c.vantage_diff_flag).collect::<Tally<_>>().ranked();
            output::print_counts(&counts, |l| paint_diff(*l));

            let flagged: Vec<SuspiciousRow> = suspicious(&comparisons)
                .take(10)
                .map(|c| SuspiciousRow {
                    domain: c.domain.clone(),
                    category: c.category.clone(),
                    local: paint_outcome(c.local_http_outcome).to_string(),
                    remote: paint_outcome(c.remote_http_outcome).to_string(),
                    verdict: paint_diff(c.vantage_diff_flag).to_string(),
                })
                .collect();
            if !flagged.is_empty() {
                println!();
                println!("{}", "Locally suspicious domains:".bold().underline());
                println!("{}", output::table(&flagged));
            }
            println!();
            println!("{} {}", "Saved to".green(), path.display().to_string().dimmed());
        }
        format => {
            output::structured(format, &comparisons)?;
        }
    }

    Ok(())
}
