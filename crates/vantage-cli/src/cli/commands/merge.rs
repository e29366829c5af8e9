//! `vantage merge` - Join the latest local run with feed failure rates.

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use colored::Colorize;
use tabled::Tabled;
use vantage_analysis::{aggregate_feed, summarize};
use vantage_core::DomainSummary;
use vantage_store::{read_feed, write_summary};

use super::Context;
use crate::cli::args::VantageArgs;
use crate::output::{self, OutputFormat};

#[derive(Tabled)]
struct RateRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Feed total")]
    total: u64,
    #[tabled(rename = "Failures")]
    failures: u64,
    #[tabled(rename = "Rate")]
    rate: String,
}

/// Failure-rate bucket used in the cross-tab
fn rate_bin(rate: f64) -> &'static str {
    if rate <= 0.0 {
        "0"
    } else if rate <= 0.2 {
        "(0,0.2]"
    } else {
        "(0.2,1]"
    }
}

pub fn execute(ctx: &Context, args: VantageArgs) -> Result<()> {
    let vantage = ctx.vantage(args.vantage);
    let rows = ctx.read_measurements()?;

    let feed_path = ctx.data.feed();
    let feed = read_feed(&feed_path).with_context(|| format!("Failed to read feed {}", feed_path.display()))?;
    let feed = aggregate_feed(&feed);

    let summary = summarize(&rows, &vantage, &feed)?;
    let path = ctx.data.summary();
    write_summary(&path, &summary).with_context(|| format!("Failed to write {}", path.display()))?;

    match ctx.output_format {
        OutputFormat::Csv => output::csv_rows(&summary)?,
        OutputFormat::Pretty => print_pretty(&summary),
        format => {
            output::structured(format, &summary)?;
        }
    }
    if ctx.pretty() {
        println!();
        println!("{} {}", "Saved to".green(), path.display().to_string().dimmed());
    }
    Ok(())
}

fn print_pretty(summary: &[DomainSummary]) {
    println!("{} {} domains", "Merged summary:".bold(), summary.len().to_string().cyan());

    let mut measured: Vec<&DomainSummary> = summary.iter().filter(|s| s.feed_total_measurements > 0).collect();
    measured.sort_by(|a, b| b.feed_failure_rate.total_cmp(&a.feed_failure_rate));
    if !measured.is_empty() {
        println!();
        println!("{}", "Top 10 domains by feed failure rate:".bold().underline());
        let rows: Vec<RateRow> = measured
            .iter()
            .take(10)
            .map(|s| RateRow {
                domain: s.domain.clone(),
                total: s.feed_total_measurements,
                failures: s.feed_failure_count,
                rate: format!("{:.2}", s.feed_failure_rate),
            })
            .collect();
        println!("{}", output::table(&rows));
    }

    let mut crosstab: BTreeMap<String, BTreeMap<&str, usize>> = BTreeMap::new();
    for s in summary {
        let outcome = s.local_http_outcome.map_or("none", |o| o.as_str()).to_string();
        *crosstab
            .entry(outcome)
            .or_default()
            .entry(rate_bin(s.feed_failure_rate))
            .or_default() += 1;
    }
    println!();
    println!("{}", "Local outcome vs feed failure rate:".bold().underline());
    println!("  {:<20} {:>6} {:>8} {:>8}", "", "0", "(0,0.2]", "(0.2,1]");
    for (outcome, bins) in &crosstab {
        let cell = |bin: &str| bins.get(bin).copied().unwrap_or(0);
        println!(
            "  {:<20} {:>6} {:>8} {:>8}",
            outcome,
            cell("0"),
            cell("(0,0.2]"),
            cell("(0.2,1]")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_bins_match_cut_points() {
        assert_eq!(rate_bin(0.0), "0");
        assert_eq!(rate_bin(0.2), "(0,0.2]");
        assert_eq!(rate_bin(0.21), "(0.2,1]");
        assert_eq!(rate_bin(1.0), "(0.2,1]");
    }
}
