//! `vantage analyze` - Describe the latest run of a vantage.

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;
use vantage_analysis::{run_report, RunReport};

use super::Context;
use crate::cli::args::AnalyzeArgs;
use crate::output::{self, OutputFormat};

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Domains")]
    domains: usize,
}

#[derive(Tabled)]
struct MismatchRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Local resolver error")]
    error: String,
}

pub fn execute(ctx: &Context, args: AnalyzeArgs) -> Result<()> {
    let rows = ctx.read_measurements()?;
    let report = run_report(&rows, args.vantage.as_deref())?;

    match ctx.output_format {
        OutputFormat::Csv => output::csv_counts(["http_outcome", "rows"], &report.outcome_counts)?,
        OutputFormat::Pretty => print_pretty(&report),
        format => {
            output::structured(format, &report)?;
        }
    }
    Ok(())
}

fn print_pretty(report: &RunReport) {
    println!(
        "{} {} run {} ({} rows, {} domains)",
        "Vantage:".bold(),
        report.vantage.cyan(),
        report.run_id.cyan(),
        report.rows,
        report.domains
    );

    println!();
    println!("{}", "HTTP outcomes:".bold().underline());
    output::print_counts(&report.outcome_counts, |o| o.normal());

    let categories: Vec<CategoryRow> = report
        .outcomes_by_category
        .iter()
        .flat_map(|(category, outcomes)| {
            outcomes.iter().map(move |(outcome, domains)| CategoryRow {
                category: category.clone(),
                outcome: outcome.clone(),
                domains: *domains,
            })
        })
        .collect();
    if !categories.is_empty() {
        println!();
        println!("{}", "Outcomes by category:".bold().underline());
        println!("{}", output::table(&categories));
    }

    println!();
    println!("{}", "Top certificate issuers:".bold().underline());
    output::print_counts(&report.top_issuers, |i| i.normal());

    println!();
    println!(
        "{} local {:.1}%, public {:.1}%",
        "DNS success:".bold(),
        report.dns_local_ok_fraction * 100.0,
        report.dns_public_ok_fraction * 100.0
    );
    if report.dns_mismatches.is_empty() {
        println!("{}", "No local-only DNS failures.".green());
    } else {
        println!();
        println!("{}", "Resolved publicly but not locally:".bold().underline());
        let mismatches: Vec<MismatchRow> = report
            .dns_mismatches
            .iter()
            .map(|m| MismatchRow {
                domain: m.domain.clone(),
                category: m.category.clone(),
                error: m.dns_local_error.clone(),
            })
            .collect();
        println!("{}", output::table(&mismatches));
    }
}
