//! `vantage summary` - Class counts and notable domains from the enriched summary.

use anyhow::{Context as _, Result};
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;
use vantage_analysis::class_counts;
use vantage_core::{CensorshipClass, EnrichedSummary};
use vantage_store::read_enriched;

use super::Context;
use crate::output::{self, paint_class, paint_diff, paint_outcome, OutputFormat};

const NOTABLE: usize = 10;

#[derive(Serialize)]
struct SummaryReport<'a> {
    domains: usize,
    classes: Vec<(CensorshipClass, usize)>,
    notable: Vec<&'a EnrichedSummary>,
}

#[derive(Tabled)]
struct NotableRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Local")]
    local: String,
    #[tabled(rename = "Vantage diff")]
    diff: String,
    #[tabled(rename = "Feed failures")]
    rate: String,
}

pub fn execute(ctx: &Context) -> Result<()> {
    let path = ctx.data.enriched();
    let enriched =
        read_enriched(&path).with_context(|| format!("Failed to read {}; run `vantage classify` first", path.display()))?;

    let report = SummaryReport {
        domains: enriched.len(),
        classes: class_counts(&enriched),
        notable: enriched
            .iter()
            .filter(|e| e.censorship_class != CensorshipClass::Normal)
            .take(NOTABLE)
            .collect(),
    };

    match ctx.output_format {
        OutputFormat::Csv => output::csv_counts(["censorship_class", "domains"], &report.classes)?,
        OutputFormat::Pretty => {
            println!("{} {} domains", "Enriched summary:".bold(), report.domains.to_string().cyan());
            println!();
            output::print_counts(&report.classes, |c| paint_class(*c));
            if report.notable.is_empty() {
                println!();
                println!("{}", "Every domain classified normal.".green());
            } else {
                let rows: Vec<NotableRow> = report
                    .notable
                    .iter()
                    .map(|e| NotableRow {
                        domain: e.domain.clone(),
                        category: e.category.clone(),
                        class: paint_class(e.censorship_class).to_string(),
                        local: paint_outcome(e.local_http_outcome).to_string(),
                        diff: paint_diff(e.vantage_diff_flag).to_string(),
                        rate: format!("{:.2}", e.feed_failure_rate),
                    })
                    .collect();
                println!();
                println!("{}", "Notable domains:".bold().underline());
                println!("{}", output::table(&rows));
            }
        }
        format => {
            output::structured(format, &report)?;
        }
    }
    Ok(())
}
