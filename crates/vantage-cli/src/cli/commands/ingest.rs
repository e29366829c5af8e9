//! `vantage ingest` - Fetch and clean the external feed.

use std::time::Duration;

use anyhow::{Context as _, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use vantage_analysis::Tally;
use vantage_store::{allowed_domains, clean_feed, load_domains, write_feed, FeedFetcher};

use super::Context;
use crate::cli::args::IngestArgs;
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct IngestReport {
    allowed_domains: usize,
    fetched: usize,
    kept: usize,
    path: String,
    top_domains: Vec<(String, usize)>,
}

pub async fn execute(ctx: Context, args: IngestArgs) -> Result<()> {
    let domains_path = ctx.data.domains();
    let entries = load_domains(&domains_path, None)
        .with_context(|| format!("Failed to load domain list {}", domains_path.display()))?;
    let allowed = allowed_domains(&entries);

    let settings = &ctx.config.feed;
    let mut query = settings.query();
    if let Some(since) = args.since {
        query.since = since;
    }
    if let Some(cc) = args.probe_cc {
        query.probe_cc = cc;
    }
    if let Some(max) = args.max {
        query.max_measurements = max;
    }

    let mut builder = FeedFetcher::builder()
        .retries(settings.retries)
        .pages_per_second(settings.pages_per_second);
    if let Some(url) = args.feed_url {
        builder = builder.base_url(url);
    }
    let fetcher = builder.build()?;

    let spinner = if ctx.pretty() {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        spinner.set_message(format!("Fetching {} measurements for {}", query.test_name, query.probe_cc));
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    } else {
        ProgressBar::hidden()
    };
    let fetched = fetcher.fetch(&query).await;
    spinner.finish_and_clear();
    let fetched = fetched.context("Failed to fetch the feed")?;

    let cleaned = clean_feed(&fetched, &allowed)?;
    let path = ctx.data.feed();
    write_feed(&path, &cleaned).with_context(|| format!("Failed to write {}", path.display()))?;

    let mut top_domains = cleaned
        .iter()
        .map(|r| r.domain.clone())
        .collect::<Tally<_>>()
        .ranked();
    top_domains.truncate(20);

    let report = IngestReport {
        allowed_domains: allowed.len(),
        fetched: fetched.len(),
        kept: cleaned.len(),
        path: path.display().to_string(),
        top_domains,
    };

    match ctx.output_format {
        OutputFormat::Csv => output::csv_counts(["domain", "measurements"], &report.top_domains)?,
        OutputFormat::Pretty => {
            println!("{} {}", "Allowed domains:".bold(), report.allowed_domains);
            println!(
                "{} {} (capped at {})",
                "Fetched:".bold(),
                report.fetched.to_string().cyan(),
                query.max_measurements
            );
            println!("{} {}", "Matched:".bold(), report.kept.to_string().cyan());
            println!();
            println!("{}", "Top matched domains:".bold().underline());
            output::print_counts(&report.top_domains, |d| d.normal());
            println!();
            println!("{} {}", "Saved to".green(), report.path.dimmed());
        }
        format => {
            output::structured(format, &report)?;
        }
    }

    Ok(())
}
