//! `vantage measure` - Probe the domain list from this network.

use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::Utc;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use vantage_analysis::Tally;
use vantage_core::{MeasurementRow, RunStamp};
use vantage_probe::{DomainMeasurer, Runner};
use vantage_store::{load_domains, Migration};

use super::Context;
use crate::cli::args::MeasureArgs;
use crate::output::{self, paint_outcome};

#[derive(Debug, Serialize)]
struct MeasureReport {
    run_id: String,
    vantage: String,
    store: String,
    rows: usize,
    batches: usize,
    cancelled: bool,
    outcomes: Vec<(String, usize)>,
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn progress_bar(ctx: &Context, len: usize) -> Result<ProgressBar> {
    if !ctx.pretty() {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(u64::try_from(len).unwrap_or(u64::MAX));
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

pub async fn execute(ctx: Context, args: MeasureArgs) -> Result<()> {
    let vantage = ctx.vantage(args.vantage);

    let mut run_config = ctx.config.probe.run_config()?;
    if args.limit.is_some() {
        run_config = run_config.domain_limit(args.limit);
    }
    if let Some(size) = args.batch_size {
        run_config = run_config.batch_size(size);
    }
    if let Some(secs) = args.timeout {
        let timeout = Duration::try_from_secs_f64(secs).with_context(|| format!("Invalid --timeout {secs}"))?;
        run_config = run_config.uniform_timeout(timeout);
    }

    let domains_path = args.domains.unwrap_or_else(|| ctx.data.domains());
    let entries = load_domains(&domains_path, run_config.domain_limit)
        .with_context(|| format!("Failed to load domain list {}", domains_path.display()))?;
    if entries.is_empty() {
        anyhow::bail!("No included domains in {}", domains_path.display());
    }

    let store = ctx.store();
    if let Migration::Upgraded { added, rows, .. } = store.migrate()? {
        eprintln!(
            "{} upgraded {} ({} rows, added {})",
            "Note:".yellow().bold(),
            store.path().display(),
            rows,
            added.join(", ")
        );
    }

    let measurer = DomainMeasurer::new(&run_config)?;
    let stamp = RunStamp::starting_at(&vantage, Utc::now());
    let runner = Runner::new(&measurer, stamp.clone(), run_config.batch_size);

    if ctx.pretty() {
        println!(
            "{} run {} at {} ({} domains)",
            "Measuring:".bold(),
            stamp.run_id.cyan(),
            vantage.cyan(),
            entries.len()
        );
    }

    let bar = progress_bar(&ctx, entries.len())?;
    let mut outcomes = Tally::new();
    let result = runner
        .run(
            &entries,
            interrupted(),
            |rows: &[MeasurementRow]| store.append(rows),
            |_, row| {
                outcomes.add(row.http_outcome);
                bar.inc(1);
                bar.set_message(row.domain.clone());
            },
        )
        .await;
    bar.finish_and_clear();
    let outcome = result.with_context(|| format!("Failed to write {}", store.path().display()))?;

    let report = MeasureReport {
        run_id: stamp.run_id,
        vantage,
        store: store.path().display().to_string(),
        rows: outcome.rows,
        batches: outcome.batches,
        cancelled: outcome.cancelled,
        outcomes: outcomes
            .ranked()
            .into_iter()
            .map(|(o, n)| (OutcomeLabel(o).to_string(), n))
            .collect(),
    };

    match ctx.output_format {
        output::OutputFormat::Csv => output::csv_counts(["http_outcome", "rows"], &report.outcomes)?,
        output::OutputFormat::Pretty => {
            println!(
                "{} {} rows in {} batches written to {}",
                "Done:".green().bold(),
                report.rows,
                report.batches,
                report.store.dimmed()
            );
            let labelled: Vec<_> = outcomes
                .ranked()
                .into_iter()
                .map(|(o, n)| (OutcomeLabel(o), n))
                .collect();
            output::print_counts(&labelled, |l| paint_outcome(l.0));
            if report.cancelled {
                println!("{}", "Run interrupted; completed domains were saved.".yellow());
            }
        }
        format => {
            output::structured(format, &report)?;
        }
    }

    Ok(())
}

struct OutcomeLabel(Option<vantage_core::HttpOutcome>);

impl std::fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.map_or("none", |o| o.as_str()))
    }
}
