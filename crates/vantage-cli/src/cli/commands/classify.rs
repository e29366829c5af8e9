//! `vantage classify` - Attach censorship classes to the merged summary.

use std::collections::BTreeSet;

use anyhow::{Context as _, Result};
use colored::Colorize;
use tracing::{debug, warn};
use vantage_analysis::{blockpage_domains, class_counts, enrich};
use vantage_store::{find_comparison_file, read_comparison, read_summary, write_enriched, StoreError};

use super::Context;
use crate::cli::args::ClassifyArgs;
use crate::output::{self, paint_class, OutputFormat};

pub fn execute(ctx: &Context, args: ClassifyArgs) -> Result<()> {
    let vantage = ctx.vantage(args.vantage);

    let summary_path = ctx.data.summary();
    let summaries =
        read_summary(&summary_path).with_context(|| format!("Failed to read summary {}", summary_path.display()))?;

    let comparison_path = match args.comparison_file {
        Some(path) => Some(path),
        None => find_comparison_file(ctx.data.root(), &vantage)?,
    };
    let comparisons = match &comparison_path {
        Some(path) => match read_comparison(path) {
            Ok(rows) if rows.is_empty() => None,
            Ok(rows) => Some(rows),
            Err(StoreError::Missing { .. }) => {
                warn!(path = %path.display(), "comparison file not found, diff labels will be unknown");
                None
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to read comparison {}", path.display())),
        },
        None => None,
    };

    let blockpages = match ctx.store().read_all() {
        Ok(rows) => blockpage_domains(&rows, &vantage),
        Err(StoreError::Missing { .. }) => BTreeSet::new(),
        Err(e) => return Err(e).context("Failed to read measurements for block page evidence"),
    };
    debug!(domains = blockpages.len(), "block page evidence");

    let enriched = enrich(summaries, comparisons.as_deref(), &blockpages);
    let path = ctx.data.enriched();
    write_enriched(&path, &enriched).with_context(|| format!("Failed to write {}", path.display()))?;
    let counts = class_counts(&enriched);

    match ctx.output_format {
        OutputFormat::Csv => output::csv_counts(["censorship_class", "domains"], &counts)?,
        OutputFormat::Pretty => {
            match &comparison_path {
                Some(p) if comparisons.is_some() => {
                    println!("{} {}", "Comparison:".bold(), p.display().to_string().dimmed());
                }
                _ => println!("{}", "No comparison available; diff labels are unknown.".yellow()),
            }
            println!("{} {} domains", "Classified:".bold(), enriched.len().to_string().cyan());
            println!();
            output::print_counts(&counts, |c| paint_class(*c));
            println!();
            println!("{} {}", "Saved to".green(), path.display().to_string().dimmed());
        }
        format => {
            output::structured(format, &enriched)?;
        }
    }

    Ok(())
}
