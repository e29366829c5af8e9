//! Output formatting for different formats.

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use vantage_core::{CensorshipClass, DiffLabel, HttpOutcome};

/// Available output formats.
///
/// Flags parse through clap's value enum; the config file goes through
/// [`FromStr`], which also accepts the `table` and `yml` aliases.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum OutputFormat {
    /// Colored tables and bar charts
    #[default]
    Pretty,
    /// Pretty-printed JSON
    Json,
    /// Headed CSV
    Csv,
    /// YAML document
    Yaml,
}

impl OutputFormat {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Yaml => "yaml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "table" => Self::Pretty,
            "json" => Self::Json,
            "csv" => Self::Csv,
            "yaml" | "yml" => Self::Yaml,
            other => anyhow::bail!("unknown output format {other:?} (expected pretty, json, csv or yaml)"),
        })
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Print `value` as JSON or YAML.
///
/// Returns false for the other formats, which the caller renders itself.
pub fn structured<T: Serialize + ?Sized>(format: OutputFormat, value: &T) -> Result<bool> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Pretty | OutputFormat::Csv => return Ok(false),
    }
    Ok(true)
}

/// Write rows as headed CSV to stdout
pub fn csv_rows<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `(label, count)` pairs as CSV with the given header
pub fn csv_counts<L: std::fmt::Display>(header: [&str; 2], counts: &[(L, usize)]) -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{},{}", header[0], header[1])?;
    for (label, count) in counts {
        writeln!(out, "{label},{count}")?;
    }
    Ok(())
}

/// Rounded table
pub fn table<T: Tabled>(rows: &[T]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print a `label  count` list with a proportional bar
pub fn print_counts<L: std::fmt::Display>(counts: &[(L, usize)], paint: impl Fn(&L) -> ColoredString) {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    for (label, count) in counts {
        let pct = if total == 0 { 0 } else { count * 100 / total };
        let bar = "█".repeat(pct / 5);
        println!("  {:>6}  {:>3}% {} {}", count.to_string().cyan(), pct, bar.green(), paint(label));
    }
}

/// Color for an outcome label
pub fn paint_outcome(outcome: Option<HttpOutcome>) -> ColoredString {
    match outcome {
        None => "none".dimmed(),
        Some(o) if o.is_success() => o.as_str().green(),
        Some(o) if o.is_blockpage() => o.as_str().red().bold(),
        Some(o @ (HttpOutcome::Timeout | HttpOutcome::ConnectionError)) => o.as_str().yellow(),
        Some(o) => o.as_str().normal(),
    }
}

/// Color for a diff label
pub fn paint_diff(label: DiffLabel) -> ColoredString {
    match label {
        DiffLabel::BothSuccess => label.as_str().green(),
        l if l.is_local_suspicious() => l.as_str().red().bold(),
        DiffLabel::Unknown | DiffLabel::Other => label.as_str().dimmed(),
        l => l.as_str().yellow(),
    }
}

/// Color for a censorship class
pub fn paint_class(class: CensorshipClass) -> ColoredString {
    match class {
        CensorshipClass::Normal => class.as_str().green(),
        CensorshipClass::InfraFlaky => class.as_str().yellow(),
        c => c.as_str().red().bold(),
    }
}
