//! Configuration management.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use vantage_probe::{RunConfig, DEFAULT_PUBLIC_RESOLVER, DEFAULT_USER_AGENT};
use vantage_store::FeedQuery;

use crate::output::OutputFormat;

/// CLI configuration, read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding every store.
    pub data_dir: PathBuf,

    /// Vantage label for new runs and the local side of comparisons.
    pub vantage: String,

    /// Remote side of comparisons.
    pub remote_vantage: String,

    /// Default output format.
    pub output_format: Option<OutputFormat>,

    /// Probe settings.
    pub probe: ProbeSettings,

    /// External feed settings.
    pub feed: FeedSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            vantage: "IN-home".to_string(),
            remote_vantage: "VPN-EU".to_string(),
            output_format: None,
            probe: ProbeSettings::default(),
            feed: FeedSettings::default(),
        }
    }
}

/// Probe timeouts and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Seconds per resolver lookup.
    pub dns_timeout_secs: f64,
    /// Seconds per TCP connect.
    pub tcp_timeout_secs: f64,
    /// Seconds per HTTP attempt.
    pub http_timeout_secs: f64,
    /// Seconds for the TLS handshake.
    pub tls_timeout_secs: f64,
    /// User-Agent for HTTP requests.
    pub user_agent: String,
    /// Public resolver address.
    pub public_resolver: IpAddr,
    /// Body bytes kept per response.
    pub body_snippet_limit: usize,
    /// Redirects followed per attempt.
    pub max_redirects: usize,
    /// Rows per store flush.
    pub batch_size: usize,
    /// Only measure the first N included domains.
    pub domain_limit: Option<usize>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            dns_timeout_secs: 4.0,
            tcp_timeout_secs: 5.0,
            http_timeout_secs: 10.0,
            tls_timeout_secs: 6.0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            public_resolver: DEFAULT_PUBLIC_RESOLVER,
            body_snippet_limit: 2000,
            max_redirects: 10,
            batch_size: 25,
            domain_limit: None,
        }
    }
}

fn seconds(value: f64, name: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("invalid {name}: {value}"))
}

impl ProbeSettings {
    /// Build the per-run probe configuration.
    pub fn run_config(&self) -> Result<RunConfig> {
        Ok(RunConfig {
            domain_limit: self.domain_limit,
            dns_timeout: seconds(self.dns_timeout_secs, "probe.dns_timeout_secs")?,
            tcp_timeout: seconds(self.tcp_timeout_secs, "probe.tcp_timeout_secs")?,
            http_timeout: seconds(self.http_timeout_secs, "probe.http_timeout_secs")?,
            tls_timeout: seconds(self.tls_timeout_secs, "probe.tls_timeout_secs")?,
            user_agent: self.user_agent.clone(),
            public_resolver: self.public_resolver,
            body_snippet_limit: self.body_snippet_limit,
            max_redirects: self.max_redirects,
            batch_size: self.batch_size.max(1),
        })
    }
}

/// Feed query and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Probe country code.
    pub probe_cc: String,
    /// Feed test name.
    pub test_name: String,
    /// Earliest measurement date.
    pub since: String,
    /// Cap on fetched measurements.
    pub max_measurements: usize,
    /// Page request rate.
    pub pages_per_second: u32,
    /// Attempts per page.
    pub retries: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        let query = FeedQuery::default();
        Self {
            probe_cc: query.probe_cc,
            test_name: query.test_name,
            since: query.since,
            max_measurements: query.max_measurements,
            pages_per_second: 3,
            retries: 3,
        }
    }
}

impl FeedSettings {
    /// The query these settings describe.
    pub fn query(&self) -> FeedQuery {
        FeedQuery {
            probe_cc: self.probe_cc.clone(),
            test_name: self.test_name.clone(),
            since: self.since.clone(),
            max_measurements: self.max_measurements,
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("org", "vantage", "vantage")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Resolve the file to load: the explicit one, else the default location.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        explicit.map_or_else(Self::default_path, |p| Ok(p.to_path_buf()))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit)?;

        if !path.exists() {
            if explicit.is_some() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse TOML content.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.vantage, "IN-home");
        assert_eq!(config.remote_vantage, "VPN-EU");
        assert_eq!(config.feed.max_measurements, 8000);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            vantage = "IN-mobile"

            [probe]
            http_timeout_secs = 2.5
            public_resolver = "1.1.1.1"
            domain_limit = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.vantage, "IN-mobile");
        assert_eq!(config.data_dir, PathBuf::from("data"));

        let run = config.probe.run_config().unwrap();
        assert_eq!(run.http_timeout, Duration::from_millis(2500));
        assert_eq!(run.dns_timeout, Duration::from_secs(4));
        assert_eq!(run.public_resolver.to_string(), "1.1.1.1");
        assert_eq!(run.domain_limit, Some(3));
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let config = Config::parse("[probe]\ntcp_timeout_secs = -1.0\n").unwrap();
        assert!(config.probe.run_config().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }

    #[test]
    fn output_format_accepts_aliases() {
        let config = Config::parse("output_format = \"table\"\n").unwrap();
        assert_eq!(config.output_format, Some(OutputFormat::Pretty));

        let config = Config::parse("output_format = \"YML\"\n").unwrap();
        assert_eq!(config.output_format, Some(OutputFormat::Yaml));

        assert!(Config::parse("output_format = \"xml\"\n").is_err());
    }
}
