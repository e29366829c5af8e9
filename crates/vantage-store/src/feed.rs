//! Ingestion of the external measurement feed.
//!
//! [`FeedFetcher`] pages through the OONI measurements API; [`clean_feed`]
//! reduces the raw measurements to [`FeedRecord`]s for the project's domains.

use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;
use vantage_core::FeedRecord;

use crate::domains::canonical_domain;
use crate::error::{Result, StoreError};

/// Public measurements endpoint
pub const DEFAULT_FEED_URL: &str = "https://api.ooni.io/api/v1/measurements";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
const DEFAULT_PAGES_PER_SECOND: u32 = 3;

/// Which measurements to pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// Probe country code
    pub probe_cc: String,
    /// Feed test name
    pub test_name: String,
    /// Earliest measurement date, `YYYY-MM-DD`
    pub since: String,
    /// Stop after this many measurements
    pub max_measurements: usize,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            probe_cc: "IN".to_string(),
            test_name: "web_connectivity".to_string(),
            since: "2024-01-01".to_string(),
            max_measurements: 8000,
        }
    }
}

/// Analysis block of a raw measurement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedAnalysis {
    /// Analysis-level anomaly
    #[serde(default)]
    pub anomaly: Option<Value>,
    /// General blocking signal
    #[serde(default)]
    pub blocking_general: Option<Value>,
    /// Blocking type
    #[serde(default)]
    pub blocking_type: Option<Value>,
}

/// One raw measurement as returned by the feed API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedMeasurement {
    /// Tested input, usually a URL
    #[serde(default)]
    pub input: Option<String>,
    /// Start time
    #[serde(default)]
    pub measurement_start_time: Option<Value>,
    /// Probe country code
    #[serde(default)]
    pub probe_cc: Option<Value>,
    /// Probe network
    #[serde(default)]
    pub probe_asn: Option<Value>,
    /// Test name
    #[serde(default)]
    pub test_name: Option<Value>,
    /// Transport failure
    #[serde(default)]
    pub failure: Option<Value>,
    /// Anomaly flag
    #[serde(default)]
    pub anomaly: Option<Value>,
    /// Analysis block
    #[serde(default)]
    pub analysis: Option<FeedAnalysis>,
}

#[derive(Debug, Deserialize)]
struct PageMetadata {
    #[serde(default)]
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    results: Option<Vec<FeedMeasurement>>,
    #[serde(default)]
    next_url: Option<String>,
    #[serde(default)]
    metadata: Option<PageMetadata>,
}

impl Page {
    fn next(&self) -> Option<String> {
        self.next_url
            .clone()
            .or_else(|| self.metadata.as_ref().and_then(|m| m.next_url.clone()))
            .filter(|u| !u.trim().is_empty())
    }
}

type PageLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Paginating feed client with pacing and retries.
#[derive(Clone)]
pub struct FeedFetcher {
    inner: Arc<FetcherInner>,
}

struct FetcherInner {
    http: Client,
    base_url: String,
    limiter: PageLimiter,
    retries: u32,
    backoff: Duration,
}

impl FeedFetcher {
    /// Fetcher against the public endpoint with default settings
    pub fn new() -> Result<Self> {
        FeedFetcherBuilder::new().build()
    }

    /// Builder for custom settings
    #[must_use]
    pub fn builder() -> FeedFetcherBuilder {
        FeedFetcherBuilder::new()
    }

    /// Fetch measurements page by page, following `next_url` until the
    /// feed runs out or `query.max_measurements` is reached.
    #[instrument(skip(self), fields(probe_cc = %query.probe_cc, since = %query.since))]
    pub async fn fetch(&self, query: &FeedQuery) -> Result<Vec<FeedMeasurement>> {
        let mut measurements = Vec::new();
        let params = [
            ("probe_cc", query.probe_cc.as_str()),
            ("test_name", query.test_name.as_str()),
            ("since", query.since.as_str()),
        ];
        let mut next = Some(build_url(&self.inner.base_url, &params)?);

        while let Some(url) = next.take() {
            if measurements.len() >= query.max_measurements {
                break;
            }
            let page = self.fetch_page(&url).await?;
            next = page.next();
            let batch = page.results.unwrap_or_default();
            debug!(url = %url, batch = batch.len(), "fetched feed page");
            measurements.extend(batch);
        }

        measurements.truncate(query.max_measurements);
        info!(count = measurements.len(), "fetched feed measurements");
        Ok(measurements)
    }

    async fn fetch_page(&self, url: &str) -> Result<Page> {
        let inner = &self.inner;
        let mut last_error = String::new();
        for attempt in 1..=inner.retries {
            inner.limiter.until_ready().await;
            match self.try_page(url).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    warn!(url, attempt, error = %e, "feed page failed");
                    last_error = e;
                    if attempt < inner.retries {
                        tokio::time::sleep(inner.backoff).await;
                    }
                }
            }
        }
        Err(StoreError::FetchExhausted {
            url: url.to_string(),
            attempts: inner.retries,
            last_error,
        })
    }

    async fn try_page(&self, url: &str) -> std::result::Result<Page, String> {
        let response = self
            .inner
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| e.without_url().to_string())?;
        response
            .json::<Page>()
            .await
            .map_err(|e| e.without_url().to_string())
    }
}

fn build_url(base: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut url = Url::parse(base).map_err(|e| StoreError::Client(format!("{base}: {e}")))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url.into())
}

/// Builder for a [`FeedFetcher`].
#[derive(Debug, Clone)]
pub struct FeedFetcherBuilder {
    base_url: String,
    timeout: Duration,
    retries: u32,
    backoff: Duration,
    pages_per_second: u32,
}

impl Default for FeedFetcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedFetcherBuilder {
    /// Defaults: public endpoint, 20 s timeout, 3 attempts, 1 s backoff
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_FEED_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            backoff: DEFAULT_BACKOFF,
            pages_per_second: DEFAULT_PAGES_PER_SECOND,
        }
    }

    /// Set the endpoint (useful for testing)
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set attempts per page; at least one
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    /// Set the pause between attempts
    #[must_use]
    pub const fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the page rate
    #[must_use]
    pub const fn pages_per_second(mut self, rate: u32) -> Self {
        self.pages_per_second = rate;
        self
    }

    /// Build the fetcher
    pub fn build(self) -> Result<FeedFetcher> {
        let http = Client::builder()
            .timeout(self.timeout)
            .user_agent(format!("vantage/{}", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;
        let quota = Quota::per_second(NonZeroU32::new(self.pages_per_second).unwrap_or(NonZeroU32::MIN));

        Ok(FeedFetcher {
            inner: Arc::new(FetcherInner {
                http,
                base_url: self.base_url,
                limiter: RateLimiter::direct(quota),
                retries: self.retries,
                backoff: self.backoff,
            }),
        })
    }
}

/// Bare lower-case host of a feed input, without a leading `www.`
#[must_use]
pub fn normalize_host(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let parsed = if input.contains("://") {
        Url::parse(input)
    } else {
        Url::parse(&format!("http://{input}"))
    };
    let host = parsed.ok()?.host_str()?.to_string();
    Some(canonical_domain(&host)).filter(|h| !h.is_empty())
}

/// Render a JSON signal the way the cleaned feed stores it
fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Keep measurements of allowed domains, reduced to the stored fields.
///
/// `allowed` holds canonical names. Fails when nothing matches.
pub fn clean_feed(measurements: &[FeedMeasurement], allowed: &BTreeSet<String>) -> Result<Vec<FeedRecord>> {
    let cleaned: Vec<FeedRecord> = measurements
        .iter()
        .filter_map(|m| {
            let input = m.input.as_deref().unwrap_or_default();
            let domain = normalize_host(input).filter(|d| allowed.contains(d))?;
            let analysis = m.analysis.clone().unwrap_or_default();
            Some(FeedRecord {
                measurement_start_time: render(m.measurement_start_time.as_ref()),
                domain,
                input: input.to_string(),
                probe_cc: render(m.probe_cc.as_ref()),
                probe_asn: render(m.probe_asn.as_ref()),
                test_name: render(m.test_name.as_ref()),
                failure: render(m.failure.as_ref()),
                anomaly: render(m.anomaly.as_ref()),
                analysis_anomaly: render(analysis.anomaly.as_ref()),
                blocking_general: render(analysis.blocking_general.as_ref()),
                blocking_type: render(analysis.blocking_type.as_ref()),
            })
        })
        .collect();

    if cleaned.is_empty() {
        return Err(StoreError::NoFeedMatches {
            allowed: allowed.len(),
        });
    }
    info!(fetched = measurements.len(), kept = cleaned.len(), "cleaned feed");
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(server: &MockServer) -> FeedFetcher {
        FeedFetcher::builder()
            .base_url(format!("{}/api/v1/measurements", server.uri()))
            .backoff(Duration::from_millis(10))
            .pages_per_second(100)
            .build()
            .unwrap()
    }

    fn measurement(input: &str) -> Value {
        json!({
            "input": input,
            "measurement_start_time": "2025-01-01T00:00:00Z",
            "probe_cc": "IN",
            "probe_asn": "AS55836",
            "test_name": "web_connectivity",
            "failure": null,
            "anomaly": true,
            "analysis": { "blocking_general": 1.0, "blocking_type": "dns" }
        })
    }

    #[tokio::test]
    async fn follows_next_url_in_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/measurements"))
            .and(query_param("probe_cc", "IN"))
            .and(query_param("since", "2024-01-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [measurement("https://a.in/"), measurement("http://b.in")],
                "metadata": { "next_url": format!("{}/page/2", server.uri()) }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [measurement("https://c.in/")],
                "next_url": null
            })))
            .mount(&server)
            .await;

        let fetched = fetcher(&server).fetch(&FeedQuery::default()).await.unwrap();
        let inputs: Vec<_> = fetched.iter().filter_map(|m| m.input.as_deref()).collect();
        assert_eq!(inputs, ["https://a.in/", "http://b.in", "https://c.in/"]);
    }

    #[tokio::test]
    async fn caps_at_max_measurements() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/measurements"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [measurement("a.in"), measurement("b.in")],
                "next_url": format!("{}/api/v1/measurements", server.uri())
            })))
            .mount(&server)
            .await;

        let query = FeedQuery {
            max_measurements: 3,
            ..FeedQuery::default()
        };
        let fetched = fetcher(&server).fetch(&query).await.unwrap();
        assert_eq!(fetched.len(), 3);
    }

    #[tokio::test]
    async fn retries_a_failing_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [measurement("a.in")] })))
            .mount(&server)
            .await;

        let fetched = fetcher(&server).fetch(&FeedQuery::default()).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = fetcher(&server).fetch(&FeedQuery::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::FetchExhausted { attempts: 3, .. }), "{err}");
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[test]
    fn hosts_are_normalized() {
        assert_eq!(normalize_host("https://www.Example.IN/path?q=1").as_deref(), Some("example.in"));
        assert_eq!(normalize_host("example.in").as_deref(), Some("example.in"));
        assert_eq!(normalize_host("http://sub.example.in:8080/").as_deref(), Some("sub.example.in"));
        assert_eq!(normalize_host(""), None);
    }

    #[test]
    fn cleaning_keeps_allowed_domains_only() {
        let raw: Vec<FeedMeasurement> = serde_json::from_value(json!([
            measurement("https://www.a.in/"),
            measurement("https://other.org/"),
            { "input": null },
        ]))
        .unwrap();
        let allowed: BTreeSet<String> = ["a.in".to_string()].into();

        let cleaned = clean_feed(&raw, &allowed).unwrap();
        assert_eq!(cleaned.len(), 1);
        let record = &cleaned[0];
        assert_eq!(record.domain, "a.in");
        assert_eq!(record.input, "https://www.a.in/");
        assert_eq!(record.failure, "");
        assert_eq!(record.anomaly, "True");
        assert_eq!(record.blocking_general, "1.0");
        assert_eq!(record.blocking_type, "dns");
    }

    #[test]
    fn cleaning_to_nothing_is_an_error() {
        let raw = vec![FeedMeasurement {
            input: Some("https://other.org/".to_string()),
            ..FeedMeasurement::default()
        }];
        let allowed: BTreeSet<String> = ["a.in".to_string()].into();
        assert!(matches!(
            clean_feed(&raw, &allowed).unwrap_err(),
            StoreError::NoFeedMatches { allowed: 1 }
        ));
    }
}
