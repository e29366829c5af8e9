//! HTTP(S) fetch probe with plain-HTTP fallback.

use reqwest::{redirect::Policy, Client, Response};
use tracing::debug;
use vantage_core::{join_errors, HttpOutcome, ProbeError};

use crate::classify;
use crate::config::RunConfig;
use crate::error::{MeasureError, Result};
use crate::failure;

/// What the HTTP probe observed for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResult {
    /// URL after redirects, empty when neither attempt got a response
    pub final_url: String,
    /// Status of the response that was kept
    pub status: Option<u16>,
    /// One entry per failed attempt
    pub errors: Vec<ProbeError>,
    /// Bounded, lossily decoded body prefix
    pub snippet: String,
}

impl HttpResult {
    /// Classified outcome, block-page override included
    #[must_use]
    pub fn outcome(&self) -> HttpOutcome {
        classify::classify(self.status, &self.classified_errors(), &self.final_url, &self.snippet)
    }

    /// Error text the classifier inspects.
    ///
    /// The requested URL is left out so a host name such as
    /// `timeoutnews.in` cannot decide the label.
    fn classified_errors(&self) -> String {
        let errors: Vec<ProbeError> = self
            .errors
            .iter()
            .map(|e| ProbeError::new(e.kind, without_url(&e.detail)))
            .collect();
        join_errors(&errors)
    }
}

/// Drop the leading `{url}: ` that failed attempts are recorded with
fn without_url(detail: &str) -> &str {
    detail
        .split_once(": ")
        .filter(|(head, _)| head.starts_with("https://") || head.starts_with("http://"))
        .map_or(detail, |(_, rest)| rest)
}

/// Issues the HTTPS-then-HTTP request pair.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    snippet_limit: usize,
}

impl HttpProbe {
    /// Build the shared client from the run configuration
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.http_timeout)
            .redirect(Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .build()
            .map_err(|e| MeasureError::HttpClient(failure::error_chain(&e)))?;

        Ok(Self {
            client,
            snippet_limit: config.body_snippet_limit,
        })
    }

    /// Fetch `https://{domain}/`, falling back to `http://{domain}/`
    pub async fn fetch(&self, domain: &str) -> HttpResult {
        let primary = format!("https://{domain}/");
        let fallback = format!("http://{domain}/");
        self.fetch_urls(&primary, &fallback).await
    }

    /// Request `primary`; on any transport failure request `fallback` once.
    ///
    /// An HTTP error status is a response, not a failure, and never triggers
    /// the fallback.
    pub async fn fetch_urls(&self, primary: &str, fallback: &str) -> HttpResult {
        let mut result = HttpResult::default();

        for url in [primary, fallback] {
            match self.client.get(url).send().await {
                Ok(response) => {
                    result.status = Some(response.status().as_u16());
                    result.final_url = response.url().to_string();
                    result.snippet = self.read_snippet(response).await;
                    return result;
                }
                Err(e) => {
                    let err = failure::from_reqwest(url, e);
                    debug!(url, error = %err, "http attempt failed");
                    result.errors.push(err);
                }
            }
        }

        result
    }

    /// Read at most `snippet_limit` bytes; a body error keeps what was read
    async fn read_snippet(&self, mut response: Response) -> String {
        let mut body = Vec::with_capacity(self.snippet_limit.min(8192));
        while body.len() < self.snippet_limit {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let room = self.snippet_limit - body.len();
                    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(url = %response.url(), error = %e, "body read failed");
                    break;
                }
            }
        }
        String::from_utf8_lossy(&body).into_owned()
    }
}
