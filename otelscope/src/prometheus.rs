//! Prometheus range query client
//!
//! This module issues `query_range` requests against a Prometheus-compatible
//! HTTP API and decodes the matrix results. Every failure mode -- transport,
//! HTTP status, malformed body, non-success status -- surfaces as an [`Error`]
//! so callers can treat each query independently.

use std::{collections::BTreeMap, time::Duration};

use serde::Deserialize;
use tracing::{debug, trace};

/// Errors produced by [`Client`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request could not be built, sent, or its body read. Includes
    /// connection failures and timeouts.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The backend answered with a non-success HTTP status.
    #[error("HTTP Error: {status} - {message}")]
    Status {
        /// Status code returned by the backend
        status: reqwest::StatusCode,
        /// Error description from the body, if any
        message: String,
    },
    /// The response body was not the expected JSON document.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The backend reported a query error.
    #[error("Query error ({error_type}): {message}")]
    Backend {
        /// Backend error classification, e.g. `bad_data`
        error_type: String,
        /// Backend error description
        message: String,
    },
}

/// The time window and resolution of a range query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    /// Window start, unix seconds
    pub start: i64,
    /// Window end, unix seconds
    pub end: i64,
    /// Resolution in seconds
    pub step: u64,
}

impl Range {
    /// The window `[end - duration, end]` sampled every `step`.
    #[must_use]
    pub fn ending_at(end: i64, duration: Duration, step: Duration) -> Self {
        let span = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX);
        Self {
            start: end.saturating_sub(span),
            end,
            step: step.as_secs(),
        }
    }
}

/// One sample of a series
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "(f64, String)")]
pub struct Sample {
    /// Unix timestamp in seconds, possibly fractional
    pub timestamp: f64,
    /// The sample value exactly as the backend rendered it
    pub value: String,
}

impl From<(f64, String)> for Sample {
    fn from((timestamp, value): (f64, String)) -> Self {
        Self { timestamp, value }
    }
}

/// One label combination returned by a range query
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Series {
    /// Label set identifying the series, ordered by key
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    /// Samples in timestamp order
    #[serde(default)]
    pub values: Vec<Sample>,
}

#[derive(Debug, Deserialize)]
struct Response {
    status: String,
    #[serde(default)]
    data: Option<Data>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Data {
    #[serde(default)]
    result: Vec<Series>,
}

/// HTTP client bound to a single backend
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Create a new [`Client`]
    ///
    /// `base_url` is the backend root, e.g. `http://localhost:9090`. Every
    /// request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Evaluate `query` over `range`
    ///
    /// Returns every series the backend produced, which may be none.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success HTTP status, an
    /// undecodable body, or a backend status other than `success`.
    pub async fn query_range(&self, query: &str, range: Range) -> Result<Vec<Series>, Error> {
        let uri = format!("{}/api/v1/query_range", self.base_url);
        debug!("querying {uri}: {query}");
        let resp = self
            .http
            .get(&uri)
            .query(&[
                ("query", query.to_string()),
                ("start", range.start.to_string()),
                ("end", range.end.to_string()),
                ("step", range.step.to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        trace!("{uri} answered {status} with {} bytes", body.len());

        if !status.is_success() {
            // Prometheus puts the reason for a 4xx/5xx in the JSON body.
            let message = serde_json::from_str::<Response>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            return Err(Error::Status { status, message });
        }

        let response: Response = serde_json::from_str(&body)?;
        if response.status != "success" {
            return Err(Error::Backend {
                error_type: response.error_type.unwrap_or_else(|| response.status.clone()),
                message: response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(response.data.map(|d| d.result).unwrap_or_default())
    }
}
