//! Remote scoring service client.
//!
//! The service scores transactions and returns a fully aggregated payload.
//! Only the transaction list (and, when consistent, the reported period
//! buckets) is taken from it; the session re-aggregates locally.
//!
//! Wire contract:
//!   POST {base}/analyze       multipart/form-data, one `file` part
//!                             carrying the CSV and its file name
//!   GET  {base}/sample-data
//!   200 -> { transactions: [...], fraudComparison?: [...], ... }
//!   4xx/5xx -> { error: "..." }

use crate::{analysis::PeriodBucket, transaction::ScoredTransaction};
use serde::Deserialize;
use std::error::Error as _;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    #[error("scoring backend not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("scoring service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The part of the service response the desk consumes. Unknown fields
/// (statistics, riskDistribution, riskLevel) are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAnalysis {
    pub transactions: Vec<ScoredTransaction>,
    #[serde(default)]
    pub fraud_comparison: Option<Vec<PeriodBucket>>,
}

impl RemoteAnalysis {
    pub fn from_json(body: &str) -> Result<Self, AcquisitionError> {
        serde_json::from_str(body).map_err(|e| AcquisitionError::Malformed(e.to_string()))
    }
}

/// A source of scored batches. Implementations block until the call
/// completes or fails.
pub trait ScoringBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Score an uploaded transaction file.
    fn analyze(&self, file_name: &str, content: &str) -> Result<RemoteAnalysis, AcquisitionError>;

    /// Fetch a server-side sample batch.
    fn sample(&self) -> Result<RemoteAnalysis, AcquisitionError>;
}

/// Encode `content` as the single `file` part of a multipart form.
/// `boundary` must not occur in `content`.
pub fn encode_file_part(boundary: &str, file_name: &str, content: &str) -> String {
    let file_name: String = file_name
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .map(|c| if c == '"' { '\'' } else { c })
        .collect();
    format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\
         \r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    )
}

/// Used when no scoring URL is configured. Every call fails, so the
/// session always falls back to demo data.
pub struct OfflineBackend;

impl ScoringBackend for OfflineBackend {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn analyze(&self, _file_name: &str, _content: &str) -> Result<RemoteAnalysis, AcquisitionError> {
        Err(AcquisitionError::NotConfigured)
    }

    fn sample(&self) -> Result<RemoteAnalysis, AcquisitionError> {
        Err(AcquisitionError::NotConfigured)
    }
}

pub struct HttpScoringBackend {
    base_url: String,
    agent:    ureq::Agent,
}

impl HttpScoringBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn read(response: Result<ureq::Response, ureq::Error>) -> Result<RemoteAnalysis, AcquisitionError> {
        match response {
            Ok(resp) => {
                let body = resp
                    .into_string()
                    .map_err(|e| AcquisitionError::Malformed(e.to_string()))?;
                RemoteAnalysis::from_json(&body)
            }
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                let message = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| v["error"].as_str().map(str::to_string))
                    .unwrap_or(body);
                Err(AcquisitionError::Status { status, message })
            }
            Err(ureq::Error::Transport(transport)) => {
                let timed_out = transport
                    .source()
                    .and_then(|s| s.downcast_ref::<std::io::Error>())
                    .is_some_and(|io| {
                        matches!(
                            io.kind(),
                            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                        )
                    });
                if timed_out {
                    Err(AcquisitionError::Timeout)
                } else {
                    Err(AcquisitionError::Network(transport.to_string()))
                }
            }
        }
    }
}

impl ScoringBackend for HttpScoringBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    fn analyze(&self, file_name: &str, content: &str) -> Result<RemoteAnalysis, AcquisitionError> {
        let url = format!("{}/analyze", self.base_url);
        log::debug!("POST {url} ({file_name}, {} bytes)", content.len());
        let mut boundary = format!("riskdesk-{}", Uuid::new_v4().simple());
        while content.contains(&boundary) {
            boundary = format!("riskdesk-{}", Uuid::new_v4().simple());
        }
        Self::read(
            self.agent
                .post(&url)
                .set("Content-Type", &format!("multipart/form-data; boundary={boundary}"))
                .send_string(&encode_file_part(&boundary, file_name, content)),
        )
    }

    fn sample(&self) -> Result<RemoteAnalysis, AcquisitionError> {
        let url = format!("{}/sample-data", self.base_url);
        log::debug!("GET {url}");
        Self::read(self.agent.get(&url).call())
    }
}
