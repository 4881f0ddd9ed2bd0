use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason a probe produced no latency
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeError {
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Request timed out")]
    Timeout,
    #[error("Too many redirects")]
    TooManyRedirects,
    /// The probe outlived the round's collection budget
    #[error("Collection timeout")]
    CollectionTimeout,
    #[error("{0}")]
    Other(String),
}

impl From<&reqwest::Error> for ProbeError {
    fn from(error: &reqwest::Error) -> Self {
        // Connect timeouts report both flags; timeout wins
        if error.is_timeout() {
            ProbeError::Timeout
        } else if error.is_redirect() {
            ProbeError::TooManyRedirects
        } else if error.is_connect() {
            ProbeError::ConnectionFailed
        } else {
            ProbeError::Other(error.to_string())
        }
    }
}

/// Result of one probe attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// URL that was probed
    pub endpoint: String,

    /// When the probe started
    pub timestamp: DateTime<Utc>,

    pub success: bool,

    /// Request latency in milliseconds (success only)
    pub latency_ms: Option<f64>,

    /// HTTP status code (success only)
    pub status_code: Option<u16>,

    /// Failure descriptor (failure only)
    pub error: Option<ProbeError>,
}

impl ProbeOutcome {
    /// Create an outcome that has not been resolved yet
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timestamp: Utc::now(),
            success: false,
            latency_ms: None,
            status_code: None,
            error: None,
        }
    }

    /// Mark the probe as successful
    pub fn succeeded(mut self, latency_ms: f64, status_code: u16) -> Self {
        self.success = true;
        self.latency_ms = Some(latency_ms);
        self.status_code = Some(status_code);
        self.error = None;
        self
    }

    /// Mark the probe as failed
    pub fn failed(mut self, error: ProbeError) -> Self {
        self.success = false;
        self.latency_ms = None;
        self.status_code = None;
        self.error = Some(error);
        self
    }
}
