use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::redirect::Policy;
use tracing::debug;

use super::types::{ProbeError, ProbeOutcome};
use crate::config::MonitorSettings;

/// Redirect hops followed before a probe is reported as a redirect loop
const MAX_REDIRECTS: usize = 10;

/// A single latency measurement against one endpoint
///
/// Implementations never fail: every problem is folded into the returned
/// outcome.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, endpoint: &str, timeout: Duration) -> ProbeOutcome;
}

/// HTTP prober
///
/// Sends a HEAD request and, when content reads are enabled, follows a
/// successful HEAD with a GET whose latency replaces the header-only one.
pub struct HttpProber {
    client: reqwest::Client,
    content_read: bool,
}

impl HttpProber {
    pub fn new(user_agent: &str, content_read: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self { client, content_read })
    }

    pub fn from_settings(settings: &MonitorSettings) -> Result<Self> {
        Self::new(&settings.user_agent, settings.content_read)
    }

    /// Latency (ms) and status code of the final successful request
    ///
    /// HEAD and the follow-up GET share one `timeout` budget.
    async fn measure(&self, endpoint: &str, timeout: Duration) -> Result<(f64, u16), reqwest::Error> {
        let start = Instant::now();
        let deadline = start + timeout;
        let response = self.client.head(endpoint).timeout(timeout).send().await?;
        let mut latency = elapsed_ms(start);
        let mut status = response.status().as_u16();

        let remaining = deadline.saturating_duration_since(Instant::now());
        if self.content_read && remaining.is_zero() {
            debug!(endpoint, "No time left for a content read, keeping header latency");
        } else if self.content_read {
            let start = Instant::now();
            match self.read_content(endpoint, remaining).await {
                Ok(code) => {
                    latency = elapsed_ms(start);
                    status = code;
                }
                Err(e) => {
                    debug!(endpoint, "Content read failed, keeping header latency: {}", e);
                }
            }
        }

        Ok((latency, status))
    }

    async fn read_content(&self, endpoint: &str, timeout: Duration) -> Result<u16, reqwest::Error> {
        let response = self.client.get(endpoint).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        response.bytes().await?;
        Ok(status)
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &str, timeout: Duration) -> ProbeOutcome {
        let outcome = ProbeOutcome::new(endpoint);

        match self.measure(endpoint, timeout).await {
            Ok((latency_ms, status_code)) => {
                debug!(endpoint, latency_ms, status_code, "Probe succeeded");
                outcome.succeeded(latency_ms, status_code)
            }
            Err(e) => {
                let error = ProbeError::from(&e);
                debug!(endpoint, %error, "Probe failed: {}", e);
                outcome.failed(error)
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
