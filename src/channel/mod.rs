// src/channel/mod.rs
//! Output channels. Each one decides for itself whether it is enabled and how
//! it retries; the coordinator only fans out and collects.

pub mod digest;
pub mod feed;
pub mod release;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::ScoredCandidate;

pub use digest::DigestChannel;
pub use feed::FeedChannel;
pub use release::ReleaseChannel;

#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Synchronous capability check; must not perform I/O.
    fn enabled(&self) -> bool;

    /// Channel-specific content shaping. `None` when the channel sends no body.
    fn render(&self, _repos: &[ScoredCandidate]) -> Result<Option<String>> {
        Ok(None)
    }

    /// Transmit and return an identifier for what was published.
    async fn publish(&self, repos: &[ScoredCandidate]) -> Result<String>;
}

/// `GitHub Trends — 2025-W36` for the ISO week containing `now`.
pub fn subject(now: DateTime<Utc>) -> String {
    let week = now.iso_week();
    format!("GitHub Trends — {}-W{:02}", week.year(), week.week())
}

/// `release-2025-W36` for the ISO week containing `now`.
pub fn release_tag(now: DateTime<Utc>) -> String {
    let week = now.iso_week();
    format!("release-{}-W{:02}", week.year(), week.week())
}

/// Timeout and retry budget for one HTTP channel call.
#[derive(Debug, Clone, Copy)]
pub struct HttpPolicy {
    pub timeout: Duration,
    pub max_attempts: u8,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
        }
    }
}

/// Send the request built by `build`, retrying network errors, 5xx and 429
/// with exponential backoff. Any other non-2xx fails immediately.
pub(crate) async fn send_with_retry<F>(
    service: &'static str,
    what: &str,
    policy: HttpPolicy,
    build: F,
) -> Result<reqwest::Response>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt: u8 = 0;
    loop {
        attempt += 1;
        let last = attempt >= attempts;

        match build().timeout(policy.timeout).send().await {
            Ok(rsp) if rsp.status().is_success() => return Ok(rsp),
            Ok(rsp) => {
                let status = rsp.status();
                if is_retryable(status) && !last {
                    warn!(target: "publish", service, attempt, status = status.as_u16(), "{what}: retrying");
                    backoff(attempt).await;
                    continue;
                }
                let body = rsp.text().await.ok().filter(|b| !b.is_empty());
                return Err(Error::Transport {
                    service,
                    message: what.to_string(),
                    status: Some(status.as_u16()),
                    body,
                });
            }
            Err(e) => {
                if !last {
                    warn!(target: "publish", service, attempt, error = %e, "{what}: retrying");
                    backoff(attempt).await;
                    continue;
                }
                return Err(Error::transport(service, format!("{what}: {e}")));
            }
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

async fn backoff(attempt: u8) {
    tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn subject_and_tag_use_iso_week() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        assert_eq!(subject(now), "GitHub Trends — 2025-W36");
        assert_eq!(release_tag(now), "release-2025-W36");

        // Jan 1st 2027 belongs to the last ISO week of 2026.
        let now = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(release_tag(now), "release-2026-W53");
    }

    #[test]
    fn only_server_errors_and_throttling_retry() {
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::UNPROCESSABLE_ENTITY));
    }
}
