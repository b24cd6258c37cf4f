// src/channel/feed.rs
//! RSS channel: projects the ranked repos into the rolling feed file.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

use super::Channel;
use crate::config::FeedConfig;
use crate::error::Result;
use crate::feed::{FeedStore, FeedUpdate};
use crate::model::ScoredCandidate;

static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// RSS channel. Has no remote side, so the result id is a local run marker.
pub struct FeedChannel {
    enabled: bool,
    store: FeedStore,
}

impl FeedChannel {
    pub fn new(cfg: FeedConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            store: FeedStore::new(cfg),
        }
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    /// Publish with an explicit clock; returns the run marker and the update.
    pub async fn publish_at(
        &self,
        repos: &[ScoredCandidate],
        now: DateTime<Utc>,
    ) -> Result<(String, FeedUpdate)> {
        let update = self.store.publish_at(repos, now).await?;
        Ok((run_marker(now), update))
    }
}

/// `rss-<millis>-<seq>`; the sequence keeps markers distinct within one millisecond.
fn run_marker(now: DateTime<Utc>) -> String {
    let seq = RUN_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("rss-{}-{seq}", now.timestamp_millis())
}

#[async_trait]
impl Channel for FeedChannel {
    fn name(&self) -> &str {
        "rss"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn publish(&self, repos: &[ScoredCandidate]) -> Result<String> {
        let (marker, _) = self.publish_at(repos, Utc::now()).await?;
        Ok(marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_markers_are_unique() {
        let now = Utc::now();
        let a = run_marker(now);
        let b = run_marker(now);
        assert!(a.starts_with("rss-"));
        assert_ne!(a, b);
    }

    #[test]
    fn rss_has_no_render_body() {
        let ch = FeedChannel::new(FeedConfig::default());
        assert!(ch.render(&[]).unwrap().is_none());
        assert!(!ch.enabled());
    }
}
