// src/channel/release.rs
//! GitHub release channel: one release per ISO week with the ranked list as notes.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{release_tag, send_with_retry, subject, Channel, HttpPolicy};
use crate::config::ReleaseConfig;
use crate::error::{Error, Result};
use crate::model::ScoredCandidate;
use crate::render::{Render, RELEASE_TEMPLATE};

pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Publishes the ranking as a GitHub release on a configured repository.
pub struct ReleaseChannel {
    cfg: ReleaseConfig,
    renderer: Arc<dyn Render>,
    client: Client,
    base_url: String,
    policy: HttpPolicy,
}

#[derive(Debug, Serialize, PartialEq)]
struct ReleasePayload {
    tag_name: String,
    name: String,
    body: String,
    draft: bool,
    prerelease: bool,
}

impl ReleasePayload {
    fn new(now: DateTime<Utc>, body: String) -> Self {
        Self {
            tag_name: release_tag(now),
            name: subject(now),
            body,
            draft: false,
            prerelease: false,
        }
    }
}

impl ReleaseChannel {
    pub fn new(cfg: ReleaseConfig, renderer: Arc<dyn Render>) -> Self {
        Self {
            cfg,
            renderer,
            client: Client::new(),
            base_url: GITHUB_API_URL.to_string(),
            policy: HttpPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.policy.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, attempts: u8) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let token = self.cfg.token.as_deref().ok_or_else(|| {
            Error::Config("GITHUB_TOKEN required when GITHUB_RELEASES_ENABLED=true".into())
        })?;
        let repo = self.cfg.repo.as_deref().ok_or_else(|| {
            Error::Config("GITHUB_RELEASES_REPO required when GITHUB_RELEASES_ENABLED=true".into())
        })?;
        Ok((token, repo))
    }
}

#[async_trait]
impl Channel for ReleaseChannel {
    fn name(&self) -> &str {
        "github-releases"
    }

    fn enabled(&self) -> bool {
        self.cfg.enabled
    }

    fn render(&self, repos: &[ScoredCandidate]) -> Result<Option<String>> {
        self.renderer.render(RELEASE_TEMPLATE, repos).map(Some)
    }

    async fn publish(&self, repos: &[ScoredCandidate]) -> Result<String> {
        let (token, repo) = self.credentials()?;
        let payload = ReleasePayload::new(Utc::now(), self.render(repos)?.unwrap_or_default());
        let url = format!("{}/repos/{repo}/releases", self.base_url.trim_end_matches('/'));

        let rsp = send_with_retry("github", "release creation failed", self.policy, || {
            self.client
                .post(&url)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header(ACCEPT, "application/vnd.github+json")
                .header(USER_AGENT, "gh-trends")
                .json(&payload)
        })
        .await?;

        let json: serde_json::Value = rsp
            .json()
            .await
            .map_err(|e| Error::transport("github", format!("malformed response: {e}")))?;
        let id = match json.get("id") {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(Error::transport("github", "release creation returned no ID")),
        };

        info!(target: "release", id = %id, tag = %payload.tag_name, repo, "release created");
        Ok(id)
    }
}
