// src/model.rs
//! Data handed between acquisition, scoring, channels and the feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// One discovered repository, as produced by acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name_with_owner: String,
    pub url: String,
    pub description: Option<String>,
    pub primary_language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub stargazer_count: u64,
}

impl Candidate {
    /// Required-shape check. Serde already rejects missing fields; this catches
    /// values that are present but empty.
    pub fn validate(&self) -> Result<()> {
        let missing = if self.id.trim().is_empty() {
            Some("id")
        } else if self.name_with_owner.trim().is_empty() {
            Some("nameWithOwner")
        } else if self.url.trim().is_empty() {
            Some("url")
        } else {
            None
        };

        match missing {
            Some(field) => Err(Error::Validation(format!(
                "candidate {:?} has empty {field}",
                self.name_with_owner
            ))),
            None => Ok(()),
        }
    }

    /// Description trimmed, `None` when absent or blank.
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// A candidate that survived filtering, annotated with its ranking key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: f64,
}

impl std::ops::Deref for ScoredCandidate {
    type Target = Candidate;

    fn deref(&self) -> &Candidate {
        &self.candidate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    Success,
    Failure,
}

/// Result of one channel's publish call.
#[derive(Debug)]
pub struct PublishOutcome {
    pub channel: String,
    pub status: PublishStatus,
    pub result_id: Option<String>,
    pub error: Option<Error>,
}

impl PublishOutcome {
    pub fn success(channel: impl Into<String>, result_id: String) -> Self {
        Self {
            channel: channel.into(),
            status: PublishStatus::Success,
            result_id: Some(result_id),
            error: None,
        }
    }

    pub fn failure(channel: impl Into<String>, error: Error) -> Self {
        Self {
            channel: channel.into(),
            status: PublishStatus::Failure,
            result_id: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PublishStatus::Success
    }
}

/// One persisted syndication entry. `guid` is the repository's `name_with_owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub guid: String,
}

impl FeedItem {
    pub const NO_DESCRIPTION: &'static str = "(no description)";

    /// Project a scored candidate into a feed entry stamped with `published_at`.
    pub fn from_scored(repo: &ScoredCandidate, published_at: DateTime<Utc>) -> Self {
        Self {
            title: repo.name_with_owner.clone(),
            link: repo.url.clone(),
            description: repo
                .description_text()
                .unwrap_or(Self::NO_DESCRIPTION)
                .to_string(),
            published_at,
            guid: repo.name_with_owner.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.link.trim().is_empty() || self.guid.trim().is_empty()
        {
            return Err(Error::Validation(format!(
                "feed item {:?} lacks title, link or guid",
                self.guid
            )));
        }
        Ok(())
    }
}

/// Parse a JSON array of candidates. A missing or mistyped field is a validation error.
pub fn parse_candidates(json: &str) -> Result<Vec<Candidate>> {
    let candidates: Vec<Candidate> =
        serde_json::from_str(json).map_err(|e| Error::Validation(format!("candidates: {e}")))?;
    for c in &candidates {
        c.validate()?;
    }
    Ok(candidates)
}

/// Read an already-acquired candidate list from disk.
pub async fn load_candidates(path: &Path) -> Result<Vec<Candidate>> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::Config(format!("cannot read candidates from {}: {e}", path.display()))
    })?;
    parse_candidates(&raw)
}
