// src/run.rs
//! One pipeline run: candidates -> scoring -> publish to all channels.

use std::sync::Arc;
use tracing::info;

use crate::channel::{Channel, DigestChannel, FeedChannel, ReleaseChannel};
use crate::config::Config;
use crate::error::Result;
use crate::model::{load_candidates, Candidate};
use crate::publish::publish_all;
use crate::render::{Render, Templates};
use crate::score::{LanguageDetector, Scorer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub discovered: usize,
    pub selected: usize,
    pub published: Vec<String>,
}

/// The statically configured channel set, in invocation order.
pub fn build_channels(cfg: &Config) -> Vec<Arc<dyn Channel>> {
    let renderer: Arc<dyn Render> = Arc::new(Templates);
    vec![
        Arc::new(DigestChannel::new(cfg.digest.clone(), renderer.clone())),
        Arc::new(ReleaseChannel::new(cfg.release.clone(), renderer)),
        Arc::new(FeedChannel::new(cfg.feed.clone())),
    ]
}

pub async fn run<D: LanguageDetector>(
    scorer: &Scorer<D>,
    candidates: &[Candidate],
    channels: &[Arc<dyn Channel>],
) -> Result<RunReport> {
    info!(target: "run", discovered = candidates.len(), "scoring candidates");
    let scored = scorer.score(candidates)?;
    info!(target: "run", selected = scored.len(), "repos selected");

    let published = publish_all(&scored, channels).await?;
    info!(target: "run", channels = published.len(), ids = ?published, "publish finished");

    Ok(RunReport {
        discovered: candidates.len(),
        selected: scored.len(),
        published,
    })
}

/// Load candidates from `cfg.candidates_path` and run with the default channels.
pub async fn run_from_config(cfg: &Config) -> Result<RunReport> {
    let candidates = load_candidates(&cfg.candidates_path).await?;
    let scorer = Scorer::new(cfg.scoring.clone());
    let channels = build_channels(cfg);
    run(&scorer, &candidates, &channels).await
}
