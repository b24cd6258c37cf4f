// src/score.rs
//! Scoring engine: filter, rank by stars-per-hour velocity, bound.
//!
//! Pure apart from reading the wall clock in [`score`]; use [`score_at`] with an
//! explicit `now` for deterministic results.

use chrono::{DateTime, Utc};
use metrics::counter;
use std::cmp::Ordering;
use tracing::{info, warn};

use crate::config::ScoringConfig;
use crate::error::Result;
use crate::model::{Candidate, ScoredCandidate};

/// Natural-language detection, returning an ISO 639-3 code.
///
/// Detection on a handful of words is unreliable; false negatives are accepted.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<String>;
}

/// Default detector backed by `whatlang` trigram/script analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        whatlang::detect_lang(text).map(|lang| lang.code().to_string())
    }
}

impl<F> LanguageDetector for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn detect(&self, text: &str) -> Option<String> {
        self(text)
    }
}

pub struct Scorer<D = WhatlangDetector> {
    cfg: ScoringConfig,
    detector: D,
}

impl Scorer<WhatlangDetector> {
    pub fn new(cfg: ScoringConfig) -> Self {
        Self {
            cfg,
            detector: WhatlangDetector,
        }
    }
}

impl<D: LanguageDetector> Scorer<D> {
    pub fn with_detector(cfg: ScoringConfig, detector: D) -> Self {
        Self { cfg, detector }
    }

    pub fn score(&self, candidates: &[Candidate]) -> Result<Vec<ScoredCandidate>> {
        self.score_at(candidates, Utc::now())
    }

    /// Filter, score against `now`, order and truncate to `top_n`.
    pub fn score_at(
        &self,
        candidates: &[Candidate],
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredCandidate>> {
        for c in candidates {
            c.validate()?;
        }

        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .filter(|c| self.keep(c))
            .map(|c| ScoredCandidate {
                candidate: c.clone(),
                score: c.stargazer_count as f64 / hours_since(c.created_at, now),
            })
            .collect();

        scored.sort_by(rank_order);
        scored.truncate(self.cfg.top_n);
        Ok(scored)
    }

    fn keep(&self, repo: &Candidate) -> bool {
        let name = repo.name_with_owner.as_str();

        if repo.stargazer_count < self.cfg.min_stars {
            info!(target: "score", repo = name, stars = repo.stargazer_count, "below min stars, skipping");
            counter!("score_filtered_total", "reason" => "min_stars").increment(1);
            return false;
        }

        let Some(desc) = repo.description_text() else {
            warn!(target: "score", repo = name, "empty description, skipping");
            counter!("score_filtered_total", "reason" => "empty_description").increment(1);
            return false;
        };

        if let Some(blocked) = self.cfg.blocked_language.as_deref() {
            if self.detector.detect(desc).as_deref() == Some(blocked) {
                warn!(target: "score", repo = name, lang = blocked, "blocked language, skipping");
                counter!("score_filtered_total", "reason" => "blocked_language").increment(1);
                return false;
            }
        }

        true
    }
}

/// Hours between `created_at` and `now`, floored at one hour.
pub fn hours_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = (now - created_at).num_milliseconds() as f64 / 3_600_000.0;
    hours.max(1.0)
}

/// Descending score, then newer `created_at`, then `id` so the order never
/// depends on input position.
fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Convenience wrapper using the default detector.
pub fn score(candidates: &[Candidate], cfg: &ScoringConfig) -> Result<Vec<ScoredCandidate>> {
    Scorer::new(cfg.clone()).score(candidates)
}
