// src/feed/mod.rs
//! Incremental feed state: load, merge, dedup by guid, window-prune, persist.
//!
//! One run is a single read-modify-write of the feed file. There is no lock:
//! callers must not run two publishes against the same file at once.

pub mod rss;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use metrics::counter;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::error::{Error, Result};
use crate::model::{FeedItem, ScoredCandidate};

/// The full persisted item collection, newest first once merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedState {
    items: Vec<FeedItem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub received: usize,
    pub added: usize,
    pub pruned: usize,
}

impl FeedState {
    /// Build from arbitrary items, keeping the first occurrence of each guid.
    pub fn from_items(items: Vec<FeedItem>) -> Self {
        let mut seen = HashSet::with_capacity(items.len());
        let items = items
            .into_iter()
            .filter(|it| seen.insert(it.guid.clone()))
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, guid: &str) -> Option<&FeedItem> {
        self.items.iter().find(|it| it.guid == guid)
    }

    /// Merge `incoming` into the state.
    ///
    /// Items whose guid already exists are dropped so the existing entry keeps
    /// its `published_at`. Everything older than `now - window` is then removed,
    /// and the survivors are ordered by `published_at`, newest first.
    pub fn merge(
        mut self,
        incoming: Vec<FeedItem>,
        now: DateTime<Utc>,
        window: Duration,
    ) -> (Self, MergeStats) {
        let mut stats = MergeStats {
            received: incoming.len(),
            ..MergeStats::default()
        };

        let mut seen: HashSet<String> = self.items.iter().map(|it| it.guid.clone()).collect();
        for item in incoming {
            if seen.insert(item.guid.clone()) {
                self.items.push(item);
                stats.added += 1;
            }
        }

        // A window reaching past the representable range prunes nothing.
        if let Some(cutoff) = now.checked_sub_signed(window) {
            let before = self.items.len();
            self.items.retain(|it| it.published_at >= cutoff);
            stats.pruned = before - self.items.len();
        }

        // Stable: entries sharing a timestamp keep their rank order.
        self.items
            .sort_by(|a, b| b.published_at.cmp(&a.published_at));

        (self, stats)
    }
}

/// Outcome of one feed publish.
#[derive(Debug, Clone)]
pub struct FeedUpdate {
    pub state: FeedState,
    pub stats: MergeStats,
    pub published_at: DateTime<Utc>,
}

/// Reads and writes the feed document at `cfg.path`.
#[derive(Debug, Clone)]
pub struct FeedStore {
    cfg: FeedConfig,
}

impl FeedStore {
    pub fn new(cfg: FeedConfig) -> Self {
        Self { cfg }
    }

    pub fn path(&self) -> &Path {
        &self.cfg.path
    }

    pub fn window(&self) -> Duration {
        Duration::days(i64::from(self.cfg.window_days))
    }

    /// Load the persisted state. Absence or corruption yields an empty state.
    pub async fn load(&self) -> FeedState {
        let path = self.path();
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(target: "feed", path = %path.display(), "no existing feed, starting fresh");
                return FeedState::default();
            }
            Err(e) => {
                warn!(target: "feed", path = %path.display(), error = %e, "failed to read existing feed, starting fresh");
                return FeedState::default();
            }
        };

        match rss::decode(&raw) {
            Ok(decoded) => {
                if decoded.dropped > 0 {
                    warn!(target: "feed", dropped = decoded.dropped, "skipped unusable feed entries");
                }
                debug!(
                    target: "feed",
                    items = decoded.items.len(),
                    generated_at = ?rss::generated_at(&raw),
                    "loaded existing feed"
                );
                FeedState::from_items(decoded.items)
            }
            Err(e) => {
                warn!(target: "feed", path = %path.display(), error = %e, "failed to parse existing feed, starting fresh");
                FeedState::default()
            }
        }
    }

    /// Load, merge `repos` stamped with `now`, prune, and persist.
    pub async fn publish_at(
        &self,
        repos: &[ScoredCandidate],
        now: DateTime<Utc>,
    ) -> Result<FeedUpdate> {
        // The document stores whole seconds; stamp with the same precision.
        let now = now.trunc_subsecs(0);
        let existing = self.load().await;
        let existing_len = existing.len();

        let incoming: Vec<FeedItem> = repos
            .iter()
            .map(|repo| FeedItem::from_scored(repo, now))
            .collect();

        let (state, stats) = existing.merge(incoming, now, self.window());
        info!(
            target: "feed",
            received = stats.received,
            added = stats.added,
            pruned = stats.pruned,
            before = existing_len,
            after = state.len(),
            "feed updated"
        );
        counter!("feed_items_added_total").increment(stats.added as u64);
        counter!("feed_items_pruned_total").increment(stats.pruned as u64);

        self.persist(&state, now).await?;

        Ok(FeedUpdate {
            state,
            stats,
            published_at: now,
        })
    }

    /// Replace the feed file atomically: write a sibling temp file, then rename.
    pub async fn persist(&self, state: &FeedState, generated_at: DateTime<Utc>) -> Result<()> {
        let path = self.path();
        let xml = rss::encode(&self.cfg, state.items(), generated_at)?;

        let write_err = |source: std::io::Error| Error::FeedWrite {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp = temp_path(path);
        tokio::fs::write(&tmp, xml).await.map_err(write_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "feed.xml".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
    }

    fn item(guid: &str, ts: DateTime<Utc>) -> FeedItem {
        FeedItem {
            title: guid.to_string(),
            link: format!("https://github.com/{guid}"),
            description: "d".to_string(),
            published_at: ts,
            guid: guid.to_string(),
        }
    }

    #[test]
    fn from_items_repairs_duplicate_guids() {
        let state = FeedState::from_items(vec![
            item("a/x", t0()),
            item("a/x", t0() - Duration::days(1)),
            item("a/y", t0()),
        ]);
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("a/x").unwrap().published_at, t0());
    }

    #[test]
    fn existing_timestamp_wins_on_conflict() {
        let existing = FeedState::from_items(vec![item("a/x", t0())]);
        let later = t0() + Duration::days(2);
        let (state, stats) = existing.merge(
            vec![item("a/x", later), item("a/y", later)],
            later,
            Duration::days(7),
        );
        assert_eq!(stats, MergeStats { received: 2, added: 1, pruned: 0 });
        assert_eq!(state.get("a/x").unwrap().published_at, t0());
        assert_eq!(state.items()[0].guid, "a/y", "newest first");
    }

    #[test]
    fn duplicates_inside_one_batch_collapse() {
        let (state, stats) = FeedState::default().merge(
            vec![item("a/x", t0()), item("a/x", t0())],
            t0(),
            Duration::days(7),
        );
        assert_eq!(state.len(), 1);
        assert_eq!(stats.added, 1);
    }

    #[test]
    fn oversized_window_keeps_everything() {
        let existing = FeedState::from_items(vec![item("a/old", t0() - Duration::days(4000))]);
        let window = Duration::days(i64::from(u32::MAX));
        let (state, stats) = existing.merge(vec![item("a/new", t0())], t0(), window);
        assert_eq!(state.len(), 2);
        assert_eq!(stats.pruned, 0);
    }

    #[test]
    fn window_prunes_old_and_new_items_alike() {
        let existing = FeedState::from_items(vec![
            item("a/old", t0() - Duration::days(10)),
            item("a/edge", t0() - Duration::days(7)),
        ]);
        let (state, stats) = existing.merge(
            vec![item("a/stale-new", t0() - Duration::days(8)), item("a/fresh", t0())],
            t0(),
            Duration::days(7),
        );
        let guids: Vec<_> = state.items().iter().map(|i| i.guid.as_str()).collect();
        assert_eq!(guids, vec!["a/fresh", "a/edge"]);
        assert_eq!(stats.pruned, 2);
    }

    #[test]
    fn same_timestamp_keeps_input_order() {
        let (state, _) = FeedState::default().merge(
            vec![item("a/1", t0()), item("a/2", t0()), item("a/3", t0())],
            t0(),
            Duration::days(7),
        );
        let guids: Vec<_> = state.items().iter().map(|i| i.guid.as_str()).collect();
        assert_eq!(guids, vec!["a/1", "a/2", "a/3"]);
    }

    #[test]
    fn temp_file_is_a_hidden_sibling() {
        assert_eq!(
            temp_path(Path::new("feed/rss.xml")),
            PathBuf::from("feed/.rss.xml.tmp")
        );
    }
}
