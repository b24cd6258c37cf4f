// tests/feed_channel.rs
use chrono::{DateTime, Duration, TimeZone, Utc};
use gh_trends::channel::{Channel, FeedChannel};
use gh_trends::config::FeedConfig;
use gh_trends::{Candidate, Error, ScoredCandidate};
use std::path::Path;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
}

fn scored(name: &str, desc: Option<&str>) -> ScoredCandidate {
    ScoredCandidate {
        candidate: Candidate {
            id: format!("id-{name}"),
            name_with_owner: name.to_string(),
            url: format!("https://github.com/{name}"),
            description: desc.map(str::to_string),
            primary_language: None,
            created_at: t0() - Duration::days(2),
            stargazer_count: 500,
        },
        score: 4.2,
    }
}

fn channel(path: &Path, window_days: u32) -> FeedChannel {
    FeedChannel::new(FeedConfig {
        enabled: true,
        path: path.to_path_buf(),
        window_days,
        ..FeedConfig::default()
    })
}

#[tokio::test]
async fn retention_example_across_three_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed/rss.xml");
    let ch = channel(&path, 7);
    let repo = scored("acme/fast-cache", Some("fast cache"));

    let (_, run1) = ch.publish_at(&[repo.clone()], t0()).await.unwrap();
    assert_eq!(run1.state.len(), 1);
    assert!(path.exists(), "parent directory is created on first write");

    let (_, run2) = ch.publish_at(&[repo], t0() + Duration::days(1)).await.unwrap();
    assert_eq!(run2.state.len(), 1);
    assert_eq!(run2.stats.added, 0);

    let (_, run3) = ch.publish_at(&[], t0() + Duration::days(8)).await.unwrap();
    assert_eq!(run3.state.len(), 0);
    assert_eq!(run3.stats.pruned, 1);
    assert!(ch.store().load().await.is_empty());
}

#[tokio::test]
async fn republishing_is_idempotent_and_keeps_age() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rss.xml");
    let ch = channel(&path, 7);
    let repos = vec![scored("acme/a", Some("first")), scored("acme/b", None)];

    ch.publish_at(&repos, t0()).await.unwrap();
    let first = ch.store().load().await;

    ch.publish_at(&repos, t0() + Duration::hours(6)).await.unwrap();
    let second = ch.store().load().await;

    assert_eq!(first.len(), 2);
    assert_eq!(second, first);
    assert_eq!(second.get("acme/a").unwrap().published_at, t0());
    assert_eq!(second.get("acme/b").unwrap().description, "(no description)");
}

#[tokio::test]
async fn new_items_come_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rss.xml");
    let ch = channel(&path, 7);

    ch.publish_at(&[scored("acme/old", Some("x"))], t0()).await.unwrap();
    let (_, update) = ch
        .publish_at(&[scored("acme/new", Some("y"))], t0() + Duration::days(2))
        .await
        .unwrap();

    let guids: Vec<_> = update.state.items().iter().map(|i| i.guid.as_str()).collect();
    assert_eq!(guids, vec!["acme/new", "acme/old"]);

    let xml = std::fs::read_to_string(&path).unwrap();
    let new_pos = xml.find("acme/new").unwrap();
    let old_pos = xml.find("acme/old").unwrap();
    assert!(new_pos < old_pos);
    assert!(xml.contains("<lastBuildDate>"));
}

#[tokio::test]
async fn corrupt_feed_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rss.xml");
    std::fs::write(&path, "<<< definitely not a feed").unwrap();

    let ch = channel(&path, 7);
    let (_, update) = ch.publish_at(&[scored("acme/a", Some("x"))], t0()).await.unwrap();
    assert_eq!(update.state.len(), 1);
    assert_eq!(ch.store().load().await.len(), 1);
}

#[tokio::test]
async fn write_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();

    let ch = channel(&blocker.join("rss.xml"), 7);
    let err = ch.publish(&[scored("acme/a", Some("x"))]).await.unwrap_err();
    assert!(matches!(err, Error::FeedWrite { .. }));
}

#[tokio::test]
async fn publish_returns_distinct_run_markers() {
    let dir = tempfile::tempdir().unwrap();
    let ch = channel(&dir.path().join("rss.xml"), 7);
    let a = ch.publish(&[]).await.unwrap();
    let b = ch.publish(&[]).await.unwrap();
    assert!(a.starts_with("rss-"));
    assert_ne!(a, b);
}

#[tokio::test]
async fn huge_window_disables_pruning() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rss.xml");
    let ch = channel(&path, 200_000_000);

    ch.publish_at(&[scored("acme/keep", Some("kept"))], t0()).await.unwrap();
    let (_, update) = ch
        .publish_at(&[], t0() + Duration::days(400))
        .await
        .unwrap();
    assert_eq!(update.state.len(), 1);
    assert_eq!(update.stats.pruned, 0);
}
