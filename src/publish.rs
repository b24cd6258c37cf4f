// src/publish.rs
//! Publish coordinator: fan one scored list out to every enabled channel.
//!
//! All enabled channels run concurrently on the calling task and every call is
//! awaited to completion. No retries and no global deadline are applied here.

use futures::future::join_all;
use metrics::counter;
use std::sync::Arc;
use tracing::{error, info};

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::model::{PublishOutcome, ScoredCandidate};

/// Publish to every enabled channel and report each outcome, in channel order.
pub async fn publish_outcomes(
    repos: &[ScoredCandidate],
    channels: &[Arc<dyn Channel>],
) -> Vec<PublishOutcome> {
    let enabled: Vec<&Arc<dyn Channel>> = channels.iter().filter(|c| c.enabled()).collect();

    if enabled.is_empty() {
        info!(target: "publish", "no channels enabled, skipping publication");
        return Vec::new();
    }
    counter!("publish_runs_total").increment(1);

    let calls = enabled.into_iter().map(|ch| async move {
        let name = ch.name().to_string();
        info!(target: "publish", channel = %name, "publishing");

        match ch.publish(repos).await {
            Ok(id) => {
                info!(target: "publish", channel = %name, id = %id, "published successfully");
                counter!("publish_channel_success_total", "channel" => name.clone()).increment(1);
                PublishOutcome::success(name, id)
            }
            Err(e) => {
                error!(target: "publish", channel = %name, error = %e, "publish failed");
                counter!("publish_channel_failure_total", "channel" => name.clone()).increment(1);
                PublishOutcome::failure(name, e)
            }
        }
    });

    // join_all keeps input order regardless of completion order.
    join_all(calls).await
}

/// Publish to every enabled channel.
///
/// Returns the result ids in channel order when all succeed. Otherwise fails
/// with the first failure in channel order, after every channel has settled;
/// the status of the channels that succeeded is not reported.
pub async fn publish_all(
    repos: &[ScoredCandidate],
    channels: &[Arc<dyn Channel>],
) -> Result<Vec<String>> {
    let outcomes = publish_outcomes(repos, channels).await;

    let mut ids = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        if let Some(source) = outcome.error {
            return Err(Error::Channel {
                channel: outcome.channel,
                source: Box::new(source),
            });
        }
        ids.extend(outcome.result_id);
    }
    Ok(ids)
}
