//! gh-trends: score the acquired candidate list and publish to every enabled channel.
//!
//! Configuration comes from the environment (`.env` honoured in dev) or, when
//! `GH_TRENDS_CONFIG` is set, from that TOML file.

use anyhow::{Context, Result};
use gh_trends::{run::run_from_config, Config, Error};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gh_trends=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn load_config() -> Result<Config> {
    match std::env::var("GH_TRENDS_CONFIG") {
        Ok(path) => Config::load_from_file(&path).with_context(|| format!("loading config {path}")),
        Err(_) => Config::from_env().context("reading config from environment"),
    }
}

fn report_failure(err: &anyhow::Error) {
    match err.downcast_ref::<Error>() {
        Some(Error::Channel { channel, source }) => {
            error!(channel = %channel, cause = %source, status = ?source.status(), "publish failed");
            if let Error::Transport { body: Some(body), .. } = &**source {
                error!(channel = %channel, response = %body, "remote response");
            }
        }
        _ => error!("{err:#}"),
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    let outcome = async {
        let cfg = load_config()?;
        info!(
            min_stars = cfg.scoring.min_stars,
            top_n = cfg.scoring.top_n,
            digest = cfg.digest.enabled,
            release = cfg.release.enabled,
            rss = cfg.feed.enabled,
            "starting run"
        );
        let report = run_from_config(&cfg).await?;
        Ok::<_, anyhow::Error>(report)
    }
    .await;

    match outcome {
        Ok(report) => info!(
            discovered = report.discovered,
            selected = report.selected,
            published = ?report.published,
            "done"
        ),
        Err(e) => {
            report_failure(&e);
            std::process::exit(1);
        }
    }
}
