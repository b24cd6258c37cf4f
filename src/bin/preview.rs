//! Preview the release body for the current candidate list without publishing.

use anyhow::{Context, Result};
use gh_trends::model::load_candidates;
use gh_trends::render::{Render, Templates, RELEASE_TEMPLATE};
use gh_trends::{Config, Scorer};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = Config::from_env().context("reading config from environment")?;
    let candidates = load_candidates(&cfg.candidates_path)
        .await
        .with_context(|| format!("loading {}", cfg.candidates_path.display()))?;

    let scored = Scorer::new(cfg.scoring.clone()).score(&candidates)?;
    tracing::info!(discovered = candidates.len(), selected = scored.len(), "scored");

    let content = Templates.render(RELEASE_TEMPLATE, &scored)?;
    println!("{}", "─".repeat(50));
    println!("{content}");
    Ok(())
}
