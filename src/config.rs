// src/config.rs
//! Run configuration, built once at startup and handed to scoring and channels.
//!
//! Sources:
//! - environment (`Config::from_env`, `.env` loaded by the binary through dotenvy)
//! - a TOML file (`Config::load_from_file`); secrets set to `"ENV"` are read from
//!   the matching environment variable.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_MIN_STARS: u64 = 50;
pub const DEFAULT_TOP_N: usize = 20;
pub const DEFAULT_BLOCKED_LANGUAGE: &str = "cmn";
pub const DEFAULT_FEED_PATH: &str = "feed/rss.xml";
pub const DEFAULT_WINDOW_DAYS: u32 = 7;
pub const DEFAULT_CANDIDATES_PATH: &str = "fixtures/candidates.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub min_stars: u64,
    pub top_n: usize,
    /// ISO 639-3 code; descriptions detected as this language are dropped.
    pub blocked_language: Option<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_stars: DEFAULT_MIN_STARS,
            top_n: DEFAULT_TOP_N,
            blocked_language: Some(DEFAULT_BLOCKED_LANGUAGE.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub window_days: u32,
    pub title: String,
    pub link: String,
    pub description: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from(DEFAULT_FEED_PATH),
            window_days: DEFAULT_WINDOW_DAYS,
            title: "GitHub trends".to_string(),
            link: "https://github.com/mhadidg/gh-trends".to_string(),
            description: "Curated list of trending GitHub repositories".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestTransport {
    #[default]
    Buttondown,
    Smtp,
}

impl std::str::FromStr for DigestTransport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buttondown" => Ok(DigestTransport::Buttondown),
            "smtp" => Ok(DigestTransport::Smtp),
            other => Err(Error::Config(format!("unknown DIGEST_TRANSPORT {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub enabled: bool,
    pub transport: DigestTransport,
    pub api_key: Option<String>,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    pub enabled: bool,
    pub token: Option<String>,
    /// `owner/name` of the repository receiving the releases.
    pub repo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub feed: FeedConfig,
    pub digest: DigestConfig,
    pub release: ReleaseConfig,
    pub candidates_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            feed: FeedConfig::default(),
            digest: DigestConfig::default(),
            release: ReleaseConfig::default(),
            candidates_path: PathBuf::from(DEFAULT_CANDIDATES_PATH),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (env, map in tests). Unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Config::default();

        if let Some(v) = get("RELEASE_MIN_STARS") {
            cfg.scoring.min_stars = parse_non_negative("RELEASE_MIN_STARS", &v)?;
        }
        if let Some(v) = get("RELEASE_TOP_N") {
            cfg.scoring.top_n = parse_non_negative("RELEASE_TOP_N", &v)? as usize;
        }
        if let Some(v) = lookup("BLOCKED_LANGUAGE") {
            let v = v.trim().to_ascii_lowercase();
            // Explicitly empty disables the language filter.
            cfg.scoring.blocked_language = (!v.is_empty()).then_some(v);
        }

        cfg.feed.enabled = get("RSS_ENABLED").is_some_and(|v| is_truthy(&v));
        if let Some(v) = get("RSS_PATH") {
            cfg.feed.path = PathBuf::from(v);
        }
        if let Some(v) = get("RSS_WINDOW_DAYS") {
            let days = parse_non_negative("RSS_WINDOW_DAYS", &v)?;
            cfg.feed.window_days = u32::try_from(days)
                .map_err(|_| Error::Config(format!("RSS_WINDOW_DAYS out of range: {days}")))?;
        }
        if let Some(v) = get("RSS_TITLE") {
            cfg.feed.title = v;
        }
        if let Some(v) = get("RSS_LINK") {
            cfg.feed.link = v;
        }
        if let Some(v) = get("RSS_DESCRIPTION") {
            cfg.feed.description = v;
        }

        cfg.digest.enabled = get("SEND_ENABLED").is_some_and(|v| is_truthy(&v));
        if let Some(v) = get("DIGEST_TRANSPORT") {
            cfg.digest.transport = v.parse()?;
        }
        cfg.digest.api_key = get("BUTTONDOWN_API_KEY");
        cfg.digest.smtp = SmtpConfig {
            host: get("SMTP_HOST"),
            user: get("SMTP_USER"),
            pass: get("SMTP_PASS"),
            from: get("NOTIFY_EMAIL_FROM"),
            to: get("NOTIFY_EMAIL_TO"),
        };

        cfg.release.enabled = get("GITHUB_RELEASES_ENABLED").is_some_and(|v| is_truthy(&v));
        cfg.release.token = get("GITHUB_TOKEN");
        cfg.release.repo = get("GITHUB_RELEASES_REPO");

        if let Some(v) = get("CANDIDATES_PATH") {
            cfg.candidates_path = PathBuf::from(v);
        }

        Ok(cfg)
    }

    /// Load a TOML config file. Secret fields equal to `"ENV"` are resolved from env.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        let mut cfg: Config = toml::from_str(&data)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;

        let env = |key: &str| std::env::var(key).ok();
        resolve_env_secret(&mut cfg.digest.api_key, "BUTTONDOWN_API_KEY", env)?;
        resolve_env_secret(&mut cfg.digest.smtp.pass, "SMTP_PASS", env)?;
        resolve_env_secret(&mut cfg.release.token, "GITHUB_TOKEN", env)?;

        if let Some(lang) = cfg.scoring.blocked_language.as_mut() {
            *lang = lang.trim().to_ascii_lowercase();
        }
        Ok(cfg)
    }
}

fn is_truthy(v: &str) -> bool {
    v.eq_ignore_ascii_case("true") || v == "1"
}

fn parse_non_negative(key: &str, v: &str) -> Result<u64> {
    let n: i64 = v
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be an integer, got {v:?}")))?;
    u64::try_from(n).map_err(|_| Error::Config(format!("{key} must be >= 0, got {n}")))
}

fn resolve_env_secret<F>(slot: &mut Option<String>, var: &str, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let wants_env = slot
        .as_deref()
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("env"));
    if wants_env {
        let value = lookup(var).ok_or_else(|| Error::Config(format!("Missing {var} env var")))?;
        *slot = Some(value);
    }
    Ok(())
}
