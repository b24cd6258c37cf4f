// src/render.rs
//! Content rendering for the digest and release channels.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::fmt::Write;

use crate::error::{Error, Result};
use crate::model::ScoredCandidate;

pub const NEWSLETTER_TEMPLATE: &str = "newsletter.md";
pub const RELEASE_TEMPLATE: &str = "release.md";

const DESCRIPTION_MAX_CHARS: usize = 160;

pub trait Render: Send + Sync {
    fn render(&self, template: &str, repos: &[ScoredCandidate]) -> Result<String>;
}

/// Built-in markdown templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Templates;

impl Templates {
    pub fn render_at(
        &self,
        template: &str,
        repos: &[ScoredCandidate],
        now: DateTime<Utc>,
    ) -> Result<String> {
        let date = now.format("%Y-%m-%d");
        let mut out = String::new();

        match template {
            NEWSLETTER_TEMPLATE => {
                let _ = writeln!(out, "Fresh repositories picking up stars this week ({date}).\n");
                for (i, repo) in repos.iter().enumerate() {
                    let _ = writeln!(out, "{}. **[{}]({})**", i + 1, repo.name_with_owner, repo.url);
                    write_entry_body(&mut out, repo, "   ");
                }
            }
            RELEASE_TEMPLATE => {
                let _ = writeln!(out, "## Trending repositories ({date})\n");
                for repo in repos {
                    let _ = writeln!(out, "### [{}]({})", repo.name_with_owner, repo.url);
                    write_entry_body(&mut out, repo, "");
                }
            }
            other => return Err(Error::Config(format!("unknown template {other:?}"))),
        }

        if repos.is_empty() {
            out.push_str("_Nothing trending made the cut this time._\n");
        }
        Ok(out)
    }
}

impl Render for Templates {
    fn render(&self, template: &str, repos: &[ScoredCandidate]) -> Result<String> {
        self.render_at(template, repos, Utc::now())
    }
}

fn write_entry_body(out: &mut String, repo: &ScoredCandidate, indent: &str) {
    if let Some(desc) = repo.description_text() {
        let _ = writeln!(
            out,
            "{indent}{}",
            truncate(&clean_description(desc), DESCRIPTION_MAX_CHARS)
        );
    }
    let stars = format_number(repo.stargazer_count);
    match repo.primary_language.as_deref() {
        Some(lang) => {
            let _ = writeln!(out, "{indent}★ {stars} · {lang}\n");
        }
        None => {
            let _ = writeln!(out, "{indent}★ {stars}\n");
        }
    }
}

/// Decode HTML entities and collapse whitespace.
pub fn clean_description(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    let decoded = html_escape::decode_html_entities(s);
    re_ws.replace_all(decoded.trim(), " ").into_owned()
}

/// Cut to `len` chars, dropping a trailing space, and append an ellipsis.
pub fn truncate(s: &str, len: usize) -> String {
    if s.chars().count() <= len {
        return s.to_string();
    }
    let cut: String = s.chars().take(len).collect();
    format!("{}…", cut.trim_end())
}

/// `1234567` -> `1,234,567`.
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::scored;
    use chrono::TimeZone;

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn truncation_adds_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("hello world", 6), "hello…");
        assert_eq!(truncate("ěščřž", 3), "ěšč…");
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(clean_description("Fast &amp;  small\n cache"), "Fast & small cache");
    }

    #[test]
    fn release_lists_every_repo() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let repos = vec![scored("acme/a", Some("first")), scored("acme/b", None)];
        let out = Templates.render_at(RELEASE_TEMPLATE, &repos, now).unwrap();
        assert!(out.contains("2025-09-06"));
        assert!(out.contains("### [acme/a](https://github.com/acme/a)"));
        assert!(out.contains("first"));
        assert!(out.contains("### [acme/b]"));
        assert!(out.contains("★ 100 · Rust"));
    }

    #[test]
    fn newsletter_is_numbered() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let repos = vec![scored("acme/a", Some("x")), scored("acme/b", Some("y"))];
        let out = Templates.render_at(NEWSLETTER_TEMPLATE, &repos, now).unwrap();
        assert!(out.contains("1. **[acme/a]"));
        assert!(out.contains("2. **[acme/b]"));
    }

    #[test]
    fn unknown_template_is_config_error() {
        let err = Templates.render("nope.hbs", &[]).unwrap_err();
        assert!(err.is_config());
    }
}
