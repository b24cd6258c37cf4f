// src/channel/digest.rs
//! Weekly email digest, sent through Buttondown or plain SMTP.

use async_trait::async_trait;
use chrono::Utc;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{send_with_retry, subject, Channel, HttpPolicy};
use crate::config::{DigestConfig, DigestTransport, SmtpConfig};
use crate::error::{Error, Result};
use crate::model::ScoredCandidate;
use crate::render::{Render, NEWSLETTER_TEMPLATE};

pub const BUTTONDOWN_URL: &str = "https://api.buttondown.email/v1/emails";

pub struct DigestChannel {
    cfg: DigestConfig,
    renderer: Arc<dyn Render>,
    client: Client,
    endpoint: String,
    policy: HttpPolicy,
}

#[derive(Serialize)]
struct ButtondownEmail<'a> {
    subject: &'a str,
    body: &'a str,
    email_type: &'a str,
}

#[derive(Deserialize)]
struct ButtondownResponse {
    id: Option<String>,
}

impl DigestChannel {
    pub fn new(cfg: DigestConfig, renderer: Arc<dyn Render>) -> Self {
        Self {
            cfg,
            renderer,
            client: Client::new(),
            endpoint: BUTTONDOWN_URL.to_string(),
            policy: HttpPolicy::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.policy.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, attempts: u8) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    async fn send_buttondown(&self, api_key: &str, subject: &str, body: &str) -> Result<String> {
        let payload = ButtondownEmail {
            subject,
            body,
            email_type: "public",
        };
        let rsp = send_with_retry("buttondown", "email sending failed", self.policy, || {
            self.client
                .post(&self.endpoint)
                .header("Authorization", format!("Token {api_key}"))
                .json(&payload)
        })
        .await?;

        let parsed: ButtondownResponse = rsp
            .json()
            .await
            .map_err(|e| Error::transport("buttondown", format!("malformed response: {e}")))?;
        parsed
            .id
            .ok_or_else(|| Error::transport("buttondown", "email sending returned no ID"))
    }

    async fn send_smtp(&self, smtp: SmtpSettings, subject: &str, body: &str) -> Result<String> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .map_err(|e| Error::Config(format!("invalid SMTP_HOST: {e}")))?
            .credentials(Credentials::new(smtp.user, smtp.pass))
            .timeout(Some(self.policy.timeout))
            .build();

        let msg = Message::builder()
            .from(smtp.from)
            .to(smtp.to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| Error::transport("smtp", format!("build email: {e}")))?;

        mailer
            .send(msg)
            .await
            .map_err(|e| Error::transport("smtp", format!("send email: {e}")))?;
        Ok(format!("smtp-{}", Utc::now().timestamp_millis()))
    }
}

/// Credentials checked up front, handed to the matching sender.
enum Delivery<'a> {
    Buttondown(&'a str),
    Smtp(SmtpSettings),
}

/// SMTP settings with every required field present and addresses parsed.
struct SmtpSettings {
    host: String,
    user: String,
    pass: String,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpSettings {
    fn from_config(cfg: &SmtpConfig) -> Result<Self> {
        fn required<'a>(v: &'a Option<String>, key: &str) -> Result<&'a str> {
            v.as_deref().ok_or_else(|| {
                Error::Config(format!("{key} required when DIGEST_TRANSPORT=smtp"))
            })
        }
        let host = required(&cfg.host, "SMTP_HOST")?.to_string();
        let user = required(&cfg.user, "SMTP_USER")?.to_string();
        let pass = required(&cfg.pass, "SMTP_PASS")?.to_string();
        let from = required(&cfg.from, "NOTIFY_EMAIL_FROM")?
            .parse::<Mailbox>()
            .map_err(|e| Error::Config(format!("invalid NOTIFY_EMAIL_FROM: {e}")))?;
        let to = required(&cfg.to, "NOTIFY_EMAIL_TO")?
            .parse::<Mailbox>()
            .map_err(|e| Error::Config(format!("invalid NOTIFY_EMAIL_TO: {e}")))?;
        Ok(Self {
            host,
            user,
            pass,
            from,
            to,
        })
    }
}

#[async_trait]
impl Channel for DigestChannel {
    fn name(&self) -> &str {
        "digest"
    }

    fn enabled(&self) -> bool {
        self.cfg.enabled
    }

    fn render(&self, repos: &[ScoredCandidate]) -> Result<Option<String>> {
        self.renderer.render(NEWSLETTER_TEMPLATE, repos).map(Some)
    }

    async fn publish(&self, repos: &[ScoredCandidate]) -> Result<String> {
        // Fail on missing credentials before rendering or touching the network.
        let delivery = match self.cfg.transport {
            DigestTransport::Buttondown => {
                let key = self.cfg.api_key.as_deref().ok_or_else(|| {
                    Error::Config("BUTTONDOWN_API_KEY required when SEND_ENABLED=true".into())
                })?;
                Delivery::Buttondown(key)
            }
            DigestTransport::Smtp => Delivery::Smtp(SmtpSettings::from_config(&self.cfg.smtp)?),
        };

        let body = self.render(repos)?.unwrap_or_default();
        let subject = subject(Utc::now());

        let id = match delivery {
            Delivery::Buttondown(key) => self.send_buttondown(key, &subject, &body).await?,
            Delivery::Smtp(smtp) => self.send_smtp(smtp, &subject, &body).await?,
        };
        info!(target: "digest", id = %id, repos = repos.len(), "digest sent");
        Ok(id)
    }
}
