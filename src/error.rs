// src/error.rs
//! Error taxonomy shared by scoring, channels and the coordinator.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Required setting or credential absent/invalid. Raised before any I/O.
    #[error("config: {0}")]
    Config(String),

    /// Remote call failed: non-2xx, network failure or malformed response.
    #[error("{service}: {message}{}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transport {
        service: &'static str,
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// A candidate or feed item failed its required-shape check.
    #[error("validation: {0}")]
    Validation(String),

    #[error("feed: failed to write {}: {source}", path.display())]
    FeedWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("feed: failed to encode document: {0}")]
    FeedEncode(String),

    /// Wraps the failure of one channel so callers know which one broke the run.
    #[error("channel {channel} failed: {source}")]
    Channel {
        channel: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn transport(service: &'static str, message: impl Into<String>) -> Self {
        Error::Transport {
            service,
            message: message.into(),
            status: None,
            body: None,
        }
    }

    pub fn is_config(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::Channel { source, .. } => source.is_config(),
            _ => false,
        }
    }

    /// HTTP status behind a transport failure, looking through the channel wrapper.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => *status,
            Error::Channel { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Name of the channel that caused this error, if any.
    pub fn channel(&self) -> Option<&str> {
        match self {
            Error::Channel { channel, .. } => Some(channel),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_status_when_known() {
        let e = Error::Transport {
            service: "github",
            message: "release creation failed".into(),
            status: Some(422),
            body: None,
        };
        assert_eq!(e.to_string(), "github: release creation failed (status 422)");

        let e = Error::transport("buttondown", "request failed");
        assert_eq!(e.to_string(), "buttondown: request failed");
    }

    #[test]
    fn channel_wrapper_exposes_inner_details() {
        let e = Error::Channel {
            channel: "rss".into(),
            source: Box::new(Error::Config("RSS_PATH required".into())),
        };
        assert!(e.is_config());
        assert_eq!(e.channel(), Some("rss"));
        assert_eq!(e.status(), None);
    }
}
