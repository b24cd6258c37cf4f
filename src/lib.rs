// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod channel;
pub mod config;
pub mod error;
pub mod feed;
pub mod model;
pub mod publish;
pub mod render;
pub mod run;
pub mod score;

// ---- Re-exports for stable public API ----
pub use crate::channel::Channel;
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::model::{Candidate, FeedItem, PublishOutcome, PublishStatus, ScoredCandidate};
pub use crate::publish::{publish_all, publish_outcomes};
pub use crate::score::Scorer;
