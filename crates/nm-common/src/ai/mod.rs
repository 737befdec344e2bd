//! Adapter around the external compatibility-scoring capability.
//!
//! Implementations either return a validated [`MatchResult`] tagged
//! `source = ai` or an [`AiUnavailable`]. They never fall back on their own;
//! the orchestrator owns the fallback decision.

pub mod cache;
pub mod client;
pub mod config;
pub mod prompt;
pub mod response;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::Profile;
use crate::matching::MatchResult;
use crate::matching::meetings::MeetingPlan;

pub use cache::{CacheConfig, CachedScorer};
pub use client::HttpCompatibilityScorer;
pub use config::LlmRuntimeConfig;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AiUnavailable {
    #[error("AI scoring is disabled")]
    Disabled,
    #[error("AI request timed out after {0:?}")]
    Timeout(Duration),
    #[error("AI transport error: {0}")]
    Transport(String),
    #[error("AI quota or rate limit exceeded")]
    RateLimited,
    #[error("AI endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("AI returned a malformed payload: {0}")]
    Malformed(String),
}

impl AiUnavailable {
    /// Stable label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AiUnavailable::Disabled => "disabled",
            AiUnavailable::Timeout(_) => "timeout",
            AiUnavailable::Transport(_) => "transport",
            AiUnavailable::RateLimited => "rate_limited",
            AiUnavailable::Status { .. } => "status",
            AiUnavailable::Malformed(_) => "malformed",
        }
    }
}

#[async_trait]
pub trait CompatibilityScorer: Send + Sync {
    fn name(&self) -> &str;

    /// Directional comparison: `requester` is looking at `candidate`.
    async fn score(
        &self,
        requester: &Profile,
        candidate: &Profile,
    ) -> Result<MatchResult, AiUnavailable>;

    async fn suggest_meetings(
        &self,
        participants: &[&Profile],
    ) -> Result<MeetingPlan, AiUnavailable>;
}

/// Used when no AI endpoint is configured. Every call reports `Disabled`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledScorer;

#[async_trait]
impl CompatibilityScorer for DisabledScorer {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn score(&self, _: &Profile, _: &Profile) -> Result<MatchResult, AiUnavailable> {
        Err(AiUnavailable::Disabled)
    }

    async fn suggest_meetings(&self, _: &[&Profile]) -> Result<MeetingPlan, AiUnavailable> {
        Err(AiUnavailable::Disabled)
    }
}

/// Build the scorer described by `config`: HTTP client, optionally cached,
/// or [`DisabledScorer`] when disabled or missing a key.
pub fn scorer_from_config(config: &LlmRuntimeConfig) -> Arc<dyn CompatibilityScorer> {
    if !config.is_usable() {
        info!(
            provider = %config.provider,
            enabled = config.enabled,
            "AI scoring disabled; deterministic matching only"
        );
        return Arc::new(DisabledScorer);
    }

    let client = match HttpCompatibilityScorer::new(config.clone()) {
        Ok(client) => client,
        Err(err) => {
            warn!(error = %err, "failed to build AI client; deterministic matching only");
            return Arc::new(DisabledScorer);
        }
    };

    info!(
        provider = %config.provider,
        model = %config.model,
        cache_capacity = config.cache.capacity,
        "AI scoring enabled"
    );

    match config.cache.capacity {
        0 => Arc::new(client),
        _ => Arc::new(CachedScorer::new(client, config.cache.clone())),
    }
}
