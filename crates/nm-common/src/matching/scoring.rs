use std::env;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use super::{
    insights::{complementary_skills, meeting_topics, shared_interests},
    result::{MatchResult, MatchSource, ScoreBreakdown, clamp_score},
    similarity::{job_similarity, location_similarity, set_similarity},
    weights::{DEFAULT_WEIGHTS, Weights, WeightsError},
};
use crate::Profile;

pub const FALLBACK_COLLABORATION_POTENTIAL: &str = "To be determined through interaction";
pub const FALLBACK_NETWORKING_VALUE: &str = "Mutual professional benefit possible";

/// Every threshold the ranking path depends on, in one place so tests can override them.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub weights: Weights,
    pub default_limit: usize,
    pub max_limit: usize,
    pub default_min_score: u8,
    /// Simultaneous AI calls per ranking run.
    pub max_concurrency: usize,
    /// Global ceiling for one ranking run; unfinished AI calls fall back after it.
    pub ranking_deadline: Duration,
    /// Also compute the deterministic score next to AI results.
    pub record_traditional_score: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum MatchingConfigError {
    #[error(transparent)]
    Weights(#[from] WeightsError),
    #[error("{0} must be positive")]
    NotPositive(&'static str),
    #[error("default_limit ({default}) must not exceed max_limit ({max})")]
    LimitOrder { default: usize, max: usize },
    #[error("default_min_score must be within 0..=100 (got {0})")]
    MinScoreRange(u8),
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
            default_limit: 10,
            max_limit: 100,
            default_min_score: 0,
            max_concurrency: 8,
            ranking_deadline: Duration::from_secs(45),
            record_traditional_score: true,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.trim().parse::<T>().ok())
}

impl MatchingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            weights: defaults.weights,
            default_limit: parse_env("MATCH_DEFAULT_LIMIT")
                .filter(|v: &usize| *v > 0)
                .unwrap_or(defaults.default_limit),
            max_limit: parse_env("MATCH_MAX_LIMIT")
                .filter(|v: &usize| *v > 0)
                .unwrap_or(defaults.max_limit),
            default_min_score: parse_env("MATCH_DEFAULT_MIN_SCORE")
                .filter(|v: &u8| *v <= 100)
                .unwrap_or(defaults.default_min_score),
            max_concurrency: parse_env("MATCH_MAX_CONCURRENCY")
                .filter(|v: &usize| *v > 0)
                .unwrap_or(defaults.max_concurrency),
            ranking_deadline: parse_env("MATCH_RANKING_DEADLINE_SECONDS")
                .filter(|v: &u64| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.ranking_deadline),
            record_traditional_score: env::var("MATCH_RECORD_TRADITIONAL_SCORE")
                .map(|raw| matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.record_traditional_score),
        }
    }

    pub fn validate(&self) -> Result<(), MatchingConfigError> {
        self.weights.validate()?;

        if self.max_concurrency == 0 {
            return Err(MatchingConfigError::NotPositive("max_concurrency"));
        }
        if self.default_limit == 0 {
            return Err(MatchingConfigError::NotPositive("default_limit"));
        }
        if self.ranking_deadline.is_zero() {
            return Err(MatchingConfigError::NotPositive("ranking_deadline"));
        }
        if self.default_limit > self.max_limit {
            return Err(MatchingConfigError::LimitOrder {
                default: self.default_limit,
                max: self.max_limit,
            });
        }
        if self.default_min_score > 100 {
            return Err(MatchingConfigError::MinScoreRange(self.default_min_score));
        }

        Ok(())
    }
}

/// Offline scoring path. Pure and synchronous; always returns a result.
#[derive(Debug, Clone, Copy)]
pub struct DeterministicEngine {
    weights: Weights,
}

impl Default for DeterministicEngine {
    fn default() -> Self {
        Self::new(DEFAULT_WEIGHTS)
    }
}

impl DeterministicEngine {
    pub fn new(weights: Weights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn breakdown(&self, requester: &Profile, candidate: &Profile) -> ScoreBreakdown {
        ScoreBreakdown {
            skills: set_similarity(&requester.skills, &candidate.skills),
            interests: set_similarity(&requester.interests, &candidate.interests),
            goals: set_similarity(&requester.networking_goals, &candidate.networking_goals),
            experience: job_similarity(
                requester.company.as_deref(),
                requester.title.as_deref(),
                candidate.company.as_deref(),
                candidate.title.as_deref(),
            ),
            location: location_similarity(requester.location.as_ref(), candidate.location.as_ref()),
        }
    }

    pub fn weighted_score(&self, breakdown: &ScoreBreakdown) -> u8 {
        let w = &self.weights;
        clamp_score(
            breakdown.skills * w.skills
                + breakdown.interests * w.interests
                + breakdown.goals * w.goals
                + breakdown.experience * w.experience
                + breakdown.location * w.location,
        )
    }

    pub fn score(&self, requester: &Profile, candidate: &Profile) -> MatchResult {
        let breakdown = self.breakdown(requester, candidate);
        let score = self.weighted_score(&breakdown);

        let shared = shared_interests(&requester.interests, &candidate.interests);
        let complementary = complementary_skills(&requester.skills, &candidate.skills);
        let any_skills = !requester.skills.is_empty() || !candidate.skills.is_empty();
        let topics = meeting_topics(&shared, any_skills);

        MatchResult {
            score,
            reasoning: describe(&breakdown, score),
            shared_interests: shared,
            complementary_skills: complementary,
            meeting_topics: topics,
            collaboration_potential: FALLBACK_COLLABORATION_POTENTIAL.to_string(),
            networking_value: FALLBACK_NETWORKING_VALUE.to_string(),
            match_categories: Vec::new(),
            source: MatchSource::Deterministic,
            breakdown: Some(breakdown),
            traditional_score: None,
            model: None,
            generated_at: Utc::now(),
        }
    }
}

fn describe(breakdown: &ScoreBreakdown, score: u8) -> String {
    format!(
        "Profile overlap score {score}/100 (skills {:.0}, interests {:.0}, goals {:.0}, experience {:.0}, location {:.0})",
        breakdown.skills, breakdown.interests, breakdown.goals, breakdown.experience, breakdown.location
    )
}
