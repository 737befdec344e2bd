use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Profile;

pub const MAX_MEETING_TOPICS: usize = 5;
pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Ai,
    Deterministic,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Ai => "ai",
            MatchSource::Deterministic => "deterministic",
        }
    }
}

/// Per-component deterministic scores (each 0..=100, before weighting).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub skills: f64,
    pub interests: f64,
    pub goals: f64,
    pub experience: f64,
    pub location: f64,
}

/// Outcome of one pairwise comparison, shared by the AI and deterministic paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub score: u8,
    pub reasoning: String,
    pub shared_interests: Vec<String>,
    pub complementary_skills: Vec<String>,
    pub meeting_topics: Vec<String>,
    pub collaboration_potential: String,
    pub networking_value: String,
    #[serde(default)]
    pub match_categories: Vec<String>,
    pub source: MatchSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
    /// Deterministic score computed next to an AI result, for comparison only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traditional_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Round and clamp any raw score into 0..=100. Non-finite input counts as 0.
pub fn clamp_score(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
}

pub fn truncate_topics(mut topics: Vec<String>) -> Vec<String> {
    topics.truncate(MAX_MEETING_TOPICS);
    topics
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub profile: Profile,
    pub result: MatchResult,
    /// 1-based position in the returned list.
    pub rank: usize,
}
