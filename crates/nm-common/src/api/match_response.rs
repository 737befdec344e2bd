use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Profile;
use crate::matching::filters::AppliedFilters;
use crate::matching::meetings::MeetingPlan;
use crate::matching::{MatchResult, MatchSource, RankedCandidate, ScoreBreakdown};
use crate::service::{AiInsights, MatchDetails, MatchList};

/// One entry of the match list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub user_id: String,
    pub profile: Profile,
    pub rank: usize,
    pub score: u8,
    pub reasoning: String,
    pub shared_interests: Vec<String>,
    pub complementary_skills: Vec<String>,
    pub meeting_topics: Vec<String>,
    pub collaboration_potential: String,
    pub networking_value: String,
    pub match_categories: Vec<String>,
    pub source: MatchSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traditional_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl From<RankedCandidate> for MatchResponse {
    fn from(candidate: RankedCandidate) -> Self {
        let RankedCandidate {
            profile,
            result,
            rank,
        } = candidate;

        Self {
            user_id: profile.user_id.clone(),
            profile,
            rank,
            score: result.score,
            reasoning: result.reasoning,
            shared_interests: result.shared_interests,
            complementary_skills: result.complementary_skills,
            meeting_topics: result.meeting_topics,
            collaboration_potential: result.collaboration_potential,
            networking_value: result.networking_value,
            match_categories: result.match_categories,
            source: result.source,
            traditional_score: result.traditional_score,
            breakdown: result.breakdown,
            model: result.model,
            generated_at: result.generated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchListResponse {
    pub matches: Vec<MatchResponse>,
    pub total_count: usize,
    pub filters: AppliedFilters,
    pub run_id: String,
}

impl From<MatchList> for MatchListResponse {
    fn from(list: MatchList) -> Self {
        let matches = list
            .matches
            .into_iter()
            .map(MatchResponse::from)
            .collect::<Vec<_>>();

        Self {
            total_count: matches.len(),
            matches,
            filters: list.filters,
            run_id: list.run_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetailsResponse {
    pub target_user: Profile,
    pub compatibility: MatchResult,
    pub meeting_suggestions: MeetingPlan,
    pub ai_insights: AiInsights,
}

impl From<MatchDetails> for MatchDetailsResponse {
    fn from(details: MatchDetails) -> Self {
        Self {
            target_user: details.target,
            compatibility: details.compatibility,
            meeting_suggestions: details.meeting_plan,
            ai_insights: details.insights,
        }
    }
}
