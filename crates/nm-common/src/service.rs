//! Query surface: the two operations callers use.

use std::sync::Arc;

use serde::Serialize;
use tokio::time::timeout_at;
use tracing::{info, instrument, warn};

use crate::Profile;
use crate::ai::AiUnavailable;
use crate::error::MatchError;
use crate::matching::filters::{AppliedFilters, MatchFilters};
use crate::matching::meetings::{MeetingPlan, fallback_meeting_plan};
use crate::matching::{MatchOrchestrator, MatchResult, RankOptions, RankedCandidate};
use crate::store::ProfileStore;

#[derive(Debug, Clone)]
pub struct MatchList {
    pub run_id: String,
    pub matches: Vec<RankedCandidate>,
    pub filters: AppliedFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
    pub strength_areas: Vec<String>,
    pub collaboration_potential: String,
    pub networking_value: String,
}

impl AiInsights {
    fn from_result(result: &MatchResult) -> Self {
        Self {
            strength_areas: result.complementary_skills.clone(),
            collaboration_potential: result.collaboration_potential.clone(),
            networking_value: result.networking_value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchDetails {
    pub target: Profile,
    pub compatibility: MatchResult,
    pub meeting_plan: MeetingPlan,
    pub insights: AiInsights,
}

pub struct MatchService {
    store: Arc<dyn ProfileStore>,
    orchestrator: MatchOrchestrator,
}

impl MatchService {
    pub fn new(store: Arc<dyn ProfileStore>, orchestrator: MatchOrchestrator) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    pub fn orchestrator(&self) -> &MatchOrchestrator {
        &self.orchestrator
    }

    async fn require_profile(&self, user_id: &str) -> Result<Profile, MatchError> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| MatchError::ProfileNotFound(user_id.to_string()))
    }

    /// Top matches for `requester_id`. The orchestrator ranks the whole active
    /// pool; attribute filters then intersect its top `limit` and ranks are
    /// renumbered, so a filter can only remove entries from the page.
    #[instrument(skip(self, filters))]
    pub async fn get_matches(
        &self,
        requester_id: &str,
        filters: &MatchFilters,
    ) -> Result<MatchList, MatchError> {
        let applied = filters.validate(self.orchestrator.config())?;
        let requester = self.require_profile(requester_id).await?;

        let pool = self
            .store
            .list_active_profiles(&requester.user_id)
            .await?;

        let run = self
            .orchestrator
            .rank_matches(
                &requester,
                &pool,
                RankOptions {
                    limit: applied.limit,
                    min_score: applied.min_score,
                },
            )
            .await;

        let ranked = run.candidates.len();
        let kept = run
            .candidates
            .into_iter()
            .filter(|candidate| applied.matches(&candidate.profile))
            .collect::<Vec<_>>();
        let matches = applied.arrange(kept);
        info!(
            run_id = %run.run_id,
            pool_size = pool.len(),
            ranked,
            returned = matches.len(),
            "matches served"
        );

        Ok(MatchList {
            run_id: run.run_id,
            matches,
            filters: applied,
        })
    }

    /// Pairwise analysis with meeting enrichment. AI failures degrade to
    /// deterministic output; only missing profiles and self-analysis fail.
    #[instrument(skip(self))]
    pub async fn get_match_details(
        &self,
        requester_id: &str,
        target_id: &str,
    ) -> Result<MatchDetails, MatchError> {
        if requester_id.trim() == target_id.trim() {
            return Err(MatchError::InvalidFilter(
                "target must differ from the requester".into(),
            ));
        }

        let requester = self.require_profile(requester_id).await?;
        let target = self.require_profile(target_id).await?;

        let deadline = self.orchestrator.deadline_from_now();
        let scorer = self.orchestrator.scorer();
        let participants = [&requester, &target];

        let (compatibility, plan) = tokio::join!(
            self.orchestrator.score_pair(&requester, &target, deadline),
            async {
                match timeout_at(deadline, scorer.suggest_meetings(&participants)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AiUnavailable::Timeout(
                        self.orchestrator.config().ranking_deadline,
                    )),
                }
            }
        );

        let meeting_plan = plan.unwrap_or_else(|reason| {
            warn!(
                target = %target.user_id,
                reason = reason.reason(),
                "meeting suggestions unavailable; using profile-based plan"
            );
            fallback_meeting_plan(
                &requester,
                &target,
                &compatibility.meeting_topics,
                &compatibility.shared_interests,
                &compatibility.complementary_skills,
            )
        });

        let insights = AiInsights::from_result(&compatibility);

        Ok(MatchDetails {
            target,
            compatibility,
            meeting_plan,
            insights,
        })
    }
}
