use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt, stream};
use tokio::time::{Instant, timeout_at};
use tracing::{Span, info, instrument, warn};

use super::{
    result::{MatchResult, MatchSource, RankedCandidate},
    scoring::{DeterministicEngine, MatchingConfig},
};
use crate::Profile;
use crate::ai::{AiUnavailable, CompatibilityScorer};
use crate::error::CandidateScoringFailure;
use crate::run_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankOptions {
    pub limit: usize,
    pub min_score: u8,
}

impl RankOptions {
    pub fn from_config(config: &MatchingConfig) -> Self {
        Self {
            limit: config.default_limit,
            min_score: config.default_min_score,
        }
    }
}

/// Output of one ranking run plus counters for logs and callers.
#[derive(Debug, Clone)]
pub struct RankedRun {
    pub run_id: String,
    pub candidates: Vec<RankedCandidate>,
    /// Candidates that were scored (after self / inactive / duplicate exclusion).
    pub evaluated: usize,
    pub fallbacks: usize,
    pub excluded: usize,
}

/// Drives the AI adapter over a candidate pool with deterministic fallback.
pub struct MatchOrchestrator {
    scorer: Arc<dyn CompatibilityScorer>,
    engine: DeterministicEngine,
    config: MatchingConfig,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".into())
}

impl MatchOrchestrator {
    pub fn new(scorer: Arc<dyn CompatibilityScorer>, config: MatchingConfig) -> Self {
        Self {
            engine: DeterministicEngine::new(config.weights),
            scorer,
            config,
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn scorer(&self) -> &Arc<dyn CompatibilityScorer> {
        &self.scorer
    }

    pub fn engine(&self) -> &DeterministicEngine {
        &self.engine
    }

    /// Deadline for a single operation started now.
    pub fn deadline_from_now(&self) -> Instant {
        Instant::now() + self.config.ranking_deadline
    }

    /// Score one pair: AI first, deterministic on `AiUnavailable`. The AI call is
    /// abandoned at `deadline`. Never fails.
    pub async fn score_pair(
        &self,
        requester: &Profile,
        candidate: &Profile,
        deadline: Instant,
    ) -> MatchResult {
        let outcome = match timeout_at(deadline, self.scorer.score(requester, candidate)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AiUnavailable::Timeout(self.config.ranking_deadline)),
        };

        match outcome {
            Ok(mut result) => {
                if self.config.record_traditional_score {
                    let breakdown = self.engine.breakdown(requester, candidate);
                    result.traditional_score = Some(self.engine.weighted_score(&breakdown));
                }
                metrics::counter!(nm_metrics::MATCH_SCORED_TOTAL, "source" => MatchSource::Ai.as_str())
                    .increment(1);
                result
            }
            Err(reason) => {
                warn!(
                    candidate = %candidate.user_id,
                    reason = reason.reason(),
                    error = %reason,
                    "AI unavailable; using deterministic score"
                );
                metrics::counter!(nm_metrics::MATCH_FALLBACK_TOTAL, "reason" => reason.reason())
                    .increment(1);
                metrics::counter!(
                    nm_metrics::MATCH_SCORED_TOTAL,
                    "source" => MatchSource::Deterministic.as_str()
                )
                .increment(1);
                self.engine.score(requester, candidate)
            }
        }
    }

    async fn score_candidate<'a>(
        &self,
        requester: &Profile,
        candidate: &'a Profile,
        deadline: Instant,
    ) -> Result<(&'a Profile, MatchResult), CandidateScoringFailure> {
        if candidate.user_id.trim().is_empty() {
            return Err(CandidateScoringFailure::InvalidCandidate(
                "empty user id".into(),
            ));
        }

        AssertUnwindSafe(self.score_pair(requester, candidate, deadline))
            .catch_unwind()
            .await
            .map(|result| (candidate, result))
            .map_err(|payload| CandidateScoringFailure::Panicked {
                candidate_id: candidate.user_id.clone(),
                message: panic_message(payload.as_ref()),
            })
    }

    /// Rank `pool` for `requester`: exclude self and inactive profiles, score
    /// concurrently, drop scores below `min_score`, order by score desc then
    /// user id asc, keep `limit`, number ranks from 1.
    #[instrument(skip_all, fields(requester = %requester.user_id, pool = pool.len(), run_id = tracing::field::Empty))]
    pub async fn rank_matches(
        &self,
        requester: &Profile,
        pool: &[Profile],
        options: RankOptions,
    ) -> RankedRun {
        let run_id = run_id::generate();
        Span::current().record("run_id", run_id.as_str());
        let deadline = self.deadline_from_now();

        let mut seen = HashSet::new();
        let eligible = pool
            .iter()
            .filter(|candidate| candidate.is_active && candidate.user_id != requester.user_id)
            .filter(|candidate| seen.insert(candidate.user_id.as_str()))
            .collect::<Vec<_>>();
        let evaluated = eligible.len();

        let pending = eligible
            .into_iter()
            .map(|candidate| self.score_candidate(requester, candidate, deadline))
            .collect::<Vec<_>>();
        let outcomes = stream::iter(pending)
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut scored = Vec::with_capacity(outcomes.len());
        let mut excluded = 0;
        for outcome in outcomes {
            match outcome {
                Ok(pair) => scored.push(pair),
                Err(failure) => {
                    excluded += 1;
                    metrics::counter!(nm_metrics::MATCH_CANDIDATE_FAILURES_TOTAL).increment(1);
                    warn!(%run_id, error = %failure, "candidate excluded from ranking");
                }
            }
        }

        let fallbacks = scored
            .iter()
            .filter(|(_, result)| result.source == MatchSource::Deterministic)
            .count();

        scored.retain(|(_, result)| result.score >= options.min_score);
        scored.sort_by(|(a_profile, a), (b_profile, b)| {
            b.score
                .cmp(&a.score)
                .then_with(|| a_profile.user_id.cmp(&b_profile.user_id))
        });
        scored.truncate(options.limit);

        let candidates = scored
            .into_iter()
            .enumerate()
            .map(|(idx, (profile, result))| RankedCandidate {
                profile: profile.clone(),
                result,
                rank: idx + 1,
            })
            .collect::<Vec<_>>();

        info!(
            %run_id,
            evaluated,
            returned = candidates.len(),
            fallbacks,
            excluded,
            min_score = options.min_score,
            limit = options.limit,
            "ranking run finished"
        );

        RankedRun {
            run_id,
            candidates,
            evaluated,
            fallbacks,
            excluded,
        }
    }
}
