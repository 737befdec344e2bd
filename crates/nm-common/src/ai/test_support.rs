//! Deterministic [`CompatibilityScorer`] double for tests.
//!
//! ```
//! use nm_common::ai::test_support::StubScorer;
//!
//! // 80 for everybody except "u2", who gets 55
//! let scorer = StubScorer::scoring(80).with_score("u2", 55);
//! assert_eq!(scorer.calls(), 0);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{AiUnavailable, CompatibilityScorer};
use crate::Profile;
use crate::matching::meetings::MeetingPlan;
use crate::matching::{MatchResult, MatchSource};

pub const STUB_MODEL: &str = "stub-model";

#[derive(Debug, Clone)]
enum StubOutcome {
    Score(u8),
    Fail(AiUnavailable),
}

#[derive(Debug, Clone)]
pub struct StubScorer {
    default: StubOutcome,
    scores: HashMap<String, u8>,
    failures: HashMap<String, AiUnavailable>,
    delays: HashMap<String, Duration>,
    panics: HashSet<String>,
    meeting_plan: Option<MeetingPlan>,
    calls: Arc<AtomicUsize>,
}

impl StubScorer {
    fn with_default(default: StubOutcome) -> Self {
        Self {
            default,
            scores: HashMap::new(),
            failures: HashMap::new(),
            delays: HashMap::new(),
            panics: HashSet::new(),
            meeting_plan: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every candidate gets `score` unless overridden.
    #[must_use]
    pub fn scoring(score: u8) -> Self {
        Self::with_default(StubOutcome::Score(score))
    }

    /// Every call fails with `error` unless overridden.
    #[must_use]
    pub fn failing(error: AiUnavailable) -> Self {
        Self::with_default(StubOutcome::Fail(error))
    }

    #[must_use]
    pub fn with_score(mut self, candidate_id: &str, score: u8) -> Self {
        self.scores.insert(candidate_id.to_string(), score);
        self
    }

    #[must_use]
    pub fn with_failure(mut self, candidate_id: &str, error: AiUnavailable) -> Self {
        self.failures.insert(candidate_id.to_string(), error);
        self
    }

    /// Sleep before answering for this candidate.
    #[must_use]
    pub fn with_delay(mut self, candidate_id: &str, delay: Duration) -> Self {
        self.delays.insert(candidate_id.to_string(), delay);
        self
    }

    /// Panic while scoring this candidate.
    #[must_use]
    pub fn with_panic(mut self, candidate_id: &str) -> Self {
        self.panics.insert(candidate_id.to_string());
        self
    }

    #[must_use]
    pub fn with_meeting_plan(mut self, plan: MeetingPlan) -> Self {
        self.meeting_plan = Some(plan);
        self
    }

    /// Number of `score` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn stub_result(score: u8, candidate: &Profile) -> MatchResult {
    MatchResult {
        score,
        reasoning: format!("stub assessment for {}", candidate.user_id),
        shared_interests: Vec::new(),
        complementary_skills: Vec::new(),
        meeting_topics: vec!["Stub topic".to_string()],
        collaboration_potential: "High".to_string(),
        networking_value: "High".to_string(),
        match_categories: vec!["stub".to_string()],
        source: MatchSource::Ai,
        breakdown: None,
        traditional_score: None,
        model: Some(STUB_MODEL.to_string()),
        generated_at: Utc::now(),
    }
}

#[async_trait]
impl CompatibilityScorer for StubScorer {
    fn name(&self) -> &str {
        "stub"
    }

    async fn score(
        &self,
        _requester: &Profile,
        candidate: &Profile,
    ) -> Result<MatchResult, AiUnavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = candidate.user_id.as_str();

        if let Some(delay) = self.delays.get(id) {
            tokio::time::sleep(*delay).await;
        }
        if self.panics.contains(id) {
            panic!("stub scorer panic for {id}");
        }
        if let Some(error) = self.failures.get(id) {
            return Err(error.clone());
        }
        if let Some(score) = self.scores.get(id) {
            return Ok(stub_result(*score, candidate));
        }

        match &self.default {
            StubOutcome::Score(score) => Ok(stub_result(*score, candidate)),
            StubOutcome::Fail(error) => Err(error.clone()),
        }
    }

    async fn suggest_meetings(&self, _: &[&Profile]) -> Result<MeetingPlan, AiUnavailable> {
        match (&self.meeting_plan, &self.default) {
            (Some(plan), _) => Ok(plan.clone()),
            (None, StubOutcome::Fail(error)) => Err(error.clone()),
            (None, StubOutcome::Score(_)) => Err(AiUnavailable::Malformed("no stub plan".into())),
        }
    }
}
