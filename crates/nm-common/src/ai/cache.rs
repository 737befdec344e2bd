use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use super::{AiUnavailable, CompatibilityScorer};
use crate::Profile;
use crate::matching::MatchResult;
use crate::matching::meetings::MeetingPlan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Zero disables caching.
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            ttl: Duration::from_secs(15 * 60),
        }
    }
}

/// Profile versions are part of the key, so any profile update is a miss.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey {
    requester_id: String,
    requester_version: i64,
    candidate_id: String,
    candidate_version: i64,
}

impl PairKey {
    fn new(requester: &Profile, candidate: &Profile) -> Self {
        Self {
            requester_id: requester.user_id.clone(),
            requester_version: requester.version,
            candidate_id: candidate.user_id.clone(),
            candidate_version: candidate.version,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedEntry {
    result: MatchResult,
    inserted_at: Instant,
}

/// Memoizes successful pairwise AI results. Failures are never cached and
/// meeting suggestions always go to the inner scorer.
pub struct CachedScorer<S> {
    inner: S,
    cache: Mutex<LruCache<PairKey, CachedEntry>>,
    ttl: Duration,
}

impl<S: CompatibilityScorer> CachedScorer<S> {
    pub fn new(inner: S, config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    async fn lookup(&self, key: &PairKey) -> Option<MatchResult> {
        let mut cache = self.cache.lock().await;
        let entry = cache.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            return Some(entry.result.clone());
        }
        cache.pop(key);
        None
    }
}

#[async_trait]
impl<S: CompatibilityScorer> CompatibilityScorer for CachedScorer<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn score(
        &self,
        requester: &Profile,
        candidate: &Profile,
    ) -> Result<MatchResult, AiUnavailable> {
        let key = PairKey::new(requester, candidate);

        if let Some(hit) = self.lookup(&key).await {
            debug!(requester = %requester.user_id, candidate = %candidate.user_id, "AI cache hit");
            metrics::counter!(nm_metrics::MATCH_AI_CACHE_HITS_TOTAL).increment(1);
            return Ok(hit);
        }

        // The lock is not held across the remote call.
        let result = self.inner.score(requester, candidate).await?;

        self.cache.lock().await.put(
            key,
            CachedEntry {
                result: result.clone(),
                inserted_at: Instant::now(),
            },
        );

        Ok(result)
    }

    async fn suggest_meetings(
        &self,
        participants: &[&Profile],
    ) -> Result<MeetingPlan, AiUnavailable> {
        self.inner.suggest_meetings(participants).await
    }
}
