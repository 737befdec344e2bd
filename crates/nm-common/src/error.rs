use thiserror::Error;

use crate::store::StoreError;

/// Failures the query surface lets reach its caller. AI trouble never shows up here.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("profile not found: {0}")]
    ProfileNotFound(String),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A candidate dropped from a ranking run. Logged, never returned to callers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CandidateScoringFailure {
    #[error("candidate profile is invalid: {0}")]
    InvalidCandidate(String),
    #[error("scoring candidate {candidate_id} panicked: {message}")]
    Panicked {
        candidate_id: String,
        message: String,
    },
}
