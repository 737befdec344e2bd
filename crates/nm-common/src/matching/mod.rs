pub mod filters;
pub mod insights;
pub mod meetings;
pub mod pipeline;
pub mod result;
pub mod scoring;
pub mod similarity;
pub mod weights;

pub use filters::{MatchFilters, SortBy};
pub use pipeline::{MatchOrchestrator, RankOptions, RankedRun};
pub use result::{MatchResult, MatchSource, RankedCandidate, ScoreBreakdown};
pub use scoring::{DeterministicEngine, MatchingConfig};
pub use weights::{DEFAULT_WEIGHTS, Weights};
