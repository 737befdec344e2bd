pub mod match_request;
pub mod match_response;

pub use match_request::MatchQuery;
pub use match_response::{MatchDetailsResponse, MatchListResponse, MatchResponse};
