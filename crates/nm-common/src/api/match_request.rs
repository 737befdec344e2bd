use serde::Deserialize;

use crate::error::MatchError;
use crate::matching::{MatchFilters, SortBy};

/// Query string of `GET /api/matches`. Everything arrives as text so that bad
/// numbers surface as `InvalidFilter` rather than a generic rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuery {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub min_score: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// comma separated
    #[serde(default)]
    pub skills: Option<String>,
    /// comma separated
    #[serde(default)]
    pub interests: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
}

fn parse_number(field: &str, raw: Option<&str>) -> Result<Option<i64>, MatchError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse::<i64>().map(Some).map_err(|_| {
            MatchError::InvalidFilter(format!("{field} must be an integer (got `{value}`)"))
        }),
    }
}

fn split_terms(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl MatchQuery {
    pub fn into_filters(self) -> Result<MatchFilters, MatchError> {
        let sort_by = match self.sort_by.as_deref() {
            None => SortBy::default(),
            Some(raw) => raw.parse()?,
        };

        Ok(MatchFilters {
            limit: parse_number("limit", self.limit.as_deref())?,
            min_score: parse_number("minScore", self.min_score.as_deref())?,
            location: self.location,
            skills: split_terms(self.skills.as_deref()),
            interests: split_terms(self.interests.as_deref()),
            sort_by,
        })
    }
}
