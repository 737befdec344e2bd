use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::{MAX_SCORE, RankedCandidate};
use super::scoring::MatchingConfig;
use crate::Profile;
use crate::error::MatchError;
use crate::normalize::{clean_list, contains_folded};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    Score,
    Name,
}

impl FromStr for SortBy {
    type Err = MatchError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "score" | "matchscore" => Ok(SortBy::Score),
            "name" => Ok(SortBy::Name),
            other => Err(MatchError::InvalidFilter(format!(
                "sortBy must be `score` or `name` (got `{other}`)"
            ))),
        }
    }
}

/// Caller-supplied filters before range checks. Numbers stay signed so
/// out-of-range input can be reported instead of wrapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchFilters {
    pub limit: Option<i64>,
    pub min_score: Option<i64>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub sort_by: SortBy,
}

/// Filters after validation, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
    pub limit: usize,
    pub min_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    pub sort_by: SortBy,
}

impl MatchFilters {
    pub fn validate(&self, config: &MatchingConfig) -> Result<AppliedFilters, MatchError> {
        let limit = match self.limit {
            None => config.default_limit,
            Some(limit) if limit >= 1 && limit as u64 <= config.max_limit as u64 => limit as usize,
            Some(limit) => {
                return Err(MatchError::InvalidFilter(format!(
                    "limit must be within 1..={} (got {limit})",
                    config.max_limit
                )));
            }
        };

        let min_score = match self.min_score {
            None => config.default_min_score,
            Some(score) if (0..=i64::from(MAX_SCORE)).contains(&score) => score as u8,
            Some(score) => {
                return Err(MatchError::InvalidFilter(format!(
                    "minScore must be within 0..=100 (got {score})"
                )));
            }
        };

        Ok(AppliedFilters {
            limit,
            min_score,
            location: self
                .location
                .as_deref()
                .map(str::trim)
                .filter(|loc| !loc.is_empty())
                .map(str::to_string),
            skills: clean_list(self.skills.clone()),
            interests: clean_list(self.interests.clone()),
            sort_by: self.sort_by,
        })
    }
}

fn any_term_matches(values: &[String], terms: &[String]) -> bool {
    terms.is_empty()
        || terms
            .iter()
            .any(|term| values.iter().any(|value| contains_folded(value, term)))
}

impl AppliedFilters {
    /// Attribute filters: location substring and skill / interest membership.
    pub fn matches(&self, profile: &Profile) -> bool {
        let location_ok = match &self.location {
            None => true,
            Some(wanted) => profile
                .location_label()
                .is_some_and(|label| contains_folded(&label, wanted)),
        };

        location_ok
            && any_term_matches(&profile.skills, &self.skills)
            && any_term_matches(&profile.interests, &self.interests)
    }

    /// Apply the requested order and renumber ranks 1..n.
    pub fn arrange(&self, mut ranked: Vec<RankedCandidate>) -> Vec<RankedCandidate> {
        if self.sort_by == SortBy::Name {
            ranked.sort_by(|a, b| {
                let left = a.profile.display_name_or_id().to_lowercase();
                let right = b.profile.display_name_or_id().to_lowercase();
                left.cmp(&right)
                    .then_with(|| a.profile.user_id.cmp(&b.profile.user_id))
            });
        }

        for (idx, candidate) in ranked.iter_mut().enumerate() {
            candidate.rank = idx + 1;
        }
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Location;

    fn config() -> MatchingConfig {
        MatchingConfig::default()
    }

    #[test]
    fn defaults_come_from_config() {
        let applied = MatchFilters::default().validate(&config()).unwrap();
        assert_eq!(applied.limit, 10);
        assert_eq!(applied.min_score, 0);
        assert_eq!(applied.sort_by, SortBy::Score);
    }

    #[test]
    fn out_of_range_values_are_invalid() {
        for filters in [
            MatchFilters {
                min_score: Some(101),
                ..MatchFilters::default()
            },
            MatchFilters {
                min_score: Some(-1),
                ..MatchFilters::default()
            },
            MatchFilters {
                limit: Some(0),
                ..MatchFilters::default()
            },
            MatchFilters {
                limit: Some(1000),
                ..MatchFilters::default()
            },
        ] {
            assert!(matches!(
                filters.validate(&config()),
                Err(MatchError::InvalidFilter(_))
            ));
        }
    }

    #[test]
    fn sort_by_parses_known_values() {
        assert_eq!("name".parse::<SortBy>().unwrap(), SortBy::Name);
        assert_eq!("matchScore".parse::<SortBy>().unwrap(), SortBy::Score);
        assert!("mutualConnections".parse::<SortBy>().is_err());
    }

    #[test]
    fn attribute_filters_use_case_insensitive_substrings() {
        let profile = Profile {
            location: Some(Location::new("San Francisco", "USA")),
            skills: vec!["Machine Learning".into()],
            interests: vec!["Climbing".into()],
            ..Profile::new("p")
        };

        let applied = MatchFilters {
            location: Some("francisco".into()),
            skills: vec!["learning".into(), "golang".into()],
            ..MatchFilters::default()
        }
        .validate(&config())
        .unwrap();
        assert!(applied.matches(&profile));

        let strict = MatchFilters {
            interests: vec!["chess".into()],
            ..MatchFilters::default()
        }
        .validate(&config())
        .unwrap();
        assert!(!strict.matches(&profile));

        let nowhere = MatchFilters {
            location: Some("Berlin".into()),
            ..MatchFilters::default()
        }
        .validate(&config())
        .unwrap();
        assert!(!nowhere.matches(&Profile::new("no-location")));
    }
}
