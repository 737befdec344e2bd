//! Pure comparison primitives. Every function here is total: missing or empty
//! input is a neutral/zero score, never an error.

use std::collections::HashSet;

use crate::Location;
use crate::normalize::fold_key;

/// Keyword families; two values are "related" when both contain a keyword of the same family.
pub type SynonymGroups = &'static [&'static [&'static str]];

pub const ROLE_GROUPS: SynonymGroups = &[
    &["manager", "director", "lead", "head"],
    &["developer", "engineer", "programmer", "architect"],
    &["designer", "creative", "ux", "ui"],
];

pub const INDUSTRY_GROUPS: SynonymGroups = &[
    &["tech", "software", "digital", "ai", "data", "cloud"],
    &["bank", "finance", "investment", "capital"],
    &["health", "medical", "pharma", "biotech"],
];

pub const EMPTY_SETS_SCORE: f64 = 50.0;
pub const MISSING_LOCATION_SCORE: f64 = 25.0;
pub const EXACT_FIELD_SCORE: f64 = 100.0;
pub const RELATED_FIELD_SCORE: f64 = 30.0;
const JOB_FIELD_CAP: f64 = 50.0;

fn folded_set(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|value| fold_key(value))
        .filter(|value| !value.is_empty())
        .collect()
}

/// Jaccard index over case-folded members, scaled to 0..=100.
///
/// Both empty → 50, exactly one empty → 0.
pub fn set_similarity(a: &[String], b: &[String]) -> f64 {
    let left = folded_set(a);
    let right = folded_set(b);

    match (left.is_empty(), right.is_empty()) {
        (true, true) => return EMPTY_SETS_SCORE,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64 * 100.0
    }
}

fn group_of(value: &str, groups: SynonymGroups) -> impl Iterator<Item = usize> + '_ {
    groups
        .iter()
        .enumerate()
        .filter(move |(_, keywords)| keywords.iter().any(|keyword| value.contains(keyword)))
        .map(|(idx, _)| idx)
}

/// 100 for a case-insensitive exact match, 30 when both values fall into the
/// same keyword family, 0 otherwise (including a missing side).
pub fn field_equality(a: Option<&str>, b: Option<&str>, groups: SynonymGroups) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };

    let a = fold_key(a);
    let b = fold_key(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return EXACT_FIELD_SCORE;
    }

    let related = group_of(&a, groups).any(|idx| group_of(&b, groups).any(|other| other == idx));
    if related { RELATED_FIELD_SCORE } else { 0.0 }
}

/// Company and title each contribute up to 50; the sum is capped at 100.
pub fn job_similarity(
    company_a: Option<&str>,
    title_a: Option<&str>,
    company_b: Option<&str>,
    title_b: Option<&str>,
) -> f64 {
    let company = field_equality(company_a, company_b, INDUSTRY_GROUPS).min(JOB_FIELD_CAP);
    let title = field_equality(title_a, title_b, ROLE_GROUPS).min(JOB_FIELD_CAP);
    (company + title).min(100.0)
}

fn location_parts(label: &str) -> Vec<String> {
    label
        .split(',')
        .map(fold_key)
        .filter(|part| !part.is_empty())
        .collect()
}

/// Compare `"city, country"` labels: identical → 100, shared components →
/// proportional to the larger side, disjoint → 0, missing → 25.
pub fn location_similarity(a: Option<&Location>, b: Option<&Location>) -> f64 {
    let (Some(a), Some(b)) = (a.and_then(Location::label), b.and_then(Location::label)) else {
        return MISSING_LOCATION_SCORE;
    };

    if fold_key(&a) == fold_key(&b) {
        return 100.0;
    }

    let parts_a = location_parts(&a);
    let parts_b = location_parts(&b);
    let denominator = parts_a.len().max(parts_b.len());
    if denominator == 0 {
        return MISSING_LOCATION_SCORE;
    }

    let common = parts_a.iter().filter(|part| parts_b.contains(part)).count();
    common as f64 / denominator as f64 * 100.0
}
