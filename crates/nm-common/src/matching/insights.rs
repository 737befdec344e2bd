use std::collections::HashSet;

use crate::normalize::fold_key;

use super::result::MAX_MEETING_TOPICS;

/// skill keyword -> keywords of skills that complement it
const COMPLEMENTARY_PAIRS: &[(&str, &[&str])] = &[
    ("frontend", &["backend", "api", "database"]),
    ("backend", &["frontend", "ui", "design"]),
    ("design", &["development", "programming", "coding"]),
    ("marketing", &["product", "development", "analytics"]),
    ("sales", &["marketing", "business development"]),
    ("data", &["analytics", "visualization", "reporting"]),
];

pub const SKILL_EXCHANGE_TOPIC: &str = "Knowledge sharing and skill exchange";
pub const NETWORKING_TOPIC: &str = "Professional networking and career insights";

/// Case-insensitive intersection in the requester's order and spelling.
pub fn shared_interests(requester: &[String], candidate: &[String]) -> Vec<String> {
    let theirs = candidate.iter().map(|v| fold_key(v)).collect::<HashSet<_>>();
    let mut seen = HashSet::new();

    requester
        .iter()
        .filter(|value| {
            let key = fold_key(value);
            !key.is_empty() && theirs.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}

fn complements(skill: &str, other: &str) -> bool {
    COMPLEMENTARY_PAIRS.iter().any(|(keyword, partners)| {
        skill.contains(keyword) && partners.iter().any(|partner| other.contains(partner))
    })
}

/// `"skillA + skillB"` for each cross pair that hits the complementary table.
pub fn complementary_skills(requester: &[String], candidate: &[String]) -> Vec<String> {
    let mut pairs = Vec::new();
    let mut seen = HashSet::new();

    for mine in requester {
        let mine_key = fold_key(mine);
        for theirs in candidate {
            let theirs_key = fold_key(theirs);
            if complements(&mine_key, &theirs_key) && seen.insert((mine_key.clone(), theirs_key)) {
                pairs.push(format!("{mine} + {theirs}"));
            }
        }
    }

    pairs
}

/// Shared interests first, then the fixed skill-exchange and networking topics.
pub fn meeting_topics(shared: &[String], any_skills: bool) -> Vec<String> {
    let mut topics = shared
        .iter()
        .map(|interest| format!("Discussing {interest}"))
        .collect::<Vec<_>>();

    if any_skills {
        topics.push(SKILL_EXCHANGE_TOPIC.to_string());
    }
    topics.push(NETWORKING_TOPIC.to_string());

    topics.truncate(MAX_MEETING_TOPICS);
    topics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn shared_interests_keep_requester_casing() {
        let shared = shared_interests(&strings(&["AI", "Hiking", "ai"]), &strings(&["ai", "travel"]));
        assert_eq!(shared, strings(&["AI"]));
    }

    #[test]
    fn complementary_skills_emit_each_pair_once() {
        let pairs = complementary_skills(
            &strings(&["Frontend Development", "Data Science"]),
            &strings(&["Backend APIs", "Analytics"]),
        );
        assert_eq!(
            pairs,
            strings(&["Frontend Development + Backend APIs", "Data Science + Analytics"])
        );
    }

    #[test]
    fn complementary_skills_ignore_case_duplicates() {
        let pairs = complementary_skills(
            &strings(&["Frontend", "frontend"]),
            &strings(&["Backend", "BACKEND"]),
        );
        assert_eq!(pairs, strings(&["Frontend + Backend"]));
    }

    #[test]
    fn complementary_skills_empty_without_table_hits() {
        assert!(complementary_skills(&strings(&["Rust"]), &strings(&["Go"])).is_empty());
    }

    #[test]
    fn meeting_topics_are_capped_at_five() {
        let shared = strings(&["A", "B", "C", "D", "E", "F"]);
        let topics = meeting_topics(&shared, true);
        assert_eq!(topics.len(), 5);
        assert_eq!(topics[0], "Discussing A");
    }

    #[test]
    fn meeting_topics_without_shared_or_skills() {
        assert_eq!(meeting_topics(&[], false), strings(&[NETWORKING_TOPIC]));
        assert_eq!(
            meeting_topics(&strings(&["AI"]), true),
            strings(&["Discussing AI", SKILL_EXCHANGE_TOPIC, NETWORKING_TOPIC])
        );
    }
}
