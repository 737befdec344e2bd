use serde::{Deserialize, Serialize};

use crate::{MeetingDuration, MeetingFormat, Profile};

use super::result::MatchSource;

const MAX_GOALS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSuggestion {
    pub title: String,
    pub format: String,
    pub duration: String,
    pub topics: Vec<String>,
    pub goals: Vec<String>,
    pub agenda: Vec<String>,
    pub expected_outcomes: Vec<String>,
}

/// Meeting enrichment returned with match details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPlan {
    pub suggestions: Vec<MeetingSuggestion>,
    pub ice_breakers: Vec<String>,
    pub follow_up_ideas: Vec<String>,
    pub networking_opportunities: Vec<String>,
    pub source: MatchSource,
}

/// Format both sides can attend. Conflicting hard preferences settle on virtual.
pub fn agreed_format(a: MeetingFormat, b: MeetingFormat) -> MeetingFormat {
    match (a, b) {
        (MeetingFormat::Both, other) | (other, MeetingFormat::Both) => other,
        (left, right) if left == right => left,
        _ => MeetingFormat::Virtual,
    }
}

/// Shorter of the two preferred durations.
pub fn agreed_duration(a: MeetingDuration, b: MeetingDuration) -> MeetingDuration {
    if a.minutes() <= b.minutes() { a } else { b }
}

/// Plan derived only from the two profiles, used when the AI path is unavailable.
pub fn fallback_meeting_plan(
    requester: &Profile,
    target: &Profile,
    topics: &[String],
    shared_interests: &[String],
    complementary_skills: &[String],
) -> MeetingPlan {
    let format = agreed_format(
        requester.meeting_preferences.format,
        target.meeting_preferences.format,
    );
    let duration = agreed_duration(
        requester.meeting_preferences.duration,
        target.meeting_preferences.duration,
    );

    let mut goals = requester
        .networking_goals
        .iter()
        .take(MAX_GOALS)
        .cloned()
        .collect::<Vec<_>>();
    if goals.is_empty() {
        goals.push("Explore collaboration opportunities".to_string());
    }

    let mut agenda = vec!["Introductions and current focus".to_string()];
    agenda.extend(topics.iter().cloned());
    agenda.push("Agree on next steps".to_string());

    let mut ice_breakers = shared_interests
        .iter()
        .map(|interest| format!("What got you interested in {interest}?"))
        .collect::<Vec<_>>();
    ice_breakers.push("What are you working on right now?".to_string());

    let networking_opportunities = if complementary_skills.is_empty() {
        vec!["Introduce each other to relevant contacts".to_string()]
    } else {
        complementary_skills
            .iter()
            .map(|pair| format!("Pair up on {pair}"))
            .collect()
    };

    MeetingPlan {
        suggestions: vec![MeetingSuggestion {
            title: format!("Networking conversation with {}", target.display_name_or_id()),
            format: format.as_str().to_string(),
            duration: duration.as_str().to_string(),
            topics: topics.to_vec(),
            goals,
            agenda,
            expected_outcomes: vec![
                "Clear picture of each other's expertise".to_string(),
                "Decision on whether to collaborate further".to_string(),
            ],
        }],
        ice_breakers,
        follow_up_ideas: vec![
            "Share resources mentioned during the meeting".to_string(),
            "Schedule a follow-up conversation".to_string(),
        ],
        networking_opportunities,
        source: MatchSource::Deterministic,
    }
}
