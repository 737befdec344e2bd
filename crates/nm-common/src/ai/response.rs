//! Validation and coercion of AI payloads into the shared result shapes.
//!
//! A parseable JSON object is never rejected for bad field values: scores are
//! clamped, lists default to empty and strings to placeholders. Only a body
//! that is not a JSON object at all is `Malformed`.

use chrono::Utc;
use serde_json::{Map, Value};

use super::AiUnavailable;
use crate::matching::meetings::{MeetingPlan, MeetingSuggestion};
use crate::matching::result::{MatchResult, MatchSource, clamp_score, truncate_topics};

pub const AI_REASONING_PLACEHOLDER: &str = "AI analysis completed";
pub const AI_COLLABORATION_PLACEHOLDER: &str = "To be determined";
pub const AI_NETWORKING_PLACEHOLDER: &str = "Mutual benefit potential";

/// Parse the model's message content into a JSON object, tolerating prose or
/// code fences around it.
pub fn extract_json_object(content: &str) -> Result<Map<String, Value>, AiUnavailable> {
    let trimmed = content.trim();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(map);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => {
            match serde_json::from_str::<Value>(&trimmed[start..=end]) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Err(AiUnavailable::Malformed("payload is not a JSON object".into())),
                Err(err) => Err(AiUnavailable::Malformed(err.to_string())),
            }
        }
        _ => Err(AiUnavailable::Malformed("no JSON object in response".into())),
    }
}

fn coerce_score(value: Option<&Value>) -> u8 {
    match value {
        Some(Value::Number(number)) => number.as_f64().map(clamp_score).unwrap_or(0),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().map(clamp_score).unwrap_or(0),
        _ => 0,
    }
}

fn coerce_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn coerce_text(value: Option<&Value>, placeholder: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(placeholder)
        .to_string()
}

pub fn match_result_from_payload(payload: &Map<String, Value>, model: &str) -> MatchResult {
    MatchResult {
        score: coerce_score(payload.get("compatibilityScore")),
        reasoning: coerce_text(payload.get("reasoning"), AI_REASONING_PLACEHOLDER),
        shared_interests: coerce_list(payload.get("sharedInterests")),
        complementary_skills: coerce_list(payload.get("complementarySkills")),
        meeting_topics: truncate_topics(coerce_list(payload.get("meetingTopics"))),
        collaboration_potential: coerce_text(
            payload.get("collaborationPotential"),
            AI_COLLABORATION_PLACEHOLDER,
        ),
        networking_value: coerce_text(payload.get("networkingValue"), AI_NETWORKING_PLACEHOLDER),
        match_categories: coerce_list(payload.get("matchCategories")),
        source: MatchSource::Ai,
        breakdown: None,
        traditional_score: None,
        model: Some(model.to_string()),
        generated_at: Utc::now(),
    }
}

fn suggestion_from_value(value: &Value) -> Option<MeetingSuggestion> {
    let object = value.as_object()?;
    Some(MeetingSuggestion {
        title: coerce_text(object.get("title"), "Networking meeting"),
        format: coerce_text(object.get("format"), "both"),
        duration: coerce_text(object.get("duration"), "30min"),
        topics: truncate_topics(coerce_list(object.get("topics"))),
        goals: coerce_list(object.get("goals")),
        agenda: coerce_list(object.get("agenda")),
        expected_outcomes: coerce_list(object.get("expectedOutcomes")),
    })
}

/// A plan with no usable suggestion counts as malformed so the caller can fall back.
pub fn meeting_plan_from_payload(payload: &Map<String, Value>) -> Result<MeetingPlan, AiUnavailable> {
    let suggestions = match payload.get("suggestions") {
        Some(Value::Array(items)) => items.iter().filter_map(suggestion_from_value).collect(),
        _ => Vec::new(),
    };

    if suggestions.is_empty() {
        return Err(AiUnavailable::Malformed("no meeting suggestions".into()));
    }

    Ok(MeetingPlan {
        suggestions,
        ice_breakers: coerce_list(payload.get("iceBreakers")),
        follow_up_ideas: coerce_list(payload.get("followUpIdeas")),
        networking_opportunities: coerce_list(payload.get("networkingOpportunities")),
        source: MatchSource::Ai,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn out_of_range_score_is_clamped_not_rejected() {
        let result = match_result_from_payload(&object(json!({"compatibilityScore": 150})), "m");
        assert_eq!(result.score, 100);
        assert_eq!(result.source, MatchSource::Ai);
        assert_eq!(result.reasoning, AI_REASONING_PLACEHOLDER);
        assert_eq!(result.collaboration_potential, AI_COLLABORATION_PLACEHOLDER);
        assert_eq!(result.networking_value, AI_NETWORKING_PLACEHOLDER);
        assert!(result.shared_interests.is_empty());
        assert_eq!(result.model.as_deref(), Some("m"));
    }

    #[test]
    fn score_coercion_handles_strings_and_garbage() {
        let score = |v: Value| match_result_from_payload(&object(json!({ "compatibilityScore": v })), "m").score;
        assert_eq!(score(json!("72.6")), 73);
        assert_eq!(score(json!(-5)), 0);
        assert_eq!(score(json!("high")), 0);
        assert_eq!(score(json!(null)), 0);
        assert_eq!(match_result_from_payload(&Map::new(), "m").score, 0);
    }

    #[test]
    fn lists_drop_non_strings_and_topics_are_capped() {
        let payload = object(json!({
            "sharedInterests": ["AI", 3, null, " "],
            "meetingTopics": ["1", "2", "3", "4", "5", "6", "7"],
            "complementarySkills": "not a list"
        }));
        let result = match_result_from_payload(&payload, "m");
        assert_eq!(result.shared_interests, vec!["AI".to_string()]);
        assert_eq!(result.meeting_topics.len(), 5);
        assert!(result.complementary_skills.is_empty());
    }

    #[test]
    fn extract_json_object_tolerates_fences() {
        let content = "Here you go:\n```json\n{\"compatibilityScore\": 80}\n```";
        let map = extract_json_object(content).unwrap();
        assert_eq!(map["compatibilityScore"], json!(80));
    }

    #[test]
    fn extract_json_object_rejects_non_objects() {
        assert!(matches!(
            extract_json_object("no json here"),
            Err(AiUnavailable::Malformed(_))
        ));
        assert!(matches!(
            extract_json_object("[1, 2, 3]"),
            Err(AiUnavailable::Malformed(_))
        ));
        assert!(matches!(
            extract_json_object("{ broken"),
            Err(AiUnavailable::Malformed(_))
        ));
    }

    #[test]
    fn meeting_plan_requires_a_suggestion() {
        assert!(meeting_plan_from_payload(&object(json!({"iceBreakers": ["hi"]}))).is_err());

        let plan = meeting_plan_from_payload(&object(json!({
            "suggestions": [{"title": "Coffee", "topics": ["Rust"]}, "junk"],
            "iceBreakers": ["hi"]
        })))
        .unwrap();
        assert_eq!(plan.suggestions.len(), 1);
        assert_eq!(plan.suggestions[0].duration, "30min");
        assert_eq!(plan.ice_breakers, vec!["hi".to_string()]);
        assert_eq!(plan.source, MatchSource::Ai);
    }
}
