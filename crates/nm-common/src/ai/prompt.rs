use std::fmt::Write;

use crate::Profile;

pub const MATCH_SYSTEM_PROMPT: &str = "You are an expert professional networking advisor. \
Assess how valuable a meeting between two professionals would be and answer with a single JSON object only.";

pub const MEETING_SYSTEM_PROMPT: &str = "You plan productive professional networking meetings. \
Answer with a single JSON object only.";

fn or_unspecified(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("Not specified")
}

fn list_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "None listed".to_string()
    } else {
        values.join(", ")
    }
}

fn describe_profile(out: &mut String, heading: &str, profile: &Profile) {
    let location = profile.location_label();
    let _ = writeln!(out, "{heading}:");
    let _ = writeln!(out, "- Name: {}", profile.display_name_or_id());
    let _ = writeln!(out, "- Title: {}", or_unspecified(profile.title.as_deref()));
    let _ = writeln!(out, "- Company: {}", or_unspecified(profile.company.as_deref()));
    let _ = writeln!(out, "- Location: {}", or_unspecified(location.as_deref()));
    let _ = writeln!(out, "- Skills: {}", list_or_none(&profile.skills));
    let _ = writeln!(out, "- Interests: {}", list_or_none(&profile.interests));
    let _ = writeln!(out, "- Networking goals: {}", list_or_none(&profile.networking_goals));
    let _ = writeln!(out, "- Bio: {}", or_unspecified(profile.bio.as_deref()));
}

/// Prompt asking for a compatibility assessment of `candidate` from `requester`'s point of view.
pub fn match_prompt(requester: &Profile, candidate: &Profile) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(
        "Analyze the professional compatibility of these two people for a networking meeting.\n\n",
    );
    describe_profile(&mut prompt, "Person looking for matches", requester);
    prompt.push('\n');
    describe_profile(&mut prompt, "Potential match", candidate);
    prompt.push_str(
        "\nRespond with JSON using exactly these keys:\n\
{\n\
  \"compatibilityScore\": <integer 0-100>,\n\
  \"reasoning\": \"<two or three sentences>\",\n\
  \"sharedInterests\": [\"...\"],\n\
  \"complementarySkills\": [\"...\"],\n\
  \"meetingTopics\": [\"at most five topics\"],\n\
  \"collaborationPotential\": \"...\",\n\
  \"networkingValue\": \"...\",\n\
  \"matchCategories\": [\"...\"]\n\
}\n",
    );
    prompt
}

pub fn meeting_prompt(participants: &[&Profile]) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str("Suggest networking meetings for these participants.\n\n");
    for (idx, profile) in participants.iter().enumerate() {
        describe_profile(&mut prompt, &format!("Participant {}", idx + 1), profile);
        let prefs = &profile.meeting_preferences;
        let _ = writeln!(
            prompt,
            "- Meeting preference: {} / {} ({})",
            prefs.format.as_str(),
            prefs.duration.as_str(),
            prefs.time_zone
        );
        prompt.push('\n');
    }
    prompt.push_str(
        "Respond with JSON using exactly these keys:\n\
{\n\
  \"suggestions\": [{\"title\": \"...\", \"format\": \"virtual|in-person|both\", \"duration\": \"15min|30min|45min|60min\", \
\"topics\": [], \"goals\": [], \"agenda\": [], \"expectedOutcomes\": []}],\n\
  \"iceBreakers\": [],\n\
  \"followUpIdeas\": [],\n\
  \"networkingOpportunities\": []\n\
}\n",
    );
    prompt
}
