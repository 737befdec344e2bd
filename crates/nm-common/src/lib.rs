pub mod ai;
pub mod api;
pub mod db;
pub mod error;
pub mod logging;
pub mod matching;
pub mod normalize;
pub mod run_id;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod test_env;

use serde::{Deserialize, Serialize};

use normalize::{clean_list, clean_optional};

/// Structured location. Either component may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Location {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            country: Some(country.into()),
        }
    }

    /// `"city, country"` with empty components skipped. `None` when both are empty.
    pub fn label(&self) -> Option<String> {
        let parts = [self.city.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetingFormat {
    #[serde(rename = "virtual")]
    Virtual,
    #[serde(rename = "in-person")]
    InPerson,
    #[default]
    #[serde(rename = "both")]
    Both,
}

impl MeetingFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingFormat::Virtual => "virtual",
            MeetingFormat::InPerson => "in-person",
            MeetingFormat::Both => "both",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "virtual" => Some(MeetingFormat::Virtual),
            "in-person" | "in_person" | "inperson" => Some(MeetingFormat::InPerson),
            "both" => Some(MeetingFormat::Both),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetingDuration {
    #[serde(rename = "15min")]
    Minutes15,
    #[default]
    #[serde(rename = "30min")]
    Minutes30,
    #[serde(rename = "45min")]
    Minutes45,
    #[serde(rename = "60min")]
    Minutes60,
}

impl MeetingDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingDuration::Minutes15 => "15min",
            MeetingDuration::Minutes30 => "30min",
            MeetingDuration::Minutes45 => "45min",
            MeetingDuration::Minutes60 => "60min",
        }
    }

    pub fn minutes(&self) -> u32 {
        match self {
            MeetingDuration::Minutes15 => 15,
            MeetingDuration::Minutes30 => 30,
            MeetingDuration::Minutes45 => 45,
            MeetingDuration::Minutes60 => 60,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "15min" | "15" => Some(MeetingDuration::Minutes15),
            "30min" | "30" => Some(MeetingDuration::Minutes30),
            "45min" | "45" => Some(MeetingDuration::Minutes45),
            "60min" | "60" => Some(MeetingDuration::Minutes60),
            _ => None,
        }
    }
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPreferences {
    #[serde(default)]
    pub format: MeetingFormat,
    #[serde(default)]
    pub duration: MeetingDuration,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

impl Default for MeetingPreferences {
    fn default() -> Self {
        Self {
            format: MeetingFormat::default(),
            duration: MeetingDuration::default(),
            time_zone: default_time_zone(),
        }
    }
}

fn default_active() -> bool {
    true
}

// Matchable attributes of a user. Scoring code only ever sees this fixed shape;
// loosely shaped store rows are normalized in `Profile::normalized` first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub networking_goals: Vec<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub meeting_preferences: MeetingPreferences,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Last update of the stored profile in epoch milliseconds.
    #[serde(default)]
    pub version: i64,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            display_name: None,
            title: None,
            company: None,
            location: None,
            skills: Vec::new(),
            interests: Vec::new(),
            networking_goals: Vec::new(),
            bio: None,
            meeting_preferences: MeetingPreferences::default(),
            is_active: true,
            version: 0,
        }
    }
}

impl Profile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    pub fn display_name_or_id(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.user_id)
    }

    pub fn location_label(&self) -> Option<String> {
        self.location.as_ref().and_then(Location::label)
    }

    /// Trim, de-duplicate and drop blank values so scoring never has to.
    pub fn normalized(self) -> Self {
        let location = self
            .location
            .map(|loc| Location {
                city: clean_optional(loc.city),
                country: clean_optional(loc.country),
            })
            .filter(|loc| loc.city.is_some() || loc.country.is_some());

        let time_zone = self.meeting_preferences.time_zone.trim().to_string();

        Self {
            user_id: self.user_id.trim().to_string(),
            display_name: clean_optional(self.display_name),
            title: clean_optional(self.title),
            company: clean_optional(self.company),
            location,
            skills: clean_list(self.skills),
            interests: clean_list(self.interests),
            networking_goals: clean_list(self.networking_goals),
            bio: clean_optional(self.bio),
            meeting_preferences: MeetingPreferences {
                time_zone: if time_zone.is_empty() {
                    default_time_zone()
                } else {
                    time_zone
                },
                ..self.meeting_preferences
            },
            is_active: self.is_active,
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_deserializes_with_defaults() {
        let profile: Profile = serde_json::from_str(r#"{"userId":"u1","skills":["Rust"]}"#).unwrap();

        assert_eq!(profile.user_id, "u1");
        assert!(profile.is_active);
        assert_eq!(profile.skills, vec!["Rust".to_string()]);
        assert_eq!(profile.meeting_preferences.format, MeetingFormat::Both);
        assert_eq!(profile.meeting_preferences.duration, MeetingDuration::Minutes30);
        assert_eq!(profile.meeting_preferences.time_zone, "UTC");
    }

    #[test]
    fn meeting_preferences_use_wire_spellings() {
        let prefs: MeetingPreferences =
            serde_json::from_str(r#"{"format":"in-person","duration":"45min","timeZone":"Asia/Tokyo"}"#)
                .unwrap();

        assert_eq!(prefs.format, MeetingFormat::InPerson);
        assert_eq!(prefs.duration.minutes(), 45);
        assert_eq!(serde_json::to_value(prefs.format).unwrap(), "in-person");
    }

    #[test]
    fn normalized_cleans_lists_and_blank_fields() {
        let profile = Profile {
            user_id: " u1 ".into(),
            title: Some("   ".into()),
            location: Some(Location {
                city: Some(" ".into()),
                country: None,
            }),
            skills: vec![" Rust ".into(), "rust".into(), "".into(), "Go".into()],
            ..Profile::default()
        }
        .normalized();

        assert_eq!(profile.user_id, "u1");
        assert_eq!(profile.title, None);
        assert_eq!(profile.location, None);
        assert_eq!(profile.skills, vec!["Rust".to_string(), "Go".to_string()]);
    }

    #[test]
    fn location_label_skips_missing_parts() {
        assert_eq!(
            Location::new("Tokyo", "Japan").label().as_deref(),
            Some("Tokyo, Japan")
        );
        let country_only = Location {
            city: None,
            country: Some("Japan".into()),
        };
        assert_eq!(country_only.label().as_deref(), Some("Japan"));
        assert_eq!(Location::default().label(), None);
    }
}
