use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{instrument, warn};

use crate::db::PgPool;
use crate::store::{ProfileStore, StoreError};
use crate::{Location, MeetingDuration, MeetingFormat, MeetingPreferences, Profile};

const PROFILE_COLUMNS: &str = "user_id, display_name, title, company, city, country, \
    skills, interests, networking_goals, bio, meeting_format, meeting_duration, time_zone, \
    is_active, updated_at";

/// Raw column values of one `nm.profiles` row.
#[derive(Debug, Clone, Default)]
pub struct ProfileRow {
    pub user_id: String,
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub skills: Vec<Option<String>>,
    pub interests: Vec<Option<String>>,
    pub networking_goals: Vec<Option<String>>,
    pub bio: Option<String>,
    pub meeting_format: String,
    pub meeting_duration: String,
    pub time_zone: String,
    pub is_active: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

fn flatten(values: Vec<Option<String>>) -> Vec<String> {
    values.into_iter().flatten().collect()
}

impl ProfileRow {
    fn from_row(row: &Row) -> Result<Self, StoreError> {
        let text = |name: &str| -> Result<Option<String>, StoreError> {
            row.try_get(name)
                .map_err(|err| StoreError::Mapping(format!("{name}: {err}")))
        };
        let list = |name: &str| -> Result<Vec<Option<String>>, StoreError> {
            row.try_get::<_, Option<Vec<Option<String>>>>(name)
                .map(Option::unwrap_or_default)
                .map_err(|err| StoreError::Mapping(format!("{name}: {err}")))
        };

        Ok(Self {
            user_id: row
                .try_get("user_id")
                .map_err(|err| StoreError::Mapping(format!("user_id: {err}")))?,
            display_name: text("display_name")?,
            title: text("title")?,
            company: text("company")?,
            city: text("city")?,
            country: text("country")?,
            skills: list("skills")?,
            interests: list("interests")?,
            networking_goals: list("networking_goals")?,
            bio: text("bio")?,
            meeting_format: text("meeting_format")?.unwrap_or_default(),
            meeting_duration: text("meeting_duration")?.unwrap_or_default(),
            time_zone: text("time_zone")?.unwrap_or_default(),
            is_active: row
                .try_get::<_, Option<bool>>("is_active")
                .map_err(|err| StoreError::Mapping(format!("is_active: {err}")))?
                .unwrap_or(true),
            updated_at: row
                .try_get("updated_at")
                .map_err(|err| StoreError::Mapping(format!("updated_at: {err}")))?,
        })
    }

    /// Unknown meeting preference spellings fall back to defaults instead of failing the row.
    pub fn into_profile(self) -> Profile {
        let format = MeetingFormat::parse(&self.meeting_format).unwrap_or_else(|| {
            if !self.meeting_format.is_empty() {
                warn!(user_id = %self.user_id, value = %self.meeting_format, "unknown meeting format");
            }
            MeetingFormat::default()
        });
        let duration = MeetingDuration::parse(&self.meeting_duration).unwrap_or_default();

        Profile {
            user_id: self.user_id,
            display_name: self.display_name,
            title: self.title,
            company: self.company,
            location: Some(Location {
                city: self.city,
                country: self.country,
            }),
            skills: flatten(self.skills),
            interests: flatten(self.interests),
            networking_goals: flatten(self.networking_goals),
            bio: self.bio,
            meeting_preferences: MeetingPreferences {
                format,
                duration,
                time_zone: self.time_zone,
            },
            is_active: self.is_active,
            version: self.updated_at.map(|ts| ts.timestamp_millis()).unwrap_or(0),
        }
        .normalized()
    }
}

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    #[instrument(skip(self))]
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM nm.profiles WHERE user_id = $1");
        let row = client.query_opt(sql.as_str(), &[&user_id.trim()]).await?;

        row.map(|row| ProfileRow::from_row(&row).map(ProfileRow::into_profile))
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_active_profiles(&self, exclude_user_id: &str) -> Result<Vec<Profile>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM nm.profiles \
             WHERE is_active AND user_id <> $1 ORDER BY user_id"
        );
        let rows = client.query(sql.as_str(), &[&exclude_user_id]).await?;

        let mut profiles = Vec::with_capacity(rows.len());
        for row in &rows {
            match ProfileRow::from_row(row) {
                Ok(parsed) => profiles.push(parsed.into_profile()),
                // One bad row must not hide the rest of the pool.
                Err(err) => warn!(error = %err, "skipping unreadable profile row"),
            }
        }
        Ok(profiles)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }
}
