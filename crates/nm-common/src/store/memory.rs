use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ProfileStore, StoreError};
use crate::Profile;

/// Profile store held in memory. Used by tests and for local runs seeded from a JSON file.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<BTreeMap<String, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(Profile::normalized)
            .filter(|profile| !profile.user_id.is_empty())
            .map(|profile| (profile.user_id.clone(), profile))
            .collect();
        Self {
            profiles: RwLock::new(profiles),
        }
    }

    /// Load a JSON array of profiles.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path)
            .await
            .map_err(|err| StoreError::Load(format!("{}: {err}", path.display())))?;
        let profiles: Vec<Profile> = serde_json::from_slice(&raw)
            .map_err(|err| StoreError::Load(format!("{}: {err}", path.display())))?;
        Ok(Self::from_profiles(profiles))
    }

    /// Insert or replace a profile, bumping its version so cached AI results go stale.
    pub async fn upsert(&self, profile: Profile) {
        let mut profile = profile.normalized();
        let mut profiles = self.profiles.write().await;
        if let Some(existing) = profiles.get(&profile.user_id) {
            profile.version = profile.version.max(existing.version + 1);
        }
        profiles.insert(profile.user_id.clone(), profile);
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.read().await.get(user_id.trim()).cloned())
    }

    async fn list_active_profiles(&self, exclude_user_id: &str) -> Result<Vec<Profile>, StoreError> {
        Ok(self
            .profiles
            .read()
            .await
            .values()
            .filter(|profile| profile.is_active && profile.user_id != exclude_user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_active_profiles_in_id_order_excluding_requester() {
        let store = InMemoryProfileStore::from_profiles([
            Profile::new("c"),
            Profile::new("a"),
            Profile {
                is_active: false,
                ..Profile::new("b")
            },
            Profile::new("me"),
        ]);

        let ids = store
            .list_active_profiles("me")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.user_id)
            .collect::<Vec<_>>();

        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn upsert_bumps_version() {
        let store = InMemoryProfileStore::from_profiles([Profile::new("a")]);
        store
            .upsert(Profile {
                title: Some("Engineer".into()),
                ..Profile::new("a")
            })
            .await;

        let profile = store.get_profile("a").await.unwrap().unwrap();
        assert_eq!(profile.version, 1);
        assert_eq!(profile.title.as_deref(), Some("Engineer"));
    }

    #[tokio::test]
    async fn missing_profile_is_none() {
        let store = InMemoryProfileStore::new();
        assert!(store.get_profile("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn from_json_file_reports_missing_file() {
        let err = InMemoryProfileStore::from_json_file("/definitely/not/here.json")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Load(_)));
    }
}
