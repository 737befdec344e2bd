//! Read-only access to profiles owned by the profile collaborator.

pub mod memory;

use async_trait::async_trait;
use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;

use crate::Profile;

pub use memory::InMemoryProfileStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map profile row: {0}")]
    Mapping(String),
    #[error("failed to load profiles: {0}")]
    Load(String),
}

/// Profiles returned by a store are already normalized (see [`Profile::normalized`]).
/// Missing optional attributes are empty or absent, never an error.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    /// Active profiles except `exclude_user_id`, ordered by user id.
    async fn list_active_profiles(&self, exclude_user_id: &str) -> Result<Vec<Profile>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
