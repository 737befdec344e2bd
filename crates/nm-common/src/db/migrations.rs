use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::PgPool;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "profiles table",
        sql: r#"
CREATE TABLE IF NOT EXISTS nm.profiles (
    user_id TEXT PRIMARY KEY,
    display_name TEXT,
    title TEXT,
    company TEXT,
    city TEXT,
    country TEXT,
    skills TEXT[] NOT NULL DEFAULT '{}',
    interests TEXT[] NOT NULL DEFAULT '{}',
    networking_goals TEXT[] NOT NULL DEFAULT '{}',
    bio TEXT,
    meeting_format TEXT NOT NULL DEFAULT 'both',
    meeting_duration TEXT NOT NULL DEFAULT '30min',
    time_zone TEXT NOT NULL DEFAULT 'UTC',
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_profiles_active
    ON nm.profiles(user_id)
    WHERE is_active;
"#,
    },
    Migration {
        id: 2,
        description: "meeting preference value checks",
        sql: r#"
DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'chk_profiles_meeting_format'
    ) THEN
        ALTER TABLE nm.profiles
            ADD CONSTRAINT chk_profiles_meeting_format
            CHECK (meeting_format IN ('virtual', 'in-person', 'both'));
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'chk_profiles_meeting_duration'
    ) THEN
        ALTER TABLE nm.profiles
            ADD CONSTRAINT chk_profiles_meeting_duration
            CHECK (meeting_duration IN ('15min', '30min', '45min', '60min'));
    END IF;
END $$;
"#,
    },
];

/// Apply pending migrations, each in its own transaction. Safe to run on every start.
#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS nm;
             CREATE TABLE IF NOT EXISTS nm.schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in MIGRATIONS {
        let already_applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM nm.schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .get(0);

        if already_applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(migration.sql).await?;
        tx.execute(
            "INSERT INTO nm.schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}
