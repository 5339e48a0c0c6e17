use anyhow::Context;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::models::TeachingUnit;
use crate::store::{SnapshotStore, SNAPSHOT_KEY};

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("gradebook schema ready");
    Ok(())
}

/// Snapshot row in `gradebook.snapshots`, keyed like the file store.
pub struct PgStore {
    pool: PgPool,
    key: String,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            key: SNAPSHOT_KEY.to_string(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl SnapshotStore for PgStore {
    async fn load(&self) -> anyhow::Result<Option<Vec<TeachingUnit>>> {
        let row = sqlx::query("SELECT payload FROM gradebook.snapshots WHERE key = $1")
            .bind(&self.key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            debug!(key = %self.key, "no snapshot stored yet");
            return Ok(None);
        };

        let payload: String = row.get("payload");
        let units = serde_json::from_str(&payload)
            .with_context(|| format!("snapshot {} is not valid JSON", self.key))?;
        Ok(Some(units))
    }

    async fn save(&self, units: &[TeachingUnit]) -> anyhow::Result<()> {
        let payload = serde_json::to_string(units)?;
        sqlx::query(
            r#"
            INSERT INTO gradebook.snapshots (key, payload, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
            SET payload = EXCLUDED.payload, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&self.key)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        debug!(key = %self.key, units = units.len(), "snapshot saved");
        Ok(())
    }
}
