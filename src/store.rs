use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::db::PgStore;
use crate::models::TeachingUnit;

/// Well-known identifier the whole unit sequence is saved under.
pub const SNAPSHOT_KEY: &str = "grade-calculator-eus";

#[allow(async_fn_in_trait)]
pub trait SnapshotStore {
    async fn load(&self) -> anyhow::Result<Option<Vec<TeachingUnit>>>;
    async fn save(&self, units: &[TeachingUnit]) -> anyhow::Result<()>;
}

pub fn default_path() -> PathBuf {
    PathBuf::from(format!("{SNAPSHOT_KEY}.json"))
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> anyhow::Result<Option<Vec<TeachingUnit>>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no snapshot file yet");
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let units = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a valid snapshot", self.path.display()))?;
        Ok(Some(units))
    }

    async fn save(&self, units: &[TeachingUnit]) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(units)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        debug!(path = %self.path.display(), units = units.len(), "snapshot saved");
        Ok(())
    }
}

/// Store selected at startup: Postgres when `DATABASE_URL` is set, a local file otherwise.
pub enum Backend {
    File(JsonFileStore),
    Postgres(PgStore),
}

impl SnapshotStore for Backend {
    async fn load(&self) -> anyhow::Result<Option<Vec<TeachingUnit>>> {
        match self {
            Backend::File(store) => store.load().await,
            Backend::Postgres(store) => store.load().await,
        }
    }

    async fn save(&self, units: &[TeachingUnit]) -> anyhow::Result<()> {
        match self {
            Backend::File(store) => store.save(units).await,
            Backend::Postgres(store) => store.save(units).await,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_units;

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_round_trips_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join(default_path()));
        let units = seed_units();

        store.save(&units).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(units));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(err.to_string().contains("not a valid snapshot"));
    }

    #[test]
    fn default_path_uses_snapshot_key() {
        assert_eq!(default_path(), PathBuf::from("grade-calculator-eus.json"));
    }
}
