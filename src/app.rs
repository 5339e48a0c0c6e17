use tracing::{info, warn};

use crate::codec;
use crate::gradebook::Gradebook;
use crate::store::SnapshotStore;

pub async fn load_book(store: &impl SnapshotStore) -> anyhow::Result<Gradebook> {
    let units = store.load().await?.unwrap_or_default();
    Ok(Gradebook::new(units))
}

/// Loads the snapshot, applies one edit and saves the result. A failed edit
/// leaves the stored snapshot as it was.
pub async fn apply<F>(store: &impl SnapshotStore, edit: F) -> anyhow::Result<Gradebook>
where
    F: FnOnce(Gradebook) -> anyhow::Result<Gradebook>,
{
    let book = edit(load_book(store).await?)?;
    store.save(book.units()).await?;
    Ok(book)
}

pub async fn export_code(store: &impl SnapshotStore) -> anyhow::Result<String> {
    let book = load_book(store).await?;
    Ok(codec::encode(book.units())?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportPreview {
    pub units: usize,
    pub subjects: usize,
    pub grades: usize,
}

fn decode_checked(code: &str) -> anyhow::Result<Vec<crate::models::TeachingUnit>> {
    if code.trim().is_empty() {
        anyhow::bail!("paste an export code to import");
    }
    codec::decode(code).map_err(|err| {
        warn!(error = %err, "rejected import code");
        err.into()
    })
}

/// Decodes and validates a code without touching the store.
pub fn preview_code(code: &str) -> anyhow::Result<ImportPreview> {
    let units = decode_checked(code)?;
    Ok(ImportPreview {
        units: units.len(),
        subjects: units.iter().map(|unit| unit.subjects.len()).sum(),
        grades: units.iter().map(|unit| unit.all_grades().count()).sum(),
    })
}

/// Replaces the whole snapshot with the decoded units, or nothing at all.
pub async fn import_code(store: &impl SnapshotStore, code: &str) -> anyhow::Result<Gradebook> {
    let units = decode_checked(code)?;
    store.save(&units).await?;
    info!(units = units.len(), "snapshot replaced from import code");
    Ok(Gradebook::new(units))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GradebookError;
    use crate::seed::seed_units;
    use crate::store::memory::MemoryStore;
    use crate::validation::{build_unit, NumericPolicy};

    #[tokio::test]
    async fn edits_are_saved() {
        let store = MemoryStore::default();
        let unit = build_unit("History", Some("2"), None, NumericPolicy::Strict).unwrap();
        let book = apply(&store, |book| Ok(book.add_unit(unit))).await.unwrap();

        assert_eq!(book.units().len(), 1);
        assert_eq!(store.saves(), 1);
        assert_eq!(load_book(&store).await.unwrap(), book);
    }

    #[tokio::test]
    async fn failed_edit_does_not_save() {
        let store = MemoryStore::with(seed_units());
        let err = apply(&store, |book| Ok(book.delete_unit("missing")?))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<GradebookError>(),
            Some(&GradebookError::not_found("unit", "missing"))
        );
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn import_replaces_snapshot() {
        let source = MemoryStore::with(seed_units());
        let code = export_code(&source).await.unwrap();

        let target = MemoryStore::default();
        let book = import_code(&target, &code).await.unwrap();
        assert_eq!(book.units(), seed_units_from(&source).await.as_slice());
        assert_eq!(target.saves(), 1);
    }

    #[tokio::test]
    async fn bad_import_leaves_snapshot_untouched() {
        let original = seed_units();
        let store = MemoryStore::with(original.clone());

        for code in ["", "%%%", "W3siaSI6IiJ9XQ=="] {
            assert!(import_code(&store, code).await.is_err(), "{code:?}");
        }
        assert_eq!(store.saves(), 0);
        assert_eq!(load_book(&store).await.unwrap().units().to_vec(), original);
    }

    #[tokio::test]
    async fn preview_counts_without_saving() {
        let store = MemoryStore::with(seed_units());
        let code = export_code(&store).await.unwrap();

        let preview = preview_code(&code).unwrap();
        assert_eq!(
            preview,
            ImportPreview {
                units: 3,
                subjects: 5,
                grades: 6,
            }
        );
        assert_eq!(store.saves(), 0);
        assert!(preview_code("%%%").is_err());
        assert!(preview_code("  ").is_err());
    }

    async fn seed_units_from(store: &MemoryStore) -> Vec<crate::models::TeachingUnit> {
        load_book(store).await.unwrap().units().to_vec()
    }
}
