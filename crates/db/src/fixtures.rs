use sqlx::Row;
use tracing::info;

use salesbook_core::domain::bottle::{default_catalog, BottleTypeDraft};

use crate::connection::DbPool;
use crate::repositories::{BottleTypeRepository, RepositoryError, SqlBottleTypeRepository};

/// Default bottle catalog, upserted by label so reruns refresh prices instead of duplicating rows.
pub struct BottleCatalogSeed;

impl BottleCatalogSeed {
    pub fn drafts() -> Vec<BottleTypeDraft> {
        default_catalog()
    }

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let repository = SqlBottleTypeRepository::new(pool.clone());
        let mut result = SeedResult::default();

        for draft in Self::drafts() {
            let label = draft.label.clone();
            if repository.upsert_by_label(draft).await? {
                result.created.push(label);
            } else {
                result.updated.push(label);
            }
        }

        info!(
            event_name = "catalog.bottles.seeded",
            created = result.created.len(),
            updated = result.updated.len(),
            "bottle catalog seeded"
        );
        Ok(result)
    }

    /// Checks that every catalog label is present exactly once.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for draft in Self::drafts() {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM bottle_type WHERE label = ?")
                .bind(&draft.label)
                .fetch_one(pool)
                .await?;
            let count: i64 = row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            checks.push((draft.label, count == 1));
        }

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub created: Vec<String>,
    pub updated: Vec<String>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
