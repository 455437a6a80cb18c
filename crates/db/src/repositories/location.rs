use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use salesbook_core::domain::location::{Location, LocationId};

use super::{decode_error, is_unique_violation, LocationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLocationRepository {
    pool: DbPool,
}

impl SqlLocationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
        .map(|value| value.with_timezone(&Utc))
}

pub(crate) fn now_timestamp() -> (DateTime<Utc>, String) {
    let now = Utc::now();
    let text = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    (parse_timestamp(Some(text.clone())).unwrap_or(now), text)
}

fn row_to_location(row: &sqlx::sqlite::SqliteRow) -> Result<Location, RepositoryError> {
    Ok(Location {
        id: LocationId(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        created_at: parse_timestamp(row.try_get("created_at").map_err(decode_error)?),
    })
}

fn duplicate_name(name: &str) -> RepositoryError {
    RepositoryError::Conflict(format!("Location '{name}' already exists"))
}

fn missing(id: LocationId) -> RepositoryError {
    RepositoryError::NotFound(format!("location {} not found", id.0))
}

#[async_trait::async_trait]
impl LocationRepository for SqlLocationRepository {
    async fn list(&self) -> Result<Vec<Location>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM location ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_location).collect()
    }

    async fn find_by_id(&self, id: LocationId) -> Result<Option<Location>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, created_at FROM location WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_location).transpose()
    }

    async fn create(&self, name: &str) -> Result<Location, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query("SELECT id FROM location WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(duplicate_name(name));
        }

        let (created_at, created_at_text) = now_timestamp();
        let result = sqlx::query("INSERT INTO location (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(created_at_text)
            .execute(&mut *tx)
            .await;
        let done = match result {
            Ok(done) => done,
            Err(error) if is_unique_violation(&error) => return Err(duplicate_name(name)),
            Err(error) => return Err(error.into()),
        };

        tx.commit().await?;
        Ok(Location {
            id: LocationId(done.last_insert_rowid()),
            name: name.to_string(),
            created_at: Some(created_at),
        })
    }

    async fn rename(&self, id: LocationId, name: &str) -> Result<Location, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query("SELECT id, name, created_at FROM location WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(current) = current else {
            return Err(missing(id));
        };
        let mut location = row_to_location(&current)?;

        let taken = sqlx::query("SELECT id FROM location WHERE name = ? AND id <> ?")
            .bind(name)
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(duplicate_name(name));
        }

        let result = sqlx::query("UPDATE location SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id.0)
            .execute(&mut *tx)
            .await;
        match result {
            Ok(_) => {}
            Err(error) if is_unique_violation(&error) => return Err(duplicate_name(name)),
            Err(error) => return Err(error.into()),
        }

        tx.commit().await?;
        location.name = name.to_string();
        Ok(location)
    }

    async fn delete(&self, id: LocationId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Leads go first so the cascade holds even on connections without foreign keys.
        sqlx::query("DELETE FROM lead WHERE location_id = ?").bind(id.0).execute(&mut *tx).await?;
        let done = sqlx::query("DELETE FROM location WHERE id = ?").bind(id.0).execute(&mut *tx).await?;
        if done.rows_affected() == 0 {
            return Err(missing(id));
        }

        tx.commit().await?;
        Ok(())
    }
}
