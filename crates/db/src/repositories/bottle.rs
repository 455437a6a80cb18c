use sqlx::Row;

use salesbook_core::domain::bottle::{BottleType, BottleTypeDraft, BottleTypeId};

use super::{decimal_column, decode_error, is_unique_violation, BottleTypeRepository, RepositoryError};
use crate::DbPool;

const BOTTLE_COLUMNS: &str = "id, label, quantity_ltr, bottles_in_batch, can_price, price_per_kg,
                              box_cost, selling_price_per_batch";

pub struct SqlBottleTypeRepository {
    pool: DbPool,
}

impl SqlBottleTypeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn reference_count(&self, id: BottleTypeId) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM sale_item WHERE bottle_type_id = ?")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await?;
        row.try_get("count").map_err(decode_error)
    }
}

fn row_to_bottle(row: &sqlx::sqlite::SqliteRow) -> Result<BottleType, RepositoryError> {
    Ok(BottleType {
        id: BottleTypeId(row.try_get("id").map_err(decode_error)?),
        label: row.try_get("label").map_err(decode_error)?,
        quantity_ltr: decimal_column(row, "quantity_ltr")?,
        bottles_in_batch: row.try_get("bottles_in_batch").map_err(decode_error)?,
        can_price: decimal_column(row, "can_price")?,
        price_per_kg: decimal_column(row, "price_per_kg")?,
        box_cost: decimal_column(row, "box_cost")?,
        selling_price_per_batch: decimal_column(row, "selling_price_per_batch")?,
    })
}

fn with_id(id: BottleTypeId, draft: BottleTypeDraft) -> BottleType {
    BottleType {
        id,
        label: draft.label,
        quantity_ltr: draft.quantity_ltr,
        bottles_in_batch: draft.bottles_in_batch,
        can_price: draft.can_price,
        price_per_kg: draft.price_per_kg,
        box_cost: draft.box_cost,
        selling_price_per_batch: draft.selling_price_per_batch,
    }
}

fn duplicate_label(label: &str) -> RepositoryError {
    RepositoryError::Conflict(format!("Bottle type '{label}' already exists"))
}

#[async_trait::async_trait]
impl BottleTypeRepository for SqlBottleTypeRepository {
    async fn list(&self, search: Option<&str>) -> Result<Vec<BottleType>, RepositoryError> {
        let pattern = search
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| format!("%{}%", term.to_lowercase()));

        let rows = match pattern {
            Some(pattern) => {
                sqlx::query(&format!(
                    "SELECT {BOTTLE_COLUMNS} FROM bottle_type
                     WHERE LOWER(label) LIKE ?
                     ORDER BY CAST(quantity_ltr AS REAL) ASC, id ASC"
                ))
                .bind(pattern)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {BOTTLE_COLUMNS} FROM bottle_type
                     ORDER BY CAST(quantity_ltr AS REAL) ASC, id ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_bottle).collect()
    }

    async fn find_by_id(&self, id: BottleTypeId) -> Result<Option<BottleType>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {BOTTLE_COLUMNS} FROM bottle_type WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_bottle).transpose()
    }

    async fn create(&self, draft: BottleTypeDraft) -> Result<BottleType, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO bottle_type (label, quantity_ltr, bottles_in_batch, can_price,
                                      price_per_kg, box_cost, selling_price_per_batch)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.label)
        .bind(draft.quantity_ltr.to_string())
        .bind(draft.bottles_in_batch)
        .bind(draft.can_price.to_string())
        .bind(draft.price_per_kg.to_string())
        .bind(draft.box_cost.to_string())
        .bind(draft.selling_price_per_batch.to_string())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(with_id(BottleTypeId(done.last_insert_rowid()), draft)),
            Err(error) if is_unique_violation(&error) => Err(duplicate_label(&draft.label)),
            Err(error) => Err(error.into()),
        }
    }

    async fn update(
        &self,
        id: BottleTypeId,
        draft: BottleTypeDraft,
    ) -> Result<BottleType, RepositoryError> {
        let result = sqlx::query(
            "UPDATE bottle_type
             SET label = ?, quantity_ltr = ?, bottles_in_batch = ?, can_price = ?,
                 price_per_kg = ?, box_cost = ?, selling_price_per_batch = ?
             WHERE id = ?",
        )
        .bind(&draft.label)
        .bind(draft.quantity_ltr.to_string())
        .bind(draft.bottles_in_batch)
        .bind(draft.can_price.to_string())
        .bind(draft.price_per_kg.to_string())
        .bind(draft.box_cost.to_string())
        .bind(draft.selling_price_per_batch.to_string())
        .bind(id.0)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(RepositoryError::NotFound(format!("bottle type {} not found", id.0)))
            }
            Ok(_) => Ok(with_id(id, draft)),
            Err(error) if is_unique_violation(&error) => Err(duplicate_label(&draft.label)),
            Err(error) => Err(error.into()),
        }
    }

    async fn delete(&self, id: BottleTypeId) -> Result<(), RepositoryError> {
        let references = self.reference_count(id).await?;
        if references > 0 {
            return Err(RepositoryError::Conflict(format!(
                "Bottle type is used by {references} sale item(s) and cannot be deleted"
            )));
        }

        let result = sqlx::query("DELETE FROM bottle_type WHERE id = ?").bind(id.0).execute(&self.pool).await;
        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(RepositoryError::NotFound(format!("bottle type {} not found", id.0)))
            }
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => Err(
                RepositoryError::Conflict("Bottle type is used by existing sales".to_string()),
            ),
            Err(error) => Err(error.into()),
        }
    }

    async fn upsert_by_label(&self, draft: BottleTypeDraft) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM bottle_type WHERE label = ?")
            .bind(&draft.label)
            .fetch_optional(&mut *tx)
            .await?;

        let created = match existing {
            Some(row) => {
                let id: i64 = row.try_get("id").map_err(decode_error)?;
                sqlx::query(
                    "UPDATE bottle_type
                     SET quantity_ltr = ?, bottles_in_batch = ?, can_price = ?,
                         price_per_kg = ?, box_cost = ?, selling_price_per_batch = ?
                     WHERE id = ?",
                )
                .bind(draft.quantity_ltr.to_string())
                .bind(draft.bottles_in_batch)
                .bind(draft.can_price.to_string())
                .bind(draft.price_per_kg.to_string())
                .bind(draft.box_cost.to_string())
                .bind(draft.selling_price_per_batch.to_string())
                .bind(id)
                .execute(&mut *tx)
                .await?;
                false
            }
            None => {
                sqlx::query(
                    "INSERT INTO bottle_type (label, quantity_ltr, bottles_in_batch, can_price,
                                              price_per_kg, box_cost, selling_price_per_batch)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&draft.label)
                .bind(draft.quantity_ltr.to_string())
                .bind(draft.bottles_in_batch)
                .bind(draft.can_price.to_string())
                .bind(draft.price_per_kg.to_string())
                .bind(draft.box_cost.to_string())
                .bind(draft.selling_price_per_batch.to_string())
                .execute(&mut *tx)
                .await?;
                true
            }
        };

        tx.commit().await?;
        Ok(created)
    }
}
