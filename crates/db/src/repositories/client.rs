use sqlx::Row;

use salesbook_core::domain::client::{Client, ClientDraft, ClientId};

use super::{decode_error, is_unique_violation, ClientRepository, RepositoryError};
use crate::DbPool;

pub struct SqlClientRepository {
    pool: DbPool,
}

impl SqlClientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_client(row: &sqlx::sqlite::SqliteRow) -> Result<Client, RepositoryError> {
    Ok(Client {
        id: ClientId(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        address: row.try_get("address").map_err(decode_error)?,
        tax_id: row.try_get("tax_id").map_err(decode_error)?,
    })
}

fn duplicate_name(name: &str) -> RepositoryError {
    RepositoryError::Conflict(format!("Client '{name}' already exists"))
}

#[async_trait::async_trait]
impl ClientRepository for SqlClientRepository {
    async fn list(&self, search: Option<&str>) -> Result<Vec<Client>, RepositoryError> {
        let pattern = search
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| format!("%{}%", term.to_lowercase()));

        let rows = match pattern {
            Some(pattern) => {
                sqlx::query(
                    "SELECT id, name, address, tax_id FROM client
                     WHERE LOWER(name) LIKE ? ORDER BY name ASC",
                )
                .bind(pattern)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT id, name, address, tax_id FROM client ORDER BY name ASC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(row_to_client).collect()
    }

    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, address, tax_id FROM client WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_client).transpose()
    }

    async fn create(&self, draft: ClientDraft) -> Result<Client, RepositoryError> {
        let result =
            sqlx::query("INSERT INTO client (name, address, tax_id) VALUES (?, ?, ?)")
                .bind(&draft.name)
                .bind(&draft.address)
                .bind(&draft.tax_id)
                .execute(&self.pool)
                .await;

        match result {
            Ok(done) => Ok(Client {
                id: ClientId(done.last_insert_rowid()),
                name: draft.name,
                address: draft.address,
                tax_id: draft.tax_id,
            }),
            Err(error) if is_unique_violation(&error) => Err(duplicate_name(&draft.name)),
            Err(error) => Err(error.into()),
        }
    }

    async fn update(&self, id: ClientId, draft: ClientDraft) -> Result<Client, RepositoryError> {
        let result = sqlx::query("UPDATE client SET name = ?, address = ?, tax_id = ? WHERE id = ?")
            .bind(&draft.name)
            .bind(&draft.address)
            .bind(&draft.tax_id)
            .bind(id.0)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(RepositoryError::NotFound(format!("client {} not found", id.0)))
            }
            Ok(_) => Ok(Client { id, name: draft.name, address: draft.address, tax_id: draft.tax_id }),
            Err(error) if is_unique_violation(&error) => Err(duplicate_name(&draft.name)),
            Err(error) => Err(error.into()),
        }
    }

    async fn delete(&self, id: ClientId) -> Result<(), RepositoryError> {
        let done = sqlx::query("DELETE FROM client WHERE id = ?").bind(id.0).execute(&self.pool).await?;
        if done.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("client {} not found", id.0)));
        }
        Ok(())
    }
}
