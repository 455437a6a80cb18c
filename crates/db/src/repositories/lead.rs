use sqlx::{QueryBuilder, Row, Sqlite};

use salesbook_core::domain::lead::{DealStatus, Lead, LeadDraft, LeadFilter, LeadId, LeadPatch};
use salesbook_core::domain::location::LocationId;

use super::location::{now_timestamp, parse_timestamp};
use super::{decode_error, LeadRepository, RepositoryError};
use crate::DbPool;

const LEAD_SELECT: &str = "SELECT l.id, l.name, l.location_id, loc.name AS location_name,
                                  l.indiamart_link, l.deal_status, l.comments, l.address,
                                  l.created_at
                           FROM lead l
                           LEFT JOIN location loc ON loc.id = l.location_id";

pub struct SqlLeadRepository {
    pool: DbPool,
}

impl SqlLeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_lead(row: &sqlx::sqlite::SqliteRow) -> Result<Lead, RepositoryError> {
    let status: Option<String> = row.try_get("deal_status").map_err(decode_error)?;
    let deal_status = status.map(|raw| raw.parse::<DealStatus>()).transpose().map_err(decode_error)?;
    let location_id: Option<i64> = row.try_get("location_id").map_err(decode_error)?;

    Ok(Lead {
        id: LeadId(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        location_id: location_id.map(LocationId),
        location_name: row.try_get("location_name").map_err(decode_error)?,
        indiamart_link: row.try_get("indiamart_link").map_err(decode_error)?,
        deal_status,
        comments: row.try_get("comments").map_err(decode_error)?,
        address: row.try_get("address").map_err(decode_error)?,
        created_at: parse_timestamp(row.try_get("created_at").map_err(decode_error)?),
    })
}

async fn ensure_location(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    location_id: Option<LocationId>,
) -> Result<(), RepositoryError> {
    let Some(id) = location_id else {
        return Ok(());
    };
    let found = sqlx::query("SELECT id FROM location WHERE id = ?")
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(RepositoryError::NotFound(format!("location {} not found", id.0))),
    }
}

async fn fetch_lead(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    id: LeadId,
) -> Result<Lead, RepositoryError> {
    let row = sqlx::query(&format!("{LEAD_SELECT} WHERE l.id = ?"))
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await?;
    match row {
        Some(row) => row_to_lead(&row),
        None => Err(RepositoryError::NotFound(format!("lead {} not found", id.0))),
    }
}

#[async_trait::async_trait]
impl LeadRepository for SqlLeadRepository {
    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError> {
        let mut query_builder = QueryBuilder::<Sqlite>::new(LEAD_SELECT);
        query_builder.push(" WHERE 1 = 1");

        if let Some(location_id) = filter.location_id {
            query_builder.push(" AND l.location_id = ").push_bind(location_id.0);
        }
        if !filter.deal_statuses.is_empty() {
            query_builder.push(" AND l.deal_status IN (");
            let mut separated = query_builder.separated(", ");
            for status in &filter.deal_statuses {
                separated.push_bind(status.clone());
            }
            separated.push_unseparated(")");
        }
        query_builder.push(" ORDER BY l.created_at DESC, l.id DESC");

        let rows = query_builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_lead).collect()
    }

    async fn find_by_id(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError> {
        let row = sqlx::query(&format!("{LEAD_SELECT} WHERE l.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_lead).transpose()
    }

    async fn create(&self, draft: LeadDraft) -> Result<Lead, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        ensure_location(&mut tx, draft.location_id).await?;

        let (_, created_at) = now_timestamp();
        let done = sqlx::query(
            "INSERT INTO lead (name, location_id, indiamart_link, deal_status, comments,
                               address, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.name)
        .bind(draft.location_id.map(|id| id.0))
        .bind(&draft.indiamart_link)
        .bind(draft.deal_status.map(DealStatus::as_str))
        .bind(&draft.comments)
        .bind(&draft.address)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        let lead = fetch_lead(&mut tx, LeadId(done.last_insert_rowid())).await?;
        tx.commit().await?;
        Ok(lead)
    }

    async fn update(&self, id: LeadId, patch: LeadPatch) -> Result<Lead, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let current = fetch_lead(&mut tx, id).await?;

        let mut draft = current.to_draft();
        patch.apply(&mut draft);
        if draft.location_id != current.location_id {
            ensure_location(&mut tx, draft.location_id).await?;
        }

        sqlx::query(
            "UPDATE lead
             SET name = ?, location_id = ?, indiamart_link = ?, deal_status = ?,
                 comments = ?, address = ?
             WHERE id = ?",
        )
        .bind(&draft.name)
        .bind(draft.location_id.map(|location| location.0))
        .bind(&draft.indiamart_link)
        .bind(draft.deal_status.map(DealStatus::as_str))
        .bind(&draft.comments)
        .bind(&draft.address)
        .bind(id.0)
        .execute(&mut *tx)
        .await?;

        let lead = fetch_lead(&mut tx, id).await?;
        tx.commit().await?;
        Ok(lead)
    }

    async fn delete(&self, id: LeadId) -> Result<(), RepositoryError> {
        let done = sqlx::query("DELETE FROM lead WHERE id = ?").bind(id.0).execute(&self.pool).await?;
        if done.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("lead {} not found", id.0)));
        }
        Ok(())
    }
}
