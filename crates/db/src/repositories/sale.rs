use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};

use salesbook_core::domain::bottle::BottleTypeId;
use salesbook_core::domain::sale::{
    BillLine, BottlePack, CashLine, Sale, SaleDraft, SaleId, SaleLine, SaleType,
};
use salesbook_core::submission::DATE_FORMAT;

use super::{decimal_column, decode_error, RepositoryError, SaleRepository};
use crate::DbPool;

pub struct SqlSaleRepository {
    pool: DbPool,
}

impl SqlSaleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_lines(
        &self,
        sale_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<SaleLine>>, RepositoryError> {
        let mut lines: HashMap<i64, Vec<SaleLine>> = HashMap::new();
        if sale_ids.is_empty() {
            return Ok(lines);
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new(
            "SELECT si.sale_id, si.bottle_type_id, si.quantity, si.cost_rate, si.selling_rate,
                    bt.label AS bottle_label, bt.quantity_ltr AS bottle_quantity_ltr,
                    bt.bottles_in_batch AS bottle_bottles_in_batch
             FROM sale_item si
             LEFT JOIN bottle_type bt ON bt.id = si.bottle_type_id
             WHERE si.sale_id IN (",
        );
        let mut separated = query_builder.separated(", ");
        for id in sale_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY si.sale_id ASC, si.id ASC");

        let rows = query_builder.build().fetch_all(&self.pool).await?;
        for row in &rows {
            let sale_id: i64 = row.try_get("sale_id").map_err(decode_error)?;
            lines.entry(sale_id).or_default().push(row_to_line(row)?);
        }

        Ok(lines)
    }
}

fn row_to_line(row: &sqlx::sqlite::SqliteRow) -> Result<SaleLine, RepositoryError> {
    let bottle_type_id: Option<i64> = row.try_get("bottle_type_id").map_err(decode_error)?;
    let quantity = decimal_column(row, "quantity")?;
    let cost_rate = decimal_column(row, "cost_rate")?;
    let selling_rate = decimal_column(row, "selling_rate")?;

    let Some(bottle_type_id) = bottle_type_id else {
        return Ok(SaleLine::Bill(BillLine {
            quantity_kg: quantity,
            cost_per_kg: cost_rate,
            sell_per_kg: selling_rate,
        }));
    };

    let label: Option<String> = row.try_get("bottle_label").map_err(decode_error)?;
    let bottle = match label {
        Some(label) => Some(BottlePack {
            label,
            quantity_ltr: decimal_column(row, "bottle_quantity_ltr")?,
            bottles_in_batch: row.try_get("bottle_bottles_in_batch").map_err(decode_error)?,
        }),
        None => None,
    };
    let batches = quantity
        .trunc()
        .try_into()
        .map_err(|_| RepositoryError::Decode(format!("batch count `{quantity}` out of range")))?;

    Ok(SaleLine::Cash(CashLine {
        batches,
        bottle_type_id: BottleTypeId(bottle_type_id),
        bottle,
        cost_per_batch: cost_rate,
        sell_per_batch: selling_rate,
    }))
}

fn row_to_sale(row: &sqlx::sqlite::SqliteRow) -> Result<Sale, RepositoryError> {
    let date_str: String = row.try_get("sale_date").map_err(decode_error)?;
    let sale_type_str: String = row.try_get("sale_type").map_err(decode_error)?;

    Ok(Sale {
        id: SaleId(row.try_get("id").map_err(decode_error)?),
        date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(decode_error)?,
        client_name: row.try_get("client_name").map_err(decode_error)?,
        freight: decimal_column(row, "freight")?,
        quantity: decimal_column(row, "quantity")?,
        sale_type: sale_type_str.parse::<SaleType>().map_err(decode_error)?,
        lines: Vec::new(),
    })
}

async fn insert_lines(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    sale_id: i64,
    lines: &[SaleLine],
) -> Result<(), RepositoryError> {
    for line in lines {
        sqlx::query(
            "INSERT INTO sale_item (sale_id, bottle_type_id, quantity, cost_rate, selling_rate)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(sale_id)
        .bind(line.bottle_type_id().map(|id| id.0))
        .bind(line.quantity().to_string())
        .bind(line.cost_rate().to_string())
        .bind(line.selling_rate().to_string())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl SaleRepository for SqlSaleRepository {
    async fn list(&self) -> Result<Vec<Sale>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, sale_date, client_name, freight, quantity, sale_type
             FROM sale ORDER BY sale_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut sales = rows.iter().map(row_to_sale).collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<i64> = sales.iter().map(|sale| sale.id.0).collect();
        let mut lines = self.load_lines(&ids).await?;
        for sale in &mut sales {
            sale.lines = lines.remove(&sale.id.0).unwrap_or_default();
        }

        Ok(sales)
    }

    async fn find_by_id(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, sale_date, client_name, freight, quantity, sale_type
             FROM sale WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut sale = row_to_sale(&row)?;
        sale.lines = self.load_lines(&[id.0]).await?.remove(&id.0).unwrap_or_default();
        Ok(Some(sale))
    }

    async fn create(&self, draft: SaleDraft) -> Result<Sale, RepositoryError> {
        let quantity = draft.total_quantity();
        let mut tx = self.pool.begin().await?;

        let done = sqlx::query(
            "INSERT INTO sale (sale_date, client_name, freight, quantity, sale_type, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(draft.date.format(DATE_FORMAT).to_string())
        .bind(&draft.client_name)
        .bind(draft.freight.to_string())
        .bind(quantity.to_string())
        .bind(draft.sale_type.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        let sale_id = done.last_insert_rowid();

        insert_lines(&mut tx, sale_id, &draft.lines).await?;
        tx.commit().await?;

        self.find_by_id(SaleId(sale_id))
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("sale {sale_id} not found")))
    }

    async fn replace(&self, id: SaleId, draft: SaleDraft) -> Result<Sale, RepositoryError> {
        let quantity = draft.total_quantity();
        let mut tx = self.pool.begin().await?;

        let done = sqlx::query(
            "UPDATE sale
             SET sale_date = ?, client_name = ?, freight = ?, quantity = ?, sale_type = ?
             WHERE id = ?",
        )
        .bind(draft.date.format(DATE_FORMAT).to_string())
        .bind(&draft.client_name)
        .bind(draft.freight.to_string())
        .bind(quantity.to_string())
        .bind(draft.sale_type.as_str())
        .bind(id.0)
        .execute(&mut *tx)
        .await?;
        if done.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("sale {} not found", id.0)));
        }

        sqlx::query("DELETE FROM sale_item WHERE sale_id = ?").bind(id.0).execute(&mut *tx).await?;
        insert_lines(&mut tx, id.0, &draft.lines).await?;
        tx.commit().await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("sale {} not found", id.0)))
    }

    async fn delete(&self, id: SaleId) -> Result<(), RepositoryError> {
        let done = sqlx::query("DELETE FROM sale WHERE id = ?").bind(id.0).execute(&self.pool).await?;
        if done.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("sale {} not found", id.0)));
        }
        Ok(())
    }
}
