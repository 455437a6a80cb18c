use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Response},
    Extension,
};
use chrono::{DateTime, FixedOffset, Utc};
use salesbook_core::reporting::{self, ExportRow, EXPORT_HEADER};
use salesbook_db::repositories::SaleRepository;
use tracing::info;

use crate::app::AppState;
use crate::auth::CurrentSession;
use crate::error::PageError;
use crate::pages::{page_context, render};

pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Html<String>, PageError> {
    let sales = state.sales().list().await?;
    let report = reporting::client_report(&sales);

    let mut context = page_context(&state, &session).await;
    context.insert("report", &report);
    render(&state, "reports.html", &context)
}

pub fn export_filename(prefix: &str, now: DateTime<FixedOffset>) -> String {
    format!("{prefix}_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

pub fn write_csv(rows: &[ExportRow]) -> Result<Vec<u8>, PageError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(EXPORT_HEADER)
        .map_err(|error| PageError::internal(format!("csv export failed: {error}")))?;
    for row in rows {
        writer
            .write_record(row.to_record())
            .map_err(|error| PageError::internal(format!("csv export failed: {error}")))?;
    }
    writer.into_inner().map_err(|error| PageError::internal(format!("csv export failed: {error}")))
}

pub async fn export_csv(State(state): State<AppState>) -> Result<Response, PageError> {
    let sales = state.sales().list().await?;
    let rows = reporting::export_rows(&sales);
    let body = write_csv(&rows)?;

    let now = Utc::now().with_timezone(&state.export.offset());
    let filename = export_filename(&state.export.filename_prefix, now);
    info!(event_name = "reports.export.generated", rows = rows.len(), %filename, "csv export generated");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response())
}
