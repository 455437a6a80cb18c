use axum::{extract::State, response::Html, Extension};
use salesbook_core::reporting;
use salesbook_db::repositories::SaleRepository;

use crate::app::AppState;
use crate::auth::CurrentSession;
use crate::error::PageError;
use crate::pages::{local_today, page_context, render};

pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Html<String>, PageError> {
    let sales = state.sales().list().await?;
    let today = local_today(&state);
    let dashboard = reporting::dashboard(&sales, today);

    let mut context = page_context(&state, &session).await;
    context.insert("dashboard", &dashboard);
    context.insert("today", &today.format("%d %b %Y").to_string());
    render(&state, "index.html", &context)
}
