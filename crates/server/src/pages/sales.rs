use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use axum_extra::extract::Form;
use salesbook_core::domain::sale::{Sale, SaleLine, SaleType};
use salesbook_core::reporting::SaleSummary;
use salesbook_core::submission::{build_sale_draft, resolve_client_name, SaleForm, DATE_FORMAT};
use salesbook_core::{ClientId, DomainError, SaleDraft, SaleId};
use salesbook_db::repositories::{BottleTypeRepository, ClientRepository, SaleRepository};
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::auth::{CurrentSession, Flash};
use crate::error::PageError;
use crate::pages::{local_today, page_context, redirect_with, render, SearchQuery};

#[derive(Debug, Default, Serialize)]
struct BillRow {
    quantity: String,
    unit: String,
    cost_rate: String,
    sell_rate: String,
}

#[derive(Debug, Default, Serialize)]
struct CashRow {
    bottle_type_id: String,
    batches: String,
    sp_batch: String,
}

/// Values echoed back into `sale_form.html`, either from a stored sale or a rejected submission.
#[derive(Debug, Default, Serialize)]
struct SaleFormView {
    date: String,
    sale_type: &'static str,
    client_id: String,
    client_name: String,
    freight: String,
    bill_lines: Vec<BillRow>,
    cash_lines: Vec<CashRow>,
}

impl SaleFormView {
    fn blank(date: String) -> Self {
        Self {
            date,
            sale_type: SaleType::Bill.as_str(),
            bill_lines: vec![BillRow { unit: "kg".to_string(), ..BillRow::default() }],
            cash_lines: vec![CashRow::default()],
            ..Self::default()
        }
    }

    fn from_sale(sale: &Sale) -> Self {
        let mut view = Self {
            date: sale.date.format(DATE_FORMAT).to_string(),
            sale_type: sale.sale_type.as_str(),
            client_name: sale.client_name.clone(),
            freight: sale.freight.normalize().to_string(),
            ..Self::default()
        };
        for line in &sale.lines {
            match line {
                SaleLine::Bill(bill) => view.bill_lines.push(BillRow {
                    quantity: bill.quantity_kg.normalize().to_string(),
                    unit: "kg".to_string(),
                    cost_rate: bill.cost_per_kg.normalize().to_string(),
                    sell_rate: bill.sell_per_kg.normalize().to_string(),
                }),
                SaleLine::Cash(cash) => view.cash_lines.push(CashRow {
                    bottle_type_id: cash.bottle_type_id.0.to_string(),
                    batches: cash.batches.to_string(),
                    sp_batch: cash.sell_per_batch.normalize().to_string(),
                }),
            }
        }
        if view.bill_lines.is_empty() {
            view.bill_lines.push(BillRow { unit: "kg".to_string(), ..BillRow::default() });
        }
        if view.cash_lines.is_empty() {
            view.cash_lines.push(CashRow::default());
        }
        view
    }

    fn from_form(form: &SaleForm) -> Self {
        let field = |values: &[String], index: usize| values.get(index).cloned().unwrap_or_default();
        let mut view = Self {
            date: form.date.clone(),
            sale_type: SaleType::from_form(&form.sale_type).as_str(),
            client_id: form.client_id.clone(),
            client_name: form.client_name.clone(),
            freight: form.freight.clone(),
            bill_lines: form
                .quantities
                .iter()
                .enumerate()
                .map(|(index, quantity)| BillRow {
                    quantity: quantity.clone(),
                    unit: field(&form.units, index),
                    cost_rate: field(&form.cost_rates, index),
                    sell_rate: field(&form.sell_rates, index),
                })
                .collect(),
            cash_lines: form
                .bottle_type_ids
                .iter()
                .enumerate()
                .map(|(index, bottle_type_id)| CashRow {
                    bottle_type_id: bottle_type_id.clone(),
                    batches: field(&form.batches, index),
                    sp_batch: field(&form.sp_overrides, index),
                })
                .collect(),
        };
        if view.bill_lines.is_empty() {
            view.bill_lines.push(BillRow { unit: "kg".to_string(), ..BillRow::default() });
        }
        if view.cash_lines.is_empty() {
            view.cash_lines.push(CashRow::default());
        }
        view
    }
}

pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, PageError> {
    let needle = query.term().map(str::to_lowercase);
    let sales: Vec<SaleSummary> = state
        .sales()
        .list()
        .await?
        .iter()
        .filter(|sale| match &needle {
            Some(needle) => sale.client_name.to_lowercase().contains(needle),
            None => true,
        })
        .map(SaleSummary::of)
        .collect();

    let mut context = page_context(&state, &session).await;
    context.insert("sales", &sales);
    context.insert("q", &query.term().unwrap_or_default());
    Ok(render(&state, "sales.html", &context)?.into_response())
}

async fn render_form(
    state: &AppState,
    session: &CurrentSession,
    action: &str,
    view: &SaleFormView,
    error: Option<String>,
) -> Result<Response, PageError> {
    let clients = state.clients().list(None).await?;
    let bottles = state.bottles().list(None).await?;

    let mut context = page_context(state, session).await;
    context.insert("action", action);
    context.insert("sale", view);
    context.insert("clients", &clients);
    context.insert("bottles", &bottles);
    context.insert("error", &error);

    let status = if error.is_some() { StatusCode::BAD_REQUEST } else { StatusCode::OK };
    Ok((status, render(state, "sale_form.html", &context)?).into_response())
}

/// Applies client resolution and the line builder to a submitted form.
async fn draft_from_submission(
    state: &AppState,
    form: &SaleForm,
) -> Result<Result<SaleDraft, String>, PageError> {
    let selected = match form.selected_client_id() {
        Some(id) => state.clients().find_by_id(ClientId(id)).await?,
        None => None,
    };
    let client_name = resolve_client_name(selected.as_ref(), &form.client_name);
    let catalog = state.bottles().list(None).await?;

    Ok(build_sale_draft(form, client_name, &catalog).map_err(|error| match error {
        DomainError::Validation(message) | DomainError::Conflict(message) => message,
    }))
}

async fn saved(state: &AppState, session: &CurrentSession, sale: &Sale) -> Response {
    info!(
        event_name = "sales.saved",
        sale_id = sale.id.0,
        sale_type = sale.sale_type.as_str(),
        lines = sale.lines.len(),
        "sale saved"
    );
    redirect_with(state, session, Flash::success("Saved successfully"), "/sales").await.into_response()
}

pub async fn new_form(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Response, PageError> {
    let view = SaleFormView::blank(local_today(&state).format(DATE_FORMAT).to_string());
    render_form(&state, &session, "/sales/new", &view, None).await
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Form(form): Form<SaleForm>,
) -> Result<Response, PageError> {
    let draft = match draft_from_submission(&state, &form).await? {
        Ok(draft) => draft,
        Err(message) => {
            let view = SaleFormView::from_form(&form);
            return render_form(&state, &session, "/sales/new", &view, Some(message)).await;
        }
    };

    let sale = state.sales().create(draft).await?;
    Ok(saved(&state, &session, &sale).await)
}

async fn load_sale(state: &AppState, id: i64) -> Result<Sale, PageError> {
    state
        .sales()
        .find_by_id(SaleId(id))
        .await?
        .ok_or_else(|| PageError::not_found(format!("sale {id} not found")))
}

pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let sale = load_sale(&state, id).await?;
    let view = SaleFormView::from_sale(&sale);
    render_form(&state, &session, &format!("/sales/{id}/edit"), &view, None).await
}

pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i64>,
    Form(form): Form<SaleForm>,
) -> Result<Response, PageError> {
    load_sale(&state, id).await?;

    let draft = match draft_from_submission(&state, &form).await? {
        Ok(draft) => draft,
        Err(message) => {
            let view = SaleFormView::from_form(&form);
            let action = format!("/sales/{id}/edit");
            return render_form(&state, &session, &action, &view, Some(message)).await;
        }
    };

    let sale = state.sales().replace(SaleId(id), draft).await?;
    Ok(saved(&state, &session, &sale).await)
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    state.sales().delete(SaleId(id)).await?;
    info!(event_name = "sales.deleted", sale_id = id, "sale deleted");
    Ok(redirect_with(&state, &session, Flash::info("Deleted"), "/sales").await.into_response())
}
