use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Form,
};
use rust_decimal::Decimal;
use salesbook_core::domain::bottle::{BottleType, BottleTypeDraft, BottleTypeForm};
use salesbook_core::{BottleTypeId, DomainError};
use salesbook_db::repositories::{BottleTypeRepository, RepositoryError};
use serde::Serialize;
use tracing::{info, warn};

use crate::app::AppState;
use crate::auth::{CurrentSession, Flash};
use crate::error::PageError;
use crate::pages::{page_context, redirect_with, render, SearchQuery};

/// Catalog row with the derived per-batch figures.
#[derive(Debug, Serialize)]
struct BottleRow {
    #[serde(flatten)]
    bottle: BottleType,
    cp_per_batch: Decimal,
    sp_per_batch: Decimal,
    kg_per_batch: Decimal,
}

impl From<BottleType> for BottleRow {
    fn from(bottle: BottleType) -> Self {
        Self {
            cp_per_batch: bottle.cp_per_batch(),
            sp_per_batch: bottle.sp_per_batch(),
            kg_per_batch: bottle.kg_per_batch(),
            bottle,
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, PageError> {
    let rows: Vec<BottleRow> =
        state.bottles().list(query.term()).await?.into_iter().map(BottleRow::from).collect();

    let mut context = page_context(&state, &session).await;
    context.insert("bottles", &rows);
    context.insert("q", &query.term().unwrap_or_default());
    Ok(render(&state, "bottles.html", &context)?.into_response())
}

fn form_of(bottle: &BottleType) -> BottleTypeForm {
    BottleTypeForm {
        label: bottle.label.clone(),
        quantity_ltr: bottle.quantity_ltr.normalize().to_string(),
        bottles_in_batch: bottle.bottles_in_batch.to_string(),
        can_price: bottle.can_price.normalize().to_string(),
        price_per_kg: bottle.price_per_kg.normalize().to_string(),
        box_cost: bottle.box_cost.normalize().to_string(),
        selling_price_per_batch: bottle.selling_price_per_batch.normalize().to_string(),
    }
}

async fn render_form(
    state: &AppState,
    session: &CurrentSession,
    action: &str,
    form: &BottleTypeForm,
    error: Option<String>,
) -> Result<Response, PageError> {
    let mut context = page_context(state, session).await;
    context.insert("action", action);
    context.insert("label", &form.label);
    context.insert("quantity_ltr", &form.quantity_ltr);
    context.insert("bottles_in_batch", &form.bottles_in_batch);
    context.insert("can_price", &form.can_price);
    context.insert("price_per_kg", &form.price_per_kg);
    context.insert("box_cost", &form.box_cost);
    context.insert("selling_price_per_batch", &form.selling_price_per_batch);
    context.insert("error", &error);

    let status = if error.is_some() { StatusCode::BAD_REQUEST } else { StatusCode::OK };
    Ok((status, render(state, "bottle_form.html", &context)?).into_response())
}

async fn save(
    state: &AppState,
    session: &CurrentSession,
    id: Option<BottleTypeId>,
    form: BottleTypeForm,
) -> Result<Response, PageError> {
    let action = match id {
        Some(id) => format!("/bottles/{}/edit", id.0),
        None => "/bottles/new".to_string(),
    };

    let draft = match BottleTypeDraft::from_form(&form) {
        Ok(draft) => draft,
        Err(DomainError::Validation(message) | DomainError::Conflict(message)) => {
            return render_form(state, session, &action, &form, Some(message)).await;
        }
    };

    let saved = match id {
        Some(id) => state.bottles().update(id, draft).await,
        None => state.bottles().create(draft).await,
    };
    match saved {
        Ok(bottle) => {
            info!(event_name = "catalog.bottle.saved", bottle_type_id = bottle.id.0, "bottle type saved");
            Ok(redirect_with(state, session, Flash::success("Bottle type saved"), "/bottles")
                .await
                .into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            render_form(state, session, &action, &form, Some(message)).await
        }
        Err(error) => Err(error.into()),
    }
}

pub async fn new_form(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Response, PageError> {
    let form = BottleTypeForm { bottles_in_batch: "1".to_string(), ..BottleTypeForm::default() };
    render_form(&state, &session, "/bottles/new", &form, None).await
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Form(form): Form<BottleTypeForm>,
) -> Result<Response, PageError> {
    save(&state, &session, None, form).await
}

pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let bottle = state
        .bottles()
        .find_by_id(BottleTypeId(id))
        .await?
        .ok_or_else(|| PageError::not_found(format!("bottle type {id} not found")))?;
    render_form(&state, &session, &format!("/bottles/{id}/edit"), &form_of(&bottle), None).await
}

pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i64>,
    Form(form): Form<BottleTypeForm>,
) -> Result<Response, PageError> {
    save(&state, &session, Some(BottleTypeId(id)), form).await
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let flash = match state.bottles().delete(BottleTypeId(id)).await {
        Ok(()) => {
            info!(event_name = "catalog.bottle.deleted", bottle_type_id = id, "bottle type deleted");
            Flash::info("Deleted bottle type")
        }
        Err(RepositoryError::Conflict(message)) => {
            warn!(event_name = "catalog.bottle.delete_rejected", bottle_type_id = id, %message);
            Flash::danger(message)
        }
        Err(error) => return Err(error.into()),
    };
    Ok(redirect_with(&state, &session, flash, "/bottles").await.into_response())
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        Extension, Form,
    };
    use salesbook_core::domain::bottle::BottleTypeForm;
    use salesbook_core::submission::{build_sale_draft, SaleForm};
    use salesbook_db::repositories::{BottleTypeRepository, SaleRepository};

    use super::{create, delete, list};
    use crate::pages::test_support::{session, state_with};
    use crate::pages::SearchQuery;

    const TEMPLATES: &[(&str, &str)] = &[
        (
            "bottles.html",
            "{% for f in flashes %}<{{ f.level }}:{{ f.message }}>{% endfor %}\
             {% for b in bottles %}[{{ b.label }} cp={{ b.cp_per_batch | money }} sp={{ b.sp_per_batch | money }}]{% endfor %}",
        ),
        ("bottle_form.html", "{{ error }}|{{ label }}"),
    ];

    fn one_litre() -> BottleTypeForm {
        BottleTypeForm {
            label: "1 ltr".to_string(),
            quantity_ltr: "1".to_string(),
            bottles_in_batch: "12".to_string(),
            can_price: "4.25".to_string(),
            price_per_kg: "9".to_string(),
            box_cost: "21".to_string(),
            selling_price_per_batch: "170".to_string(),
        }
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf-8")
    }

    #[tokio::test]
    async fn list_shows_derived_batch_prices() {
        let state = state_with(TEMPLATES).await;
        let session = session(&state).await;
        create(State(state.clone()), Extension(session.clone()), Form(one_litre()))
            .await
            .expect("created");

        let page = list(State(state), Extension(session), Query(SearchQuery::default()))
            .await
            .expect("list");
        assert_eq!(
            body_text(page).await,
            "<success:Bottle type saved>[1 ltr cp=180.00 sp=170.00]"
        );
    }

    #[tokio::test]
    async fn duplicate_label_re_renders_the_form() {
        let state = state_with(TEMPLATES).await;
        let session = session(&state).await;
        create(State(state.clone()), Extension(session.clone()), Form(one_litre()))
            .await
            .expect("created");

        let response = create(State(state), Extension(session), Form(one_litre()))
            .await
            .expect("form rendered");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn referenced_bottle_is_kept_and_the_reason_flashed() {
        let state = state_with(TEMPLATES).await;
        let session = session(&state).await;
        create(State(state.clone()), Extension(session.clone()), Form(one_litre()))
            .await
            .expect("created");
        let catalog = state.bottles().list(None).await.expect("catalog");

        let form = SaleForm {
            date: "2024-04-09".to_string(),
            sale_type: "cash".to_string(),
            bottle_type_ids: vec![catalog[0].id.0.to_string()],
            batches: vec!["2".to_string()],
            ..SaleForm::default()
        };
        let draft = build_sale_draft(&form, Some("Walk-in".to_string()), &catalog).expect("draft");
        state.sales().create(draft).await.expect("sale");

        let response = delete(State(state.clone()), Extension(session.clone()), Path(catalog[0].id.0))
            .await
            .expect("redirect");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let page = list(State(state.clone()), Extension(session), Query(SearchQuery::default()))
            .await
            .expect("list");
        let body = body_text(page).await;
        assert!(body.starts_with("<success:Bottle type saved><danger:Bottle type is used by 1 sale item(s)"));
        assert_eq!(state.bottles().list(None).await.expect("catalog").len(), 1);
    }
}
