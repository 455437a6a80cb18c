use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Form,
};
use salesbook_core::domain::client::{ClientDraft, ClientForm};
use salesbook_core::{ClientId, DomainError};
use salesbook_db::repositories::{ClientRepository, RepositoryError};
use tracing::info;

use crate::app::AppState;
use crate::auth::{CurrentSession, Flash};
use crate::error::PageError;
use crate::pages::{page_context, redirect_with, render, SearchQuery};

pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, PageError> {
    let clients = state.clients().list(query.term()).await?;

    let mut context = page_context(&state, &session).await;
    context.insert("clients", &clients);
    context.insert("q", &query.term().unwrap_or_default());
    Ok(render(&state, "clients.html", &context)?.into_response())
}

async fn render_form(
    state: &AppState,
    session: &CurrentSession,
    action: &str,
    form: &ClientForm,
    error: Option<String>,
) -> Result<Response, PageError> {
    let mut context = page_context(state, session).await;
    context.insert("action", action);
    context.insert("name", &form.name);
    context.insert("address", &form.address);
    context.insert("tax_id", &form.tax_id);
    context.insert("error", &error);

    let status = if error.is_some() { StatusCode::BAD_REQUEST } else { StatusCode::OK };
    Ok((status, render(state, "client_form.html", &context)?).into_response())
}

/// Validation and uniqueness failures go back to the form instead of an error page.
fn form_error(error: RepositoryError) -> Result<String, PageError> {
    match error {
        RepositoryError::Conflict(message) => Ok(message),
        other => Err(other.into()),
    }
}

pub async fn new_form(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Response, PageError> {
    render_form(&state, &session, "/clients/new", &ClientForm::default(), None).await
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Form(form): Form<ClientForm>,
) -> Result<Response, PageError> {
    let draft = match ClientDraft::from_form(&form) {
        Ok(draft) => draft,
        Err(DomainError::Validation(message) | DomainError::Conflict(message)) => {
            return render_form(&state, &session, "/clients/new", &form, Some(message)).await;
        }
    };

    match state.clients().create(draft).await {
        Ok(client) => {
            info!(event_name = "clients.saved", client_id = client.id.0, "client created");
            Ok(redirect_with(&state, &session, Flash::success("Client saved"), "/clients")
                .await
                .into_response())
        }
        Err(error) => {
            let message = form_error(error)?;
            render_form(&state, &session, "/clients/new", &form, Some(message)).await
        }
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let client = state
        .clients()
        .find_by_id(ClientId(id))
        .await?
        .ok_or_else(|| PageError::not_found(format!("client {id} not found")))?;

    let form = ClientForm {
        name: client.name,
        address: client.address.unwrap_or_default(),
        tax_id: client.tax_id.unwrap_or_default(),
    };
    render_form(&state, &session, &format!("/clients/{id}/edit"), &form, None).await
}

pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i64>,
    Form(form): Form<ClientForm>,
) -> Result<Response, PageError> {
    let action = format!("/clients/{id}/edit");
    let draft = match ClientDraft::from_form(&form) {
        Ok(draft) => draft,
        Err(DomainError::Validation(message) | DomainError::Conflict(message)) => {
            return render_form(&state, &session, &action, &form, Some(message)).await;
        }
    };

    match state.clients().update(ClientId(id), draft).await {
        Ok(_) => {
            info!(event_name = "clients.saved", client_id = id, "client updated");
            Ok(redirect_with(&state, &session, Flash::success("Client saved"), "/clients")
                .await
                .into_response())
        }
        Err(error) => {
            let message = form_error(error)?;
            render_form(&state, &session, &action, &form, Some(message)).await
        }
    }
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    state.clients().delete(ClientId(id)).await?;
    info!(event_name = "clients.deleted", client_id = id, "client deleted");
    Ok(redirect_with(&state, &session, Flash::info("Client deleted"), "/clients")
        .await
        .into_response())
}
