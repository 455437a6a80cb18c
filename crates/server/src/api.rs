//! JSON API for the lead/location directory.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::Form;
use salesbook_core::domain::lead::{Lead, LeadDraft, LeadPatch};
use salesbook_core::domain::location::{location_name, Location};
use salesbook_core::{LeadId, LocationId};
use salesbook_db::repositories::{LeadRepository, LocationRepository};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::pages::directory::LeadQuery;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LocationBody {
    pub id: i64,
    pub name: String,
}

impl From<Location> for LocationBody {
    fn from(location: Location) -> Self {
        Self { id: location.id.0, name: location.name }
    }
}

/// Request bodies are read leniently: an empty body counts as `{}`.
fn json_object(body: &Bytes) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::bad_request("request body must be a JSON object")),
        Err(error) => Err(ApiError::bad_request(format!("invalid JSON body: {error}"))),
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

/// Write payload for the directory endpoints: a JSON object, or url-encoded form fields
/// carried as JSON strings.
pub struct DirectoryPayload(pub Map<String, Value>);

impl<S> FromRequest<S> for DirectoryPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(req.headers()) {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|rejection| {
                    ApiError::bad_request(format!("invalid form body: {rejection}"))
                })?;
            let payload = fields.into_iter().map(|(key, value)| (key, Value::String(value))).collect();
            return Ok(Self(payload));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.to_string()))?;
        json_object(&body).map(Self)
    }
}

fn name_field(payload: &Map<String, Value>) -> Result<String, ApiError> {
    let raw = payload.get("name").and_then(Value::as_str).unwrap_or_default();
    Ok(location_name(raw)?)
}

pub async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadQuery>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    Ok(Json(state.leads().list(&query.filter()).await?))
}

pub async fn create_lead(
    State(state): State<AppState>,
    DirectoryPayload(payload): DirectoryPayload,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let draft = LeadDraft::from_json(&payload)?;
    let lead = state.leads().create(draft).await?;
    info!(event_name = "directory.lead.created", lead_id = lead.id.0, "lead created");
    Ok((StatusCode::CREATED, Json(lead)))
}

pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Lead>, ApiError> {
    state
        .leads()
        .find_by_id(LeadId(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("lead {id} not found")))
}

pub async fn update_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    DirectoryPayload(payload): DirectoryPayload,
) -> Result<Json<Lead>, ApiError> {
    let patch = LeadPatch::from_json(&payload)?;
    let lead = state.leads().update(LeadId(id), patch).await?;
    info!(event_name = "directory.lead.updated", lead_id = id, "lead updated");
    Ok(Json(lead))
}

pub async fn delete_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.leads().delete(LeadId(id)).await?;
    info!(event_name = "directory.lead.deleted", lead_id = id, "lead deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<LocationBody>>, ApiError> {
    let locations = state.locations().list().await?;
    Ok(Json(locations.into_iter().map(LocationBody::from).collect()))
}

pub async fn create_location(
    State(state): State<AppState>,
    DirectoryPayload(payload): DirectoryPayload,
) -> Result<(StatusCode, Json<LocationBody>), ApiError> {
    let name = name_field(&payload)?;
    let location = state.locations().create(&name).await?;
    info!(event_name = "directory.location.created", location_id = location.id.0, "location created");
    Ok((StatusCode::CREATED, Json(location.into())))
}

pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LocationBody>, ApiError> {
    state
        .locations()
        .find_by_id(LocationId(id))
        .await?
        .map(|location| Json(location.into()))
        .ok_or_else(|| ApiError::not_found(format!("location {id} not found")))
}

pub async fn rename_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    DirectoryPayload(payload): DirectoryPayload,
) -> Result<Json<LocationBody>, ApiError> {
    let name = name_field(&payload)?;
    let location = state.locations().rename(LocationId(id), &name).await?;
    info!(event_name = "directory.location.renamed", location_id = id, "location renamed");
    Ok(Json(location.into()))
}

pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.locations().delete(LocationId(id)).await?;
    info!(event_name = "directory.location.deleted", location_id = id, "location and its leads deleted");
    Ok(StatusCode::NO_CONTENT)
}
