//! HTTP mappings for the application error taxonomy.
//!
//! JSON routes answer `{"error": <message>}`; HTML routes render a small error page.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use salesbook_core::errors::{ApplicationError, DomainError, InterfaceError};
use salesbook_db::repositories::RepositoryError;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

fn status_of(error: &InterfaceError) -> StatusCode {
    StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn log_internal(error: &InterfaceError) {
    if let InterfaceError::Internal { message, correlation_id } = error {
        error!(
            event_name = "http.request.failed",
            correlation_id = %correlation_id,
            error = %message,
            "request failed with an internal error"
        );
    }
}

/// Error returned by `/api/*` handlers.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApplicationError::NotFound(message.into()).into()
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApplicationError::from(DomainError::validation(message)).into()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(value: ApplicationError) -> Self {
        Self(value.into_interface("api"))
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        ApplicationError::from(value).into()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::from(value).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log_internal(&self.0);
        let body = ErrorBody { error: self.0.message().to_string() };
        (status_of(&self.0), Json(body)).into_response()
    }
}

/// Error returned by HTML page handlers.
#[derive(Debug)]
pub struct PageError(pub InterfaceError);

impl PageError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApplicationError::NotFound(message.into()).into()
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApplicationError::Persistence(message.into()).into()
    }
}

impl From<ApplicationError> for PageError {
    fn from(value: ApplicationError) -> Self {
        Self(value.into_interface("page"))
    }
}

impl From<RepositoryError> for PageError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::from(value).into()
    }
}

impl From<tera::Error> for PageError {
    fn from(value: tera::Error) -> Self {
        Self::internal(format!("template error: {value:?}"))
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        log_internal(&self.0);
        let status = status_of(&self.0);
        let html = format!(
            "<!doctype html><html><body><h1>{}</h1><p>{}</p><p><a href=\"/\">Back to dashboard</a></p></body></html>",
            status.canonical_reason().unwrap_or("Error"),
            tera::escape_html(self.0.message()),
        );
        (status, Html(html)).into_response()
    }
}
