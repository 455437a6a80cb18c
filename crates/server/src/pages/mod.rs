//! Server-rendered HTML pages. Every handler here sits behind `require_session`.

pub mod bottles;
pub mod clients;
pub mod dashboard;
pub mod directory;
pub mod reports;
pub mod sales;

use axum::response::{Html, Redirect};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tera::Context;

use crate::app::AppState;
use crate::auth::{CurrentSession, Flash};
use crate::error::PageError;

/// `?q=` search box shared by the list pages.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

impl SearchQuery {
    pub fn term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|term| !term.is_empty())
    }
}

/// Base context every page template extends from: pending flashes and the logged-in user.
pub async fn page_context(state: &AppState, session: &CurrentSession) -> Context {
    let mut context = Context::new();
    context.insert("flashes", &state.sessions.take_flashes(&session.id).await);
    context.insert("logged_in", &true);
    context.insert("username", &session.username);
    context
}

pub fn render(state: &AppState, template: &str, context: &Context) -> Result<Html<String>, PageError> {
    Ok(Html(state.templates.render(template, context)?))
}

/// Queues a flash for the next page and answers `303 See Other`.
pub async fn redirect_with(
    state: &AppState,
    session: &CurrentSession,
    flash: Flash,
    to: &str,
) -> Redirect {
    state.sessions.push_flash(&session.id, flash).await;
    Redirect::to(to)
}

/// Calendar date at the configured export offset.
pub fn local_today(state: &AppState) -> NaiveDate {
    Utc::now().with_timezone(&state.export.offset()).date_naive()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use salesbook_core::config::AppConfig;
    use salesbook_db::{connect_with_settings, migrations};
    use tera::Tera;

    use crate::app::AppState;
    use crate::auth::CurrentSession;
    use crate::templates::register_template_filters;

    /// State over a migrated in-memory ledger, with the given raw templates.
    pub async fn state_with(templates: &[(&str, &str)]) -> AppState {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");

        let mut tera = Tera::default();
        tera.add_raw_templates(templates.to_vec()).expect("templates parse");
        register_template_filters(&mut tera);

        AppState::with_templates(&AppConfig::default(), pool, Arc::new(tera))
    }

    pub async fn session(state: &AppState) -> CurrentSession {
        let id = state.sessions.create("admin").await;
        state.sessions.lookup(&id).await.expect("fresh session")
    }

    pub fn location_of(response: &axum::response::Response) -> String {
        response
            .headers()
            .get(axum::http::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}
