//! Single shared login backed by an in-process session store.
//!
//! Sessions are keyed by a random v4 UUID carried in the `salesbook_session` cookie and
//! expire after `auth.session_days`. The cookie only gets a `Max-Age` when "remember me"
//! is ticked; otherwise it lives for the browser session.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tera::Context;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{ErrorBody, PageError};

pub const SESSION_COOKIE: &str = "salesbook_session";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: &'static str,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: "success", message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { level: "info", message: message.into() }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self { level: "danger", message: message.into() }
    }
}

#[derive(Clone, Debug)]
struct Session {
    username: String,
    expires_at: DateTime<Utc>,
    flashes: Vec<Flash>,
}

/// Identity of the logged-in request, inserted by [`require_session`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentSession {
    pub id: String,
    pub username: String,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(session_days: u32) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::days(i64::from(session_days)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a session and drops every session that has already expired.
    pub async fn create(&self, username: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let session =
            Session { username: username.to_string(), expires_at: now + self.ttl, flashes: Vec::new() };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, existing| existing.expires_at > now);
        sessions.insert(id.clone(), session);
        id
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns the live session for `id`, dropping it if it has expired.
    pub async fn lookup(&self, id: &str) -> Option<CurrentSession> {
        let mut sessions = self.sessions.write().await;
        let expired = match sessions.get(id) {
            Some(session) if session.expires_at > Utc::now() => {
                return Some(CurrentSession { id: id.to_string(), username: session.username.clone() });
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(id);
        }
        None
    }

    pub async fn destroy(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    pub async fn push_flash(&self, id: &str, flash: Flash) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.flashes.push(flash);
        }
    }

    pub async fn take_flashes(&self, id: &str) -> Vec<Flash> {
        self.sessions
            .write()
            .await
            .get_mut(id)
            .map(|session| std::mem::take(&mut session.flashes))
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub async fn expire_now(&self, id: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.expires_at = Utc::now() - Duration::seconds(1);
        }
    }
}

fn session_cookie(id: &str, max_age: Option<Duration>) -> Cookie<'static> {
    let mut raw = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(max_age) = max_age {
        raw.push_str(&format!("; Max-Age={}", max_age.num_seconds()));
    }
    Cookie::parse(raw).unwrap_or_else(|_| Cookie::new(SESSION_COOKIE, id.to_string()))
}

/// Only local absolute paths are honoured as a post-login target.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}

fn login_target(uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map(|value| value.as_str()).unwrap_or("/");
    format!("/login?next={}", urlencoding::encode(path_and_query))
}

pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match jar.get(SESSION_COOKIE) {
        Some(cookie) => state.sessions.lookup(cookie.value()).await,
        None => None,
    };

    match session {
        Some(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None if request.uri().path().starts_with("/api/") => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody { error: "authentication required".to_string() }),
        )
            .into_response(),
        None => Redirect::to(&login_target(request.uri())).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub remember: Option<String>,
    pub next: Option<String>,
}

fn render_login(
    state: &AppState,
    next: &str,
    error: Option<&str>,
) -> Result<Html<String>, PageError> {
    let mut context = Context::new();
    context.insert("next", next);
    context.insert("error", &error);
    context.insert("flashes", &Vec::<Flash>::new());
    context.insert("logged_in", &false);
    Ok(Html(state.templates.render("login.html", &context)?))
}

pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Html<String>, PageError> {
    render_login(&state, &safe_next(query.next.as_deref()), None)
}

pub async fn login_submit(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    let next = safe_next(form.next.as_deref().or(query.next.as_deref()));

    if !state.auth.credentials_match(&form.username, &form.password) {
        warn!(event_name = "auth.login.rejected", username = %form.username.trim(), "invalid credentials");
        let page = render_login(&state, &next, Some("Invalid credentials"))?;
        return Ok((StatusCode::UNAUTHORIZED, page).into_response());
    }

    let session_id = state.sessions.create(form.username.trim()).await;
    let remember = form.remember.as_deref() == Some("on");
    let max_age = remember.then(|| state.sessions.ttl());
    info!(event_name = "auth.login.accepted", remember, "session created");

    Ok((jar.add(session_cookie(&session_id, max_age)), Redirect::to(&next)).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/login")).into_response()
}
