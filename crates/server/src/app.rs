use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use salesbook_core::config::{AppConfig, AuthConfig, ExportConfig};
use salesbook_db::repositories::{
    SqlBottleTypeRepository, SqlClientRepository, SqlLeadRepository, SqlLocationRepository,
    SqlSaleRepository,
};
use salesbook_db::DbPool;
use tera::Tera;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::auth::{self, SessionStore};
use crate::{api, health, pages, templates};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub templates: Arc<Tera>,
    pub sessions: SessionStore,
    pub auth: Arc<AuthConfig>,
    pub export: Arc<ExportConfig>,
}

impl AppState {
    pub fn new(config: &AppConfig, db_pool: DbPool) -> Self {
        Self::with_templates(config, db_pool, templates::init_templates())
    }

    pub fn with_templates(config: &AppConfig, db_pool: DbPool, templates: Arc<Tera>) -> Self {
        Self {
            db_pool,
            templates,
            sessions: SessionStore::new(config.auth.session_days),
            auth: Arc::new(config.auth.clone()),
            export: Arc::new(config.export.clone()),
        }
    }

    pub fn clients(&self) -> SqlClientRepository {
        SqlClientRepository::new(self.db_pool.clone())
    }

    pub fn bottles(&self) -> SqlBottleTypeRepository {
        SqlBottleTypeRepository::new(self.db_pool.clone())
    }

    pub fn sales(&self) -> SqlSaleRepository {
        SqlSaleRepository::new(self.db_pool.clone())
    }

    pub fn locations(&self) -> SqlLocationRepository {
        SqlLocationRepository::new(self.db_pool.clone())
    }

    pub fn leads(&self) -> SqlLeadRepository {
        SqlLeadRepository::new(self.db_pool.clone())
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(pages::dashboard::index))
        .route("/clients", get(pages::clients::list))
        .route("/clients/new", get(pages::clients::new_form).post(pages::clients::create))
        .route("/clients/{id}/edit", get(pages::clients::edit_form).post(pages::clients::update))
        .route("/clients/{id}/delete", post(pages::clients::delete))
        .route("/sales", get(pages::sales::list))
        .route("/sales/new", get(pages::sales::new_form).post(pages::sales::create))
        .route("/sales/{id}/edit", get(pages::sales::edit_form).post(pages::sales::update))
        .route("/sales/{id}/delete", post(pages::sales::delete))
        .route("/bottles", get(pages::bottles::list))
        .route("/bottles/new", get(pages::bottles::new_form).post(pages::bottles::create))
        .route("/bottles/{id}/edit", get(pages::bottles::edit_form).post(pages::bottles::update))
        .route("/bottles/{id}/delete", post(pages::bottles::delete))
        .route("/reports", get(pages::reports::index))
        .route("/export.csv", get(pages::reports::export_csv))
        .route("/leads", get(pages::directory::leads_page))
        .route("/locations", get(pages::directory::locations_page))
        .route("/api/leads", get(api::list_leads).post(api::create_lead))
        .route(
            "/api/leads/{id}",
            get(api::get_lead).put(api::update_lead).patch(api::update_lead).delete(api::delete_lead),
        )
        .route("/api/locations", get(api::list_locations).post(api::create_location))
        .route(
            "/api/locations/{id}",
            get(api::get_location)
                .put(api::rename_location)
                .patch(api::rename_location)
                .delete(api::delete_location),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_session));

    let public = Router::new()
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route("/logout", get(auth::logout).post(auth::logout));

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state.clone())
        .merge(health::router(state.db_pool.clone()))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use salesbook_core::config::AppConfig;
    use salesbook_db::{connect_with_settings, migrations};
    use tera::Tera;
    use tower::ServiceExt;

    use super::{router, AppState};

    async fn test_router() -> Router {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");

        let mut config = AppConfig::default();
        config.auth.password = Some("secret".to_string().into());
        router(AppState::with_templates(&config, pool, Arc::new(Tera::default())))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn header_text(response: &axum::response::Response, name: header::HeaderName) -> String {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    async fn login(app: &Router, password: &str) -> axum::response::Response {
        let request = Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username=admin&password={password}&next=%2Fleads")))
            .expect("request");
        app.clone().oneshot(request).await.expect("login response")
    }

    #[tokio::test]
    async fn api_routes_answer_401_without_a_session() {
        let app = test_router().await;

        let response = app.oneshot(get("/api/leads")).await.expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(body.as_ref(), br#"{"error":"authentication required"}"#);
    }

    #[tokio::test]
    async fn pages_redirect_to_login_with_the_original_target() {
        let app = test_router().await;

        let response = app.oneshot(get("/sales?q=acme")).await.expect("response");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(header_text(&response, header::LOCATION), "/login?next=%2Fsales%3Fq%3Dacme");
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = test_router().await;
        let response = app.oneshot(get("/health")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_issues_a_session_cookie_that_unlocks_the_api() {
        let app = test_router().await;

        let response = login(&app, "secret").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(header_text(&response, header::LOCATION), "/leads");

        let set_cookie = header_text(&response, header::SET_COOKIE);
        assert!(set_cookie.starts_with("salesbook_session="));
        assert!(!set_cookie.contains("Max-Age"));
        let cookie = set_cookie.split(';').next().unwrap_or_default().to_string();

        let request = Request::builder()
            .uri("/api/locations")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(body.as_ref(), b"[]");
    }

    #[tokio::test]
    async fn wrong_password_sets_no_cookie() {
        let mut tera = Tera::default();
        tera.add_raw_template("login.html", "{{ error }}").expect("template");

        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("pool");
        let mut config = AppConfig::default();
        config.auth.password = Some("secret".to_string().into());
        let with_login_page = router(AppState::with_templates(&config, pool, Arc::new(tera)));

        let response = login(&with_login_page, "guess").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(body.as_ref(), b"Invalid credentials");
    }
}
