pub mod auth;
pub mod extract;
pub mod middleware;
pub mod protocol;
pub mod quiz_task;
pub mod quiz_ws;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use quiz_ws::quiz_ws_handler;

use crate::error::ApiError;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use rest::ApiDoc;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Upper bound on request bodies; ingested text arrives as JSON.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Builds the complete application router: auth routes, cookie-protected API
/// routes, the quiz WebSocket and the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = HeaderValue::from_str(&app_state.config.allowed_origin).map_err(|e| {
        ApiError::Internal(format!(
            "Invalid ALLOWED_ORIGIN '{}': {}",
            app_state.config.allowed_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/ingest", post(rest::ingest_handler))
        .route("/summarize", post(rest::summarize_handler))
        .route("/eli5", post(rest::eli5_handler))
        .route("/generate-questions", post(rest::generate_questions_handler))
        .route("/packs/{pack_id}", get(rest::get_pack_handler))
        .route("/packs/{pack_id}/quizzes", post(rest::start_quiz_handler))
        .route("/quizzes/ws", get(quiz_ws_handler))
        .route("/quizzes/{quiz_id}/results", get(rest::results_handler))
        .route("/profile", get(rest::profile_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(app_state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
