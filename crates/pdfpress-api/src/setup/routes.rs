//! Route configuration and setup

pub mod health;

use crate::auth::session_auth_middleware;
use crate::constants::MULTIPART_OVERHEAD_BYTES;
use crate::error::HttpAppError;
use crate::handlers;
use crate::middleware::{
    error_details_middleware, request_id_middleware,
    security_headers::{security_headers_middleware, SecurityHeadersConfig},
};
use crate::state::AppState;
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pdfpress_core::{AppError, Config};
use std::any::Any;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as CorsAny, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    // Protected routes run behind the session gate (a pass-through when auth is disabled)
    let protected_routes = protected_routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        session_auth_middleware,
    ));

    let security_headers_config = Arc::new(SecurityHeadersConfig::new(config.is_production()));

    // Multipart reads stop at the upload ceiling; the body limit bounds the rest of the stream
    let body_limit = config
        .max_upload_size_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let http_concurrency_limit = config.http_concurrency_limit();
    tracing::info!(
        http_concurrency_limit,
        body_limit_bytes = body_limit,
        auth_enabled = state.auth_enabled(),
        "Router configured"
    );

    let app = public_routes()
        .merge(protected_routes)
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn_with_state(
            !config.is_production(),
            error_details_middleware,
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn_with_state(
            security_headers_config,
            security_headers_middleware,
        ))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        return Ok(CorsLayer::new()
            .allow_origin(CorsAny)
            .allow_methods(methods)
            .allow_headers(CorsAny));
    }

    let origins = config
        .cors_origins()
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("CORS_ORIGINS contains an invalid origin")?;

    // Explicit origins may send the session cookie
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .allow_credentials(true))
}

/// Panics become the generic 500; the handler's temp files are removed during unwinding.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    HttpAppError(AppError::Internal(format!("Handler panicked: {}", detail))).into_response()
}

/// Public routes (no authentication required)
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

/// Protected routes (require a session when auth is enabled).
fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/compress", post(handlers::compress::compress_pdf))
}
