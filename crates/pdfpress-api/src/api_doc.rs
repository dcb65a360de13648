//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::setup::routes::health;
use pdfpress_core::models;

/// Returns the OpenAPI document served at `/api/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pdfpress API",
        version = "0.1.0",
        description = "PDF compression service. Upload a PDF to /compress and receive a Ghostscript-compressed copy; temporary files are removed after every request."
    ),
    paths(
        handlers::compress::compress_pdf,
        handlers::auth::login,
        handlers::auth::logout,
        health::health_check,
        health::readiness_check,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::auth::LoginRequest,
        handlers::auth::AuthStatusResponse,
        health::HealthResponse,
        health::ReadinessResponse,
        models::ResolutionPreset,
        models::QualityPreset,
        models::CompressionSettings,
    )),
    tags(
        (name = "compression", description = "PDF compression"),
        (name = "authentication", description = "Shared-password session gate"),
        (name = "health", description = "Liveness and readiness probes"),
    )
)]
pub struct ApiDoc;
