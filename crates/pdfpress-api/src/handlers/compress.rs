//! PDF compression handler

use crate::constants::{COMPRESSED_SIZE_HEADER, DOWNLOAD_FILENAME};
use crate::error::{ErrorResponse, HttpAppError};
use crate::middleware::RequestId;
use crate::state::AppState;
use crate::utils::upload::extract_compress_form;
use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, StatusCode},
    response::Response,
};
use pdfpress_core::{AppError, CompressionSettings};
use pdfpress_processing::{compress_to_memory, ValidationError};
use std::sync::Arc;
use std::time::Instant;

#[utoipa::path(
    post,
    path = "/compress",
    tag = "compression",
    request_body(
        content = inline(Object),
        content_type = "multipart/form-data",
        description = "`file`: the PDF; `dpi`: unchanged | print | ebook | screen; `quality`: very_high | high | medium"
    ),
    responses(
        (status = 200, description = "Compressed PDF; size in the X-Compressed-Size header", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Upload rejected", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 500, description = "Compression failed", body = ErrorResponse)
    )
)]
pub async fn compress_pdf(
    State(state): State<Arc<AppState>>,
    RequestId(request_id): RequestId,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HttpAppError> {
    let started = Instant::now();

    // A request that is not multipart carries no file at all
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Request is not a multipart upload");
        ValidationError::NoFile
    })?;

    let form = extract_compress_form(multipart, state.validator.max_size_bytes()).await?;
    state.validator.validate(form.upload.as_ref())?;
    let Some(upload) = form.upload else {
        return Err(ValidationError::NoFile.into());
    };

    let settings = CompressionSettings::from_form(form.dpi.as_deref(), form.quality.as_deref());
    let original_size = upload.size();

    // Both paths are removed when `pair` drops, on every exit from here on
    let pair = state.temp_store.new_pair();

    tokio::fs::write(pair.input_path(), &upload.data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to write upload to temp file: {}", e)))?;
    drop(upload);

    let compressed = match compress_to_memory(
        state.compressor.as_ref(),
        pair.input_path(),
        pair.output_path(),
        &settings,
    )
    .await
    {
        Ok(compressed) => compressed,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                compressor = state.compressor.name(),
                original_size,
                resolution = %settings.resolution,
                quality = %settings.quality,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "PDF compression failed"
            );
            return Err(e.into());
        }
    };

    pair.cleanup();

    tracing::info!(
        request_id = %request_id,
        compressor = state.compressor.name(),
        original_size,
        compressed_size = compressed.size,
        resolution = %settings.resolution,
        quality = %settings.quality,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "PDF compressed"
    );

    let content_disposition = format!("attachment; filename=\"{}\"", DOWNLOAD_FILENAME);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .header(COMPRESSED_SIZE_HEADER, compressed.size.to_string())
        .header(header::ACCESS_CONTROL_EXPOSE_HEADERS, "X-Compressed-Size")
        .body(Body::from(compressed.data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
