//! Multipart extraction for the compression form

use crate::constants::{DPI_FIELD, FILE_FIELD, QUALITY_FIELD};
use crate::error::HttpAppError;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use pdfpress_core::AppError;
use pdfpress_processing::{Upload, ValidationError};

/// Raw fields of a `/compress` request
#[derive(Debug, Default)]
pub struct CompressForm {
    pub upload: Option<Upload>,
    pub dpi: Option<String>,
    pub quality: Option<String>,
}

/// Read the `file`, `dpi` and `quality` fields. Unknown fields are skipped.
///
/// File content is buffered up to `max_file_size + 1` bytes; anything beyond is not
/// kept, which is enough for the validator to report the file as too large.
pub async fn extract_compress_form(
    mut multipart: Multipart,
    max_file_size: usize,
) -> Result<CompressForm, HttpAppError> {
    let mut form = CompressForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            FILE_FIELD => {
                if form.upload.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    )
                    .into());
                }
                let filename = field.file_name().map(|s| s.to_string());
                let data = read_capped(field, max_file_size).await?;
                form.upload = Some(Upload::new(filename, data));
            }
            DPI_FIELD => form.dpi = Some(read_text(field, max_file_size).await?),
            QUALITY_FIELD => form.quality = Some(read_text(field, max_file_size).await?),
            _ => {}
        }
    }

    Ok(form)
}

async fn read_capped(mut field: Field<'_>, max_file_size: usize) -> Result<Bytes, HttpAppError> {
    let cap = max_file_size.saturating_add(1);
    let mut buffer = BytesMut::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        let remaining = cap - buffer.len();
        if chunk.len() >= remaining {
            buffer.extend_from_slice(&chunk[..remaining]);
            break;
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer.freeze())
}

async fn read_text(field: Field<'_>, max_file_size: usize) -> Result<String, HttpAppError> {
    field
        .text()
        .await
        .map_err(|e| multipart_error(e, max_file_size))
}

/// A body that outgrows the request limit is reported like any other oversized upload.
fn multipart_error(error: MultipartError, max_file_size: usize) -> HttpAppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ValidationError::FileTooLarge {
            size: max_file_size.saturating_add(1),
            max: max_file_size,
        }
        .into();
    }
    AppError::InvalidInput(format!("Failed to read multipart: {}", error.body_text())).into()
}
