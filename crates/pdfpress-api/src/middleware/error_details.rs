//! Error detail exposure for non-production deployments

use crate::error::DetailedErrorBody;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

/// Replace an error body with its detailed form when `expose_details` is set.
///
/// The flag comes from the immutable config at router construction.
pub async fn error_details_middleware(
    State(expose_details): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let Some(DetailedErrorBody(body)) = response.extensions_mut().remove::<DetailedErrorBody>()
    else {
        return response;
    };
    if !expose_details {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Json(body).into_response().into_body())
}
