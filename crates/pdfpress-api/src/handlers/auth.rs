//! Login and logout for the shared-password gate

use crate::auth::session::{clear_session_cookie, create_session_cookie, create_session_token};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::ip_extraction::{ClientIp, UNKNOWN_CLIENT_IP};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use pdfpress_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

const WRONG_PASSWORD_MESSAGE: &str = "Falsches Passwort";
const TOO_MANY_ATTEMPTS_MESSAGE: &str = "Zu viele Anmeldeversuche, bitte später erneut versuchen";

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub auth_enabled: bool,
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session cookie set", body = AuthStatusResponse),
        (status = 401, description = "Wrong password", body = ErrorResponse),
        (status = 429, description = "Too many failed attempts", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Response, HttpAppError> {
    // Open instance: nothing to log into
    let Some(auth) = state.auth.as_ref() else {
        return Ok(Json(AuthStatusResponse {
            authenticated: true,
            auth_enabled: false,
        })
        .into_response());
    };

    let limiter = &auth.failure_limiter;
    if limiter.is_blocked(&client_ip).await {
        return Err(AppError::TooManyAttempts(TOO_MANY_ATTEMPTS_MESSAGE.to_string()).into());
    }

    if !auth.password_matches(&request.password) {
        if client_ip == UNKNOWN_CLIENT_IP {
            tracing::warn!(
                "Client address unavailable; all such clients share one login throttle"
            );
        }
        let blocked = limiter.record_failure(&client_ip).await;
        tracing::warn!(client_ip = %client_ip, blocked, "Failed login attempt");
        if blocked {
            return Err(AppError::TooManyAttempts(TOO_MANY_ATTEMPTS_MESSAGE.to_string()).into());
        }
        return Err(AppError::Unauthorized(WRONG_PASSWORD_MESSAGE.to_string()).into());
    }

    limiter.reset(&client_ip).await;

    let ttl = auth.session_ttl();
    let token = create_session_token(&auth.keys, ttl)?;
    let cookie = create_session_cookie(&token, ttl.num_seconds(), auth.cookie_secure);

    tracing::info!(client_ip = %client_ip, "Login successful");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthStatusResponse {
            authenticated: true,
            auth_enabled: true,
        }),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Session cookie cleared", body = AuthStatusResponse)
    )
)]
pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    let secure = state.auth.as_ref().is_some_and(|auth| auth.cookie_secure);

    (
        [(header::SET_COOKIE, clear_session_cookie(secure))],
        Json(AuthStatusResponse {
            authenticated: false,
            auth_enabled: state.auth_enabled(),
        }),
    )
        .into_response()
}
