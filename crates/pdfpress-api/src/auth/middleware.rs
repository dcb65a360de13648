use crate::auth::session::{extract_session_cookie, verify_session_token, SessionKeys};
use crate::constants::NOT_AUTHENTICATED_MESSAGE;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use pdfpress_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

/// Windowed failure counter keyed by client address
#[derive(Clone)]
pub struct AuthFailureLimiter {
    inner: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_failures: u32,
    window: Duration,
}

impl AuthFailureLimiter {
    pub fn new(max_failures: u32, window_seconds: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_failures,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Count a failure; returns true once the client has reached the limit
    pub async fn record_failure(&self, ip: &str) -> bool {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        let (count, reset_at) = guard.entry(ip.to_string()).or_insert((0, now + self.window));
        if now >= *reset_at {
            *count = 0;
            *reset_at = now + self.window;
        }
        *count += 1;
        *count >= self.max_failures
    }

    pub async fn is_blocked(&self, ip: &str) -> bool {
        let mut guard = self.inner.lock().await;
        if let Some((count, reset_at)) = guard.get(ip) {
            if Instant::now() >= *reset_at {
                guard.remove(ip);
                return false;
            }
            return *count >= self.max_failures;
        }
        false
    }

    pub async fn reset(&self, ip: &str) {
        self.inner.lock().await.remove(ip);
    }

    /// Drop entries whose window has passed. Returns the number removed.
    pub async fn prune_expired(&self) -> usize {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        let before = guard.len();
        guard.retain(|_, (_, reset_at)| now < *reset_at);
        before - guard.len()
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub password: String,
    pub keys: SessionKeys,
    pub session_ttl_days: i64,
    pub cookie_secure: bool,
    pub failure_limiter: Arc<AuthFailureLimiter>,
}

impl AuthState {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_ttl_days)
    }

    pub fn password_matches(&self, candidate: &str) -> bool {
        secure_compare(candidate, &self.password)
    }
}

pub(crate) fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Session gate for protected routes.
///
/// Passes every request through when authentication is disabled.
pub async fn session_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(auth) = state.auth.as_ref() else {
        return next.run(request).await;
    };

    let authenticated = match extract_session_cookie(request.headers()) {
        Some(token) => match verify_session_token(token, &auth.keys) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, path = %request.uri().path(), "Rejected session cookie");
                false
            }
        },
        None => false,
    };

    if !authenticated {
        return HttpAppError(AppError::Unauthorized(
            NOT_AUTHENTICATED_MESSAGE.to_string(),
        ))
        .into_response();
    }

    next.run(request).await
}
