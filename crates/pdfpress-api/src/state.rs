//! Application state shared by all handlers.

use crate::auth::middleware::{AuthFailureLimiter, AuthState};
use crate::auth::session::SessionKeys;
use crate::constants::{LOGIN_FAILURE_WINDOW_SECS, LOGIN_MAX_FAILURES};
use pdfpress_core::Config;
use pdfpress_processing::{PdfCompressor, PdfValidator, TempStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub temp_store: Arc<TempStore>,
    pub validator: PdfValidator,
    pub compressor: Arc<dyn PdfCompressor>,
    /// Present only when the password gate is enabled
    pub auth: Option<AuthState>,
}

impl AppState {
    pub fn new(config: Config, temp_store: Arc<TempStore>, compressor: Arc<dyn PdfCompressor>) -> Self {
        let validator = PdfValidator::new(config.max_upload_size_bytes());

        let auth = config.auth().map(|auth_config| {
            let keys = match &auth_config.session_secret {
                Some(secret) => SessionKeys::from_secret(secret.as_bytes()),
                None => {
                    tracing::warn!(
                        "SESSION_SECRET not set - using a random per-process secret; sessions end on restart"
                    );
                    SessionKeys::random()
                }
            };

            AuthState {
                password: auth_config.password.clone(),
                keys,
                session_ttl_days: auth_config.session_ttl_days,
                cookie_secure: auth_config.cookie_secure,
                failure_limiter: Arc::new(AuthFailureLimiter::new(
                    LOGIN_MAX_FAILURES,
                    LOGIN_FAILURE_WINDOW_SECS,
                )),
            }
        });

        Self {
            config,
            temp_store,
            validator,
            compressor,
            auth,
        }
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth.is_some()
    }
}
